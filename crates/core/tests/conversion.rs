//! End-to-end conversion from source files on disk to canonical records.

use std::io::Write;

use proactive_core::{
    convert_all, read_json_array, ApiDescriptionTable, BuildError, CanonicalRecordBuilder,
    CoqaAdapter, JsonlReader, ReadError, StoryLayout, ToolCallAdapter, VagueTaskAdapter,
};
use proactive_record::{markers::wrap_perplexity, Message, ProactiveCategory, Role};

fn write_temp(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn cat_story_becomes_three_message_direct_answer() {
    let file = write_temp(
        r#"{"data":[{"id":"c1","story":"A cat sat.","history_turns":[],"target_turn":{"question":"What sat?","answer":"A cat."}}]}"#,
    );
    let items = read_json_array(file.path(), "data").unwrap();
    let builder = CanonicalRecordBuilder::new(CoqaAdapter::default());
    let (records, report) = convert_all(&builder, items);

    assert_eq!(report.items_seen, 1);
    assert!(report.skipped.is_empty());
    assert_eq!(records.len(), 1);

    let r = &records[0];
    assert_eq!(r.id, "converted_item_00000");
    assert_eq!(r.proactive_category, ProactiveCategory::DirectAnswer);
    assert_eq!(r.messages.len(), 3);
    assert_eq!(r.messages[0].role, Role::User);
    assert!(r.messages[0].content.contains("A cat sat."));
    assert_eq!(r.messages[1], Message::user("What sat?"));
    assert_eq!(r.messages[2], Message::assistant("A cat."));
    assert_eq!(r.final_answer, "A cat.");
}

#[test]
fn clarification_is_wrapped_in_marker() {
    let file = write_temp(
        r#"{"data":[{"id":"c2","story":"Tom saw Sam. He waved.","target_turn":{"question":"Who waved?","answer":"Tom"},"clarification_turn":{"question":"Tom or Sam?"}}]}"#,
    );
    let items = read_json_array(file.path(), "data").unwrap();
    let builder = CanonicalRecordBuilder::new(CoqaAdapter::new(StoryLayout::MergeIntoFirst));
    let (records, _) = convert_all(&builder, items);

    let r = &records[0];
    assert_eq!(r.proactive_category, ProactiveCategory::Clarification);
    assert_eq!(r.final_answer, "Tom or Sam?");
    assert!(r
        .target_message()
        .unwrap()
        .content
        .contains(&wrap_perplexity("Tom or Sam?")));
}

#[test]
fn bad_items_are_skipped_and_the_rest_convert() {
    let file = write_temp(
        r#"{"data":[
            "not an object",
            {"id":"a","story":"s"},
            {"id":"b","story":"s","target_turn":{"question":"q","answer":"a"}}
        ]}"#,
    );
    let items = read_json_array(file.path(), "data").unwrap();
    let builder = CanonicalRecordBuilder::new(CoqaAdapter::default());
    let (records, report) = convert_all(&builder, items);

    assert_eq!(report.items_seen, 3);
    assert_eq!(report.records_emitted, 1);
    assert_eq!(report.skipped.len(), 2);
    assert!(matches!(report.skipped[0], BuildError::NotAnObject { position: 0, .. }));
    assert_eq!(report.skipped[1].position(), 1);
    // Ids follow the container position, so gaps mark skipped items.
    assert_eq!(records[0].id, "converted_item_00002");
}

#[test]
fn wrong_document_shape_fails_before_any_item() {
    let file = write_temp(r#"{"version":"1","items":[]}"#);
    let err = read_json_array(file.path(), "data").unwrap_err();
    assert!(matches!(err, ReadError::Shape { .. }));
}

#[test]
fn vague_task_kth_record_has_kth_prefix() {
    let file = write_temp(concat!(
        r#"{"task":"Write a poem","category":"writing","actions":[{"role":"assistant","content":"About what?","type":"New"},{"role":"user","content":"The sea","type":"response"},{"role":"assistant","content":"Waves...","type":"execution"}]}"#,
        "\n",
        "{broken\n",
        r#"{"task":"Empty","actions":[]}"#,
        "\n",
    ));
    let reader = JsonlReader::open(file.path()).unwrap();
    let builder = CanonicalRecordBuilder::new(VagueTaskAdapter);
    let (records, report) = convert_all(&builder, reader);

    assert_eq!(records.len(), 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].position(), 2);

    let actions = [
        Message::assistant("About what?"),
        Message::user("The sea"),
    ];
    for (k, record) in records.iter().enumerate() {
        let prefix = &record.messages[1..record.messages.len() - 1];
        let expected_len = if k == 0 { 0 } else { 2 };
        assert_eq!(prefix, &actions[..expected_len]);
        assert_eq!(record.messages[0], Message::user("Write a poem"));
    }
    assert_eq!(records[1].sub_category, "task_execution");
}

#[test]
fn duplicate_apis_produce_two_capability_descriptions() {
    let tools = write_temp(concat!(
        r#"{"api_name":"search_flights","api_description":"search for flights"}"#,
        "\n",
        r#"{"api_name":"book_hotel","api_description":"book a hotel room"}"#,
        "\n",
    ));
    let table = ApiDescriptionTable::load(tools.path()).unwrap();

    let calls = write_temp(
        r#"{"id":"t1","query":"Trip to Rome","calling":[{"api":"search_flights"},{"api":"search_flights"},{"api":"book_hotel"}]}"#,
    );
    let reader = JsonlReader::open(calls.path()).unwrap();
    let builder = CanonicalRecordBuilder::new(ToolCallAdapter::new(&table));
    let (records, _) = convert_all(&builder, reader);

    let r = &records[0];
    assert_eq!(r.id, "t1");
    assert_eq!(r.proactive_category, ProactiveCategory::ToolUse);
    assert_eq!(r.sub_category, "multi_api_call");
    assert_eq!(r.final_answer.matches(", and ").count(), 1);
    assert_eq!(r.final_answer.matches("search for flights").count(), 1);
    assert!(r
        .final_answer
        .contains("directly search for flights, and book a hotel room."));
}

#[test]
fn missing_tool_description_uses_placeholder() {
    let table = ApiDescriptionTable::new();
    let calls = write_temp(r#"{"query":"Ping it","calling":[{"api":"ping"}]}"#);
    let reader = JsonlReader::open(calls.path()).unwrap();
    let builder = CanonicalRecordBuilder::new(ToolCallAdapter::new(&table));
    let (records, report) = convert_all(&builder, reader);

    assert!(report.skipped.is_empty());
    assert!(records[0].final_answer.contains("directly use the \"ping\" API."));
    assert_eq!(records[0].id, "converted_line_1");
}
