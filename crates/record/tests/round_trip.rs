//! Serialization round-trip of a fully populated record, including
//! multi-byte text and flattened provenance.

use proactive_record::{
    CanonicalRecord, Message, ProactiveCategory, SelfReflection, ThinkingProcess, UncertaintyType,
};
use serde_json::{json, Map};

fn populated_record() -> CanonicalRecord {
    let mut provenance = Map::new();
    provenance.insert(
        "original_coref_data".to_string(),
        json!({"id": "c1", "story": "猫が座った。"}),
    );
    provenance.insert("original_action_index".to_string(), json!(3));

    CanonicalRecord {
        id: "converted_item_00001".to_string(),
        messages: vec![
            Message::user("故事：一只猫坐着。"),
            Message::user("谁坐着？"),
            Message::assistant("<perplexity>你指的是哪一只？ 🐱</perplexity>"),
        ],
        proactive_category: ProactiveCategory::Clarification,
        sub_category: "contextual_ambiguity".to_string(),
        uncertainty_type: Some(UncertaintyType::Epistemic),
        requires_tool: false,
        thinking_process: ThinkingProcess {
            intent_understanding: "L'utilisateur demande « qui ».".to_string(),
            self_reflection: SelfReflection {
                information_check: "ambiguë".to_string(),
                knowledge_check: "два кандидата".to_string(),
                tool_check: "none".to_string(),
            },
        },
        final_answer: "你指的是哪一只？ 🐱".to_string(),
        source_dataset_id: Some("c1".to_string()),
        source_scene_id: None,
        provenance,
    }
}

#[test]
fn pretty_round_trip_preserves_every_field() {
    let record = populated_record();
    let text = serde_json::to_string_pretty(&record).unwrap();
    let back: CanonicalRecord = serde_json::from_str(&text).unwrap();
    assert_eq!(back, record);
}

#[test]
fn compact_output_keeps_unicode_unescaped() {
    let record = populated_record();
    let line = serde_json::to_string(&record).unwrap();
    assert!(line.contains("你指的是哪一只？ 🐱"));
    assert!(!line.contains("\\u"));
    assert!(!line.contains('\n'));

    let back: CanonicalRecord = serde_json::from_str(&line).unwrap();
    assert_eq!(back, record);
}

#[test]
fn provenance_is_written_as_top_level_keys() {
    let value = serde_json::to_value(populated_record()).unwrap();
    assert_eq!(value["original_action_index"], json!(3));
    assert_eq!(value["original_coref_data"]["id"], json!("c1"));
    assert!(value.get("provenance").is_none());
}
