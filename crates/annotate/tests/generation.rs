//! End-to-end generation and refine runs against a scripted generator.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use proactive_annotate::sections::{DEFAULT_ANSWER, DEFAULT_REASONING};
use proactive_annotate::{
    AnnotationGenerator, GenerateError, GeneratorOptions, PromptError, PromptTemplate, Refiner,
    Scenario, TextGenerator,
};
use proactive_annotate::prompt::SCENARIO_PLACEHOLDERS;
use proactive_record::{CanonicalRecord, Message, ProactiveCategory, Role};
use proactive_storage::{load_records, DirectorySink, JsonlSink, RecordSink};

/// Replays canned replies in order and records every prompt it was sent.
#[derive(Default)]
struct Scripted {
    replies: RefCell<VecDeque<Result<String, GenerateError>>>,
    prompts: RefCell<Vec<String>>,
}

impl Scripted {
    fn new(replies: Vec<Result<String, GenerateError>>) -> Self {
        Scripted {
            replies: RefCell::new(replies.into()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }
}

impl TextGenerator for Scripted {
    fn generate(&self, _model: &str, prompt: &str) -> Result<String, GenerateError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(GenerateError::Transport("script exhausted".to_string())))
    }
}

fn options() -> GeneratorOptions {
    GeneratorOptions {
        model: "test-model".to_string(),
        delay: Duration::ZERO,
    }
}

fn generator(script: &Scripted) -> AnnotationGenerator<&Scripted> {
    AnnotationGenerator::new(script, PromptTemplate::default_scenario().unwrap(), options()).unwrap()
}

fn scenario(id: &str) -> Scenario {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "category": "clarification",
        "description": "The user wants a restaurant but gives no city.",
        "initial_user_query": "Recommend a good restaurant.",
        "required_behavior": "Ask which city."
    }))
    .unwrap()
}

const PAYLOAD: &str = r#"{
    "messages": [
        {"role": "user", "content": "Recommend a good restaurant."},
        {"role": "assistant", "content": "<think>No city given.</think><perplexity>Which city are you in?</perplexity>final_answer: Which city are you in?"}
    ],
    "sub_category": "missing_location",
    "uncertainty_type": "epistemic",
    "requires_tool": false,
    "thinking_process": {
        "intent_understanding": "restaurant recommendation",
        "self_reflection": {
            "information_sufficiency": "city missing",
            "knowledge_status": "general knowledge suffices",
            "capability_status": "no tool needed"
        }
    }
}"#;

#[test]
fn test_prompt_carries_scenario_and_schema() {
    let script = Scripted::new(vec![Ok(PAYLOAD.to_string())]);
    let dir = tempfile::tempdir().unwrap();
    let mut sink = DirectorySink::create(dir.path(), false).unwrap();

    let summary = generator(&script).run(&[scenario("s1")], &mut sink);

    assert_eq!(summary.written, 1);
    let prompts = script.prompts.borrow();
    assert!(prompts[0].contains("The user wants a restaurant but gives no city."));
    assert!(prompts[0].contains("Ask which city."));
    assert!(prompts[0].contains("\"thinking_process\""));
}

#[test]
fn test_resume_skips_existing_without_calling() {
    let dir = tempfile::tempdir().unwrap();
    let first = Scripted::new(vec![Ok(PAYLOAD.to_string())]);
    let mut sink = DirectorySink::create(dir.path(), true).unwrap();
    assert_eq!(generator(&first).run(&[scenario("s1")], &mut sink).written, 1);
    let path = sink.path_for("s1").unwrap();
    let before = std::fs::read(&path).unwrap();

    let second = Scripted::new(vec![Ok("should not be used".to_string())]);
    let mut sink = DirectorySink::create(dir.path(), true).unwrap();
    let summary = generator(&second).run(&[scenario("s1")], &mut sink);

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.written, 0);
    assert_eq!(second.calls(), 0);
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn test_request_failure_writes_nothing_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let script = Scripted::new(vec![Err(GenerateError::Status(503)), Ok(PAYLOAD.to_string())]);
    let mut sink = DirectorySink::create(dir.path(), true).unwrap();

    let summary = generator(&script).run(&[scenario("a"), scenario("b")], &mut sink);

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.written, 1);
    assert_eq!(script.calls(), 2);
    assert!(!sink.path_for("a").unwrap().exists());
    assert!(sink.path_for("b").unwrap().exists());

    // A later run picks up only the failed scenario.
    let retry = Scripted::new(vec![Ok(PAYLOAD.to_string())]);
    let mut sink = DirectorySink::create(dir.path(), true).unwrap();
    let summary = generator(&retry).run(&[scenario("a"), scenario("b")], &mut sink);
    assert_eq!((summary.written, summary.skipped), (1, 1));
    assert_eq!(retry.calls(), 1);
}

#[test]
fn test_fenced_reply_is_parsed() {
    let script = Scripted::new(vec![Ok(format!(
        "Here is the dialogue you asked for:\n```json\n{}\n```\n",
        PAYLOAD
    ))]);
    let annotation = generator(&script).annotate(&scenario("s1")).unwrap();

    assert_eq!(annotation.strategy, Some("fenced_json"));
    let record = annotation.record;
    assert_eq!(record.id, "s1");
    assert_eq!(record.proactive_category, ProactiveCategory::Clarification);
    assert_eq!(record.sub_category, "missing_location");
    assert_eq!(record.final_answer, "Which city are you in?");
    assert_eq!(
        record.thinking_process.self_reflection.information_check,
        "city missing"
    );
    assert_eq!(record.messages[0], Message::user("Recommend a good restaurant."));
    assert!(!annotation.sections.is_default());
    assert!(record.check().is_ok());
}

#[test]
fn test_reply_without_markers_gets_sentinels() {
    let dir = tempfile::tempdir().unwrap();
    let script = Scripted::new(vec![Ok("Sorry, I can't help with that.".to_string())]);
    let mut sink = DirectorySink::create(dir.path(), false).unwrap();

    let summary = generator(&script).run(&[scenario("s1")], &mut sink);

    assert_eq!((summary.written, summary.defaulted), (1, 1));
    let loaded = load_records(dir.path()).unwrap();
    let record = loaded[0].parse().unwrap();
    assert_eq!(record.final_answer, DEFAULT_ANSWER);
    assert_eq!(record.messages.len(), 2);
    assert_eq!(record.messages[0].content, "Recommend a good restaurant.");
    assert!(record.messages[1].content.contains(DEFAULT_REASONING));
}

#[test]
fn test_unknown_placeholder_fails_before_any_request() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prompt.txt");
    std::fs::write(&path, "Write a {proactive_category} dialogue about {scenario}.").unwrap();

    let err = PromptTemplate::load(&path, SCENARIO_PLACEHOLDERS).unwrap_err();
    assert_eq!(
        err,
        PromptError::UnknownPlaceholder {
            name: "scenario".to_string()
        }
    );
}

#[test]
fn test_custom_template_is_used() {
    let template = PromptTemplate::parse(
        "Category {proactive_category}; query {initial_user_query}",
        SCENARIO_PLACEHOLDERS,
    )
    .unwrap();
    let script = Scripted::new(vec![Ok(PAYLOAD.to_string())]);
    let generator = AnnotationGenerator::new(&script, template, options()).unwrap();
    generator.annotate(&scenario("s1")).unwrap();
    assert_eq!(
        script.prompts.borrow()[0],
        "Category clarification; query Recommend a good restaurant."
    );
}

// ── Refine ──────────────────────────────────────────────────────────

fn existing(id: &str) -> CanonicalRecord {
    CanonicalRecord {
        id: id.to_string(),
        messages: vec![
            Message::user("Summarise the meeting."),
            Message::assistant("<perplexity>Which meeting?</perplexity>"),
        ],
        proactive_category: ProactiveCategory::Clarification,
        sub_category: "vague_task".to_string(),
        uncertainty_type: None,
        requires_tool: false,
        thinking_process: Default::default(),
        final_answer: "Which meeting?".to_string(),
        source_dataset_id: None,
        source_scene_id: Some("scene_9".to_string()),
        provenance: Default::default(),
    }
}

#[test]
fn test_refine_rewrites_and_drops_failures() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("refined.jsonl");
    let script = Scripted::new(vec![
        Ok("<think>No meeting named.</think>\n<perplexity>I do not know which meeting.</perplexity>\nfinal_answer: Which meeting do you mean?".to_string()),
        Err(GenerateError::Transport("connection reset".to_string())),
    ]);
    let refiner = Refiner::new(&script, "test-model", Duration::ZERO);
    let mut sink = JsonlSink::create(&out).unwrap();

    let summary = refiner.run(vec![existing("r1"), existing("r2")], &mut sink);
    sink.finish().unwrap();

    assert_eq!((summary.refined, summary.failed), (1, 1));
    assert!(script.prompts.borrow()[0].contains("User's last request: Summarise the meeting."));

    let loaded = load_records(&out).unwrap();
    assert_eq!(loaded.len(), 1);
    let record = loaded[0].parse().unwrap();
    assert_eq!(record.id, "r1");
    assert_eq!(record.source_scene_id.as_deref(), Some("scene_9"));
    assert_eq!(record.final_answer, "Which meeting do you mean?");
    let last = record.messages.last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert!(last.content.starts_with("<think>No meeting named.</think>"));
    assert!(record.check().is_ok());
}

#[test]
fn test_refine_skips_record_ending_with_user_turn() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("refined.jsonl");
    let script = Scripted::new(vec![Ok("final_answer: unused".to_string())]);
    let refiner = Refiner::new(&script, "test-model", Duration::ZERO);
    let mut sink = JsonlSink::create(&out).unwrap();

    let mut dangling = existing("r1");
    dangling.messages.push(Message::user("Any update?"));
    let summary = refiner.run(vec![dangling], &mut sink);
    sink.finish().unwrap();

    assert_eq!((summary.refined, summary.unsuitable), (0, 1));
    assert_eq!(script.calls(), 0);
    assert!(load_records(&out).unwrap().is_empty());
}
