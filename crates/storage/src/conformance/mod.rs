//! Conformance suite for `RecordSink` implementations.
//!
//! Any sink can run this backend-agnostic suite to check the contract the
//! pipeline relies on:
//!
//! - **Write**: every field and multi-byte text survive a write and load
//! - **Uniqueness**: a second record with the same id is refused
//! - **Order**: records read back in write order (where the layout has one)
//! - **Contains**: a written id is reported as present
//!
//! # Usage
//!
//! ```ignore
//! use proactive_storage::conformance::run_conformance_suite;
//! use proactive_storage::JsonlSink;
//!
//! let report = run_conformance_suite(|dir| JsonlSink::create(dir.join("out.jsonl")));
//! assert!(report.failed == 0, "{report}");
//! ```

use std::fmt;
use std::path::Path;

use serde_json::json;

use proactive_record::{
    CanonicalRecord, Message, ProactiveCategory, SelfReflection, ThinkingProcess, UncertaintyType,
};

use crate::error::SinkError;
use crate::load::load_records;
use crate::traits::RecordSink;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(name: &str, result: Result<(), String>) -> Self {
        TestResult {
            name: name.to_string(),
            passed: result.is_ok(),
            message: result.err(),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in self.results.iter().filter(|r| !r.passed) {
            writeln!(
                f,
                "  FAIL [{}]: {}",
                r.name,
                r.message.as_deref().unwrap_or("(no message)")
            )?;
        }
        Ok(())
    }
}

/// Run the suite. `factory` is called once per test with a fresh, empty
/// scratch directory and must open a sink somewhere inside it.
pub fn run_conformance_suite<S, F>(factory: F) -> ConformanceReport
where
    S: RecordSink,
    F: Fn(&Path) -> Result<S, SinkError>,
{
    let tests: [(&str, fn(&mut dyn RecordSink) -> Result<(), String>); 4] = [
        ("write_then_load_preserves_fields", write_then_load_preserves_fields),
        ("duplicate_id_is_refused", duplicate_id_is_refused),
        ("records_load_in_write_order", records_load_in_write_order),
        ("written_id_is_contained", written_id_is_contained),
    ];

    let results: Vec<TestResult> = tests
        .iter()
        .map(|(name, test)| {
            let outcome = scratch(&factory).and_then(|(_dir, mut sink)| test(&mut sink));
            TestResult::from_result(name, outcome)
        })
        .collect();

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();
    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

fn scratch<S, F>(factory: &F) -> Result<(tempfile::TempDir, S), String>
where
    F: Fn(&Path) -> Result<S, SinkError>,
{
    let dir = tempfile::tempdir().map_err(|e| format!("scratch dir: {}", e))?;
    let sink = factory(dir.path()).map_err(|e| format!("open sink: {}", e))?;
    Ok((dir, sink))
}

// ── Tests ───────────────────────────────────────────────────────────

fn write_then_load_preserves_fields(sink: &mut dyn RecordSink) -> Result<(), String> {
    let record = sample_record("conf_00000");
    write_all(sink, &[&record])?;
    let loaded = load(sink)?;
    match loaded.as_slice() {
        [only] if *only == record => Ok(()),
        [only] => Err(format!("loaded record differs: {:?}", only)),
        other => Err(format!("expected 1 record, loaded {}", other.len())),
    }
}

fn duplicate_id_is_refused(sink: &mut dyn RecordSink) -> Result<(), String> {
    let first = sample_record("conf_dup");
    let mut second = sample_record("conf_dup");
    second.final_answer = "changed".to_string();
    write_all(sink, &[&first])?;
    match sink.write(&second) {
        Err(SinkError::DuplicateId { .. }) => {}
        Err(e) => return Err(format!("expected DuplicateId, got {}", e)),
        Ok(outcome) => return Err(format!("second write accepted: {:?}", outcome)),
    }
    sink.finish().map_err(|e| e.to_string())?;
    let loaded = load(sink)?;
    if loaded.len() == 1 && loaded[0] == first {
        Ok(())
    } else {
        Err("first record was not kept unchanged".to_string())
    }
}

fn records_load_in_write_order(sink: &mut dyn RecordSink) -> Result<(), String> {
    // Ids are chosen so write order and name order agree.
    let records: Vec<CanonicalRecord> = (0..3)
        .map(|i| sample_record(&format!("conf_{:05}", i)))
        .collect();
    write_all(sink, &records.iter().collect::<Vec<_>>())?;
    let ids: Vec<String> = load(sink)?.into_iter().map(|r| r.id).collect();
    let expected: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
    if ids == expected {
        Ok(())
    } else {
        Err(format!("expected {:?}, loaded {:?}", expected, ids))
    }
}

fn written_id_is_contained(sink: &mut dyn RecordSink) -> Result<(), String> {
    if sink.contains("conf_x") {
        return Err("empty sink reports conf_x present".to_string());
    }
    write_all(sink, &[&sample_record("conf_x")])?;
    if sink.contains("conf_x") {
        Ok(())
    } else {
        Err("written id not reported present".to_string())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn write_all(sink: &mut dyn RecordSink, records: &[&CanonicalRecord]) -> Result<(), String> {
    for record in records {
        sink.write(record).map_err(|e| e.to_string())?;
    }
    sink.finish().map_err(|e| e.to_string())
}

fn load(sink: &dyn RecordSink) -> Result<Vec<CanonicalRecord>, String> {
    load_records(sink.location())
        .map_err(|e| e.to_string())?
        .iter()
        .map(|r| r.parse())
        .collect()
}

fn sample_record(id: &str) -> CanonicalRecord {
    CanonicalRecord {
        id: id.to_string(),
        messages: vec![
            Message::user("Quel temps fait-il à 東京 ? 🌧"),
            Message::assistant("<perplexity>Which day do you mean?</perplexity>"),
        ],
        proactive_category: ProactiveCategory::Clarification,
        sub_category: "detail_request".to_string(),
        uncertainty_type: Some(UncertaintyType::Epistemic),
        requires_tool: false,
        thinking_process: ThinkingProcess {
            intent_understanding: "weather question".to_string(),
            self_reflection: SelfReflection {
                information_check: "no date".to_string(),
                knowledge_check: String::new(),
                tool_check: "none".to_string(),
            },
        },
        final_answer: "Which day do you mean?".to_string(),
        source_dataset_id: Some("conformance".to_string()),
        source_scene_id: None,
        provenance: [("original_action_index".to_string(), json!(1))]
            .into_iter()
            .collect(),
    }
}
