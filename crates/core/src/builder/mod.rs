//! Canonical record builder.
//!
//! Each corpus implements [`SourceAdapter`]: it names the turns of a raw
//! record that become training examples, extracts the behavior signal for
//! each turn, and shapes the conversational context and metadata. The
//! branching from signal to assistant content lives once, in [`assemble`].

pub mod coqa;
pub mod thinking;
pub mod tool_call;
pub mod vague_task;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use proactive_record::markers::wrap_perplexity;
use proactive_record::{
    CanonicalRecord, Message, ProactiveCategory, ThinkingProcess, UncertaintyType,
};

use crate::error::{json_type_name, BuildError, ItemError, SourceKind};
use crate::readers::SourceItem;

pub use coqa::{CoqaAdapter, StoryLayout};
pub use tool_call::ToolCallAdapter;
pub use vague_task::VagueTaskAdapter;

/// The assistant behavior selected for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BehaviorDecision {
    /// Ask the user; the question is the target content.
    Clarify { question: String },
    /// Answer with the ground-truth text.
    Answer { answer: String },
    /// Decline, naming each required capability (already deduplicated).
    DeclineCapability { capabilities: Vec<String> },
}

/// A turn inside a raw record that yields one example.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Turn {
    /// Index of the turn in the source's own sequence (e.g. action index).
    pub index: usize,
    /// Running count of emitted turns within the record.
    pub ordinal: usize,
}

impl Turn {
    pub const SINGLE: Turn = Turn {
        index: 0,
        ordinal: 0,
    };
}

/// Everything about a training example except the target assistant turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub id: String,
    /// Conversation up to and including the user utterance under evaluation.
    pub context: Vec<Message>,
    pub sub_category: String,
    pub thinking: ThinkingProcess,
    pub source_dataset_id: Option<String>,
    pub source_scene_id: Option<String>,
    pub provenance: Map<String, Value>,
}

/// Per-corpus conversion rules.
pub trait SourceAdapter {
    /// Typed view of one raw source record.
    type Raw: DeserializeOwned;

    fn kind(&self) -> SourceKind;

    /// Turns of `raw` that each become a record. An empty vector yields no
    /// records without error.
    fn turns(&self, raw: &Self::Raw) -> Result<Vec<Turn>, ItemError>;

    /// Decide the assistant behavior for `turn`.
    fn extract_signal(&self, raw: &Self::Raw, turn: Turn) -> Result<BehaviorDecision, ItemError>;

    /// Build the context, id, and metadata for `turn`. `original` is the
    /// untyped source record, kept for provenance.
    fn shape(
        &self,
        raw: &Self::Raw,
        original: &Value,
        turn: Turn,
        decision: &BehaviorDecision,
        position: usize,
    ) -> Result<Example, ItemError>;
}

/// Drives a [`SourceAdapter`] over source items.
pub struct CanonicalRecordBuilder<A> {
    adapter: A,
}

impl<A: SourceAdapter> CanonicalRecordBuilder<A> {
    pub fn new(adapter: A) -> Self {
        CanonicalRecordBuilder { adapter }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Convert one source item into zero or more records.
    pub fn build(&self, item: &SourceItem) -> Result<Vec<CanonicalRecord>, BuildError> {
        let kind = self.adapter.kind();
        let position = item.position;
        let item_err = |error| BuildError::Item {
            kind,
            position,
            error,
        };

        if !item.value.is_object() {
            return Err(BuildError::NotAnObject {
                kind,
                position,
                found: json_type_name(&item.value),
            });
        }

        let raw = A::Raw::deserialize(&item.value)
            .map_err(|e| item_err(ItemError::Invalid(e.to_string())))?;

        let turns = self.adapter.turns(&raw).map_err(item_err)?;
        let mut records = Vec::with_capacity(turns.len());
        for turn in turns {
            let decision = self.adapter.extract_signal(&raw, turn).map_err(item_err)?;
            let example = self
                .adapter
                .shape(&raw, &item.value, turn, &decision, position)
                .map_err(item_err)?;
            let record = assemble(example, decision);
            if let Err(errors) = record.check() {
                return Err(BuildError::Invariant {
                    kind,
                    position,
                    id: record.id,
                    errors,
                });
            }
            records.push(record);
        }
        Ok(records)
    }
}

/// Source ids may be strings or numbers; anything else is not an id.
pub fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Capability-limitation statement naming every required capability.
pub fn capability_statement(capabilities: &[String]) -> String {
    format!(
        "As an LLM, I lack the capability to directly {}. I would need access to specific tools or APIs to fulfill this request.",
        capabilities.join(", and ")
    )
}

/// Append the target assistant turn selected by `decision` and fill in the
/// category fields.
pub fn assemble(example: Example, decision: BehaviorDecision) -> CanonicalRecord {
    let (category, content, final_answer, uncertainty, requires_tool) = match decision {
        BehaviorDecision::Clarify { question } => (
            ProactiveCategory::Clarification,
            wrap_perplexity(&question),
            question,
            None,
            false,
        ),
        BehaviorDecision::Answer { answer } => (
            ProactiveCategory::DirectAnswer,
            answer.clone(),
            answer,
            None,
            false,
        ),
        BehaviorDecision::DeclineCapability { capabilities } => {
            let statement = capability_statement(&capabilities);
            (
                ProactiveCategory::ToolUse,
                wrap_perplexity(&statement),
                statement,
                Some(UncertaintyType::Capability),
                true,
            )
        }
    };

    let mut messages = example.context;
    messages.push(Message::assistant(content));

    CanonicalRecord {
        id: example.id,
        messages,
        proactive_category: category,
        sub_category: example.sub_category,
        uncertainty_type: uncertainty,
        requires_tool,
        thinking_process: example.thinking,
        final_answer,
        source_dataset_id: example.source_dataset_id,
        source_scene_id: example.source_scene_id,
        provenance: example.provenance,
    }
}

/// Outcome counts of converting a sequence of items.
#[derive(Debug, Default)]
pub struct ConversionReport {
    pub items_seen: usize,
    pub records_emitted: usize,
    /// Items that produced no record because of an error.
    pub skipped: Vec<BuildError>,
}

/// Convert `items` in order, handing each record to `emit` as soon as it is
/// built. Failing items are logged and recorded in the report.
pub fn convert_into<A, I, F>(
    builder: &CanonicalRecordBuilder<A>,
    items: I,
    mut emit: F,
) -> ConversionReport
where
    A: SourceAdapter,
    I: IntoIterator<Item = SourceItem>,
    F: FnMut(CanonicalRecord),
{
    let mut report = ConversionReport::default();
    for item in items {
        report.items_seen += 1;
        match builder.build(&item) {
            Ok(records) => {
                if records.is_empty() {
                    debug!(position = item.position, "item produced no records");
                }
                for record in records {
                    report.records_emitted += 1;
                    emit(record);
                }
            }
            Err(e) => {
                warn!(position = e.position(), error = %e, "skipping source item");
                report.skipped.push(e);
            }
        }
    }
    report
}

/// Collecting variant of [`convert_into`].
pub fn convert_all<A, I>(
    builder: &CanonicalRecordBuilder<A>,
    items: I,
) -> (Vec<CanonicalRecord>, ConversionReport)
where
    A: SourceAdapter,
    I: IntoIterator<Item = SourceItem>,
{
    let mut records = Vec::new();
    let report = convert_into(builder, items, |r| records.push(r));
    (records, report)
}
