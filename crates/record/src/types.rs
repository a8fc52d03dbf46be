//! Typed structs for the canonical training-record JSON shape.
//!
//! The category and uncertainty tags are open-ended on the wire: known
//! values map to dedicated variants, anything else round-trips verbatim
//! through an `Other` variant.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Width of the zero-padded position in minted ids.
pub const ID_PAD_WIDTH: usize = 5;

// ── Messages ────────────────────────────────────────────────────────

/// Speaker of a single message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn of the reconstructed conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Message {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ── Tags ────────────────────────────────────────────────────────────

/// The assistant behavior a record teaches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProactiveCategory {
    /// The assistant asks the user for the missing information.
    Clarification,
    /// The assistant answers from the available context.
    DirectAnswer,
    /// The request needs an external tool the assistant does not have.
    ToolUse,
    /// Generic help-seeking scenarios produced by the generator.
    HelpSeeking,
    Other(String),
}

impl ProactiveCategory {
    pub fn as_str(&self) -> &str {
        match self {
            ProactiveCategory::Clarification => "clarification",
            ProactiveCategory::DirectAnswer => "direct_answer",
            ProactiveCategory::ToolUse => "tool_use",
            ProactiveCategory::HelpSeeking => "help_seeking",
            ProactiveCategory::Other(s) => s,
        }
    }

    /// Categories where the assistant does not simply answer, and where an
    /// uncertainty type may therefore be recorded.
    pub fn is_help_seeking(&self) -> bool {
        matches!(
            self,
            ProactiveCategory::Clarification
                | ProactiveCategory::ToolUse
                | ProactiveCategory::HelpSeeking
        )
    }
}

impl From<String> for ProactiveCategory {
    fn from(s: String) -> Self {
        match s.as_str() {
            "clarification" => ProactiveCategory::Clarification,
            "direct_answer" => ProactiveCategory::DirectAnswer,
            "tool_use" => ProactiveCategory::ToolUse,
            "help_seeking" => ProactiveCategory::HelpSeeking,
            _ => ProactiveCategory::Other(s),
        }
    }
}

impl From<&str> for ProactiveCategory {
    fn from(s: &str) -> Self {
        ProactiveCategory::from(s.to_string())
    }
}

impl From<ProactiveCategory> for String {
    fn from(c: ProactiveCategory) -> Self {
        match c {
            ProactiveCategory::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ProactiveCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of uncertainty driving a help-seeking turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UncertaintyType {
    Epistemic,
    Aleatoric,
    Capability,
    Other(String),
}

impl UncertaintyType {
    pub fn as_str(&self) -> &str {
        match self {
            UncertaintyType::Epistemic => "epistemic",
            UncertaintyType::Aleatoric => "aleatoric",
            UncertaintyType::Capability => "capability",
            UncertaintyType::Other(s) => s,
        }
    }
}

impl From<String> for UncertaintyType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "epistemic" => UncertaintyType::Epistemic,
            "aleatoric" => UncertaintyType::Aleatoric,
            "capability" | "capability_limitation" => UncertaintyType::Capability,
            _ => UncertaintyType::Other(s),
        }
    }
}

impl From<UncertaintyType> for String {
    fn from(u: UncertaintyType) -> Self {
        match u {
            UncertaintyType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

// ── Thinking process ────────────────────────────────────────────────

/// Self-check notes attached to a record's rationale.
///
/// The generator schema names these fields differently; both spellings
/// are accepted on input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfReflection {
    #[serde(default, alias = "information_sufficiency")]
    pub information_check: String,
    #[serde(default, alias = "knowledge_status")]
    pub knowledge_check: String,
    #[serde(default, alias = "capability_status")]
    pub tool_check: String,
}

/// Descriptive rationale explaining why the assistant message was chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinkingProcess {
    #[serde(default)]
    pub intent_understanding: String,
    #[serde(default)]
    pub self_reflection: SelfReflection,
}

// ── Record ──────────────────────────────────────────────────────────

/// The unified training unit every source is converted into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: String,
    pub messages: Vec<Message>,
    pub proactive_category: ProactiveCategory,
    #[serde(default)]
    pub sub_category: String,
    #[serde(default)]
    pub uncertainty_type: Option<UncertaintyType>,
    #[serde(default)]
    pub requires_tool: bool,
    #[serde(default)]
    pub thinking_process: ThinkingProcess,
    #[serde(default)]
    pub final_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_dataset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_scene_id: Option<String>,
    /// Provenance carried alongside the record (`original_*` copies of the
    /// raw input, action indices, ...). Serialized as top-level keys.
    #[serde(flatten)]
    pub provenance: Map<String, Value>,
}

impl CanonicalRecord {
    /// The trailing assistant message, if the record ends with one.
    pub fn target_message(&self) -> Option<&Message> {
        self.messages.last().filter(|m| m.role == Role::Assistant)
    }

    /// Attach a provenance entry, replacing any previous value for `key`.
    pub fn with_provenance(mut self, key: &str, value: Value) -> Self {
        self.provenance.insert(key.to_string(), value);
        self
    }
}

// ── Id minting ──────────────────────────────────────────────────────

/// `{prefix}_{position}` with the position zero-padded for stable sorting.
pub fn mint_sequential_id(prefix: &str, position: usize) -> String {
    format!("{}_{:0width$}", prefix, position, width = ID_PAD_WIDTH)
}

/// Id for the `ordinal`-th assistant action of the source item at `position`.
pub fn mint_action_id(prefix: &str, position: usize, ordinal: usize) -> String {
    format!(
        "{}_assistant_action_{}",
        mint_sequential_id(prefix, position),
        ordinal
    )
}
