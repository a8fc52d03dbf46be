use std::fmt;
use std::path::PathBuf;

use proactive_record::RecordError;

/// The corpus a record came from. Used in ids, logs, and error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Coreference/ambiguity QA pairs (a `data` array in one JSON document).
    Coqa,
    /// Vague-task interaction logs (JSONL).
    VagueTask,
    /// Tool-calling API logs (JSONL).
    ToolCall,
    /// Hand-authored scenarios annotated by the remote generator.
    Scenario,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Coqa => "coqa",
            SourceKind::VagueTask => "vague-task",
            SourceKind::ToolCall => "tool-call",
            SourceKind::Scenario => "scenario",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort reading a whole source file.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The document parsed but its top-level structure is not the one expected.
    #[error("unexpected document shape in {}: {message}", .path.display())]
    Shape { path: PathBuf, message: String },
}

/// Why a single source item could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItemError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{0}' is empty")]
    Empty(&'static str),

    #[error("{0}")]
    Invalid(String),
}

/// A per-item conversion failure. Only the offending item is skipped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error("{kind} item {position}: expected a JSON object, found {found}")]
    NotAnObject {
        kind: SourceKind,
        position: usize,
        found: &'static str,
    },

    #[error("{kind} item {position}: {error}")]
    Item {
        kind: SourceKind,
        position: usize,
        error: ItemError,
    },

    #[error("{kind} item {position}: record '{id}' failed checks: {}", join_errors(.errors))]
    Invariant {
        kind: SourceKind,
        position: usize,
        id: String,
        errors: Vec<RecordError>,
    },
}

impl BuildError {
    pub fn position(&self) -> usize {
        match self {
            BuildError::NotAnObject { position, .. }
            | BuildError::Item { position, .. }
            | BuildError::Invariant { position, .. } => *position,
        }
    }
}

fn join_errors(errors: &[RecordError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Name of a JSON value's type, for error messages.
pub fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
