//! proactive-record: the canonical conversational training record.
//!
//! Every source corpus (coreference QA, vague-task logs, tool-call logs,
//! generated scenarios) is projected into [`CanonicalRecord`]. This crate
//! owns the wire shape, the assistant-content markers, id minting, and the
//! invariant checks the sinks and the `validate` command rely on.

pub mod check;
pub mod markers;
pub mod types;

pub use check::RecordError;
pub use types::*;
