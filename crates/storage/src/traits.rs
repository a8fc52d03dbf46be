use std::path::{Path, PathBuf};

use proactive_record::CanonicalRecord;

use crate::error::SinkError;

/// What happened to one record handed to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The record was serialized to this path.
    Written(PathBuf),
    /// Resume mode found an output for this id already on disk and left it
    /// untouched.
    SkippedExisting(PathBuf),
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written(_))
    }

    pub fn path(&self) -> &Path {
        match self {
            WriteOutcome::Written(p) | WriteOutcome::SkippedExisting(p) => p,
        }
    }
}

/// Destination for canonical records.
///
/// ## Ordering
///
/// Records are written in call order. A sink never reorders or buffers
/// records past [`finish`](RecordSink::finish).
///
/// ## Uniqueness
///
/// A sink refuses a second record with an id it already wrote in the same
/// run, returning [`SinkError::DuplicateId`]. The earlier output is kept.
pub trait RecordSink {
    /// Serialize one record.
    fn write(&mut self, record: &CanonicalRecord) -> Result<WriteOutcome, SinkError>;

    /// Whether an output for `id` already exists, either written in this run
    /// or, for resumable sinks, left by an earlier run.
    fn contains(&self, id: &str) -> bool;

    /// Flush anything buffered. Writing after `finish` is allowed but not
    /// required to be supported.
    fn finish(&mut self) -> Result<(), SinkError>;

    /// The directory or file this sink writes to.
    fn location(&self) -> &Path;
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn write(&mut self, record: &CanonicalRecord) -> Result<WriteOutcome, SinkError> {
        (**self).write(record)
    }

    fn contains(&self, id: &str) -> bool {
        (**self).contains(id)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }

    fn location(&self) -> &Path {
        (**self).location()
    }
}
