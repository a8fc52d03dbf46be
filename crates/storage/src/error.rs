use std::path::PathBuf;

/// All errors that can be returned by a [`RecordSink`](crate::RecordSink)
/// or by the record loader.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot serialize record '{id}': {source}")]
    Serialize {
        id: String,
        source: serde_json::Error,
    },

    /// A record with this id (or one mapping to the same file) was already
    /// written by this sink.
    #[error("duplicate record id '{id}'")]
    DuplicateId { id: String },

    /// The id leaves nothing usable after file-name sanitizing.
    #[error("record id '{id}' cannot be turned into a file name")]
    InvalidFileName { id: String },
}

impl SinkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SinkError::Io {
            path: path.into(),
            source,
        }
    }
}
