//! One compact JSON line per record.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use proactive_record::CanonicalRecord;

use crate::error::SinkError;
use crate::traits::{RecordSink, WriteOutcome};

/// Line-delimited sink. The file is truncated on open and records are
/// appended in call order; it is not resumable mid-file.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    out: BufWriter<File>,
    written: HashSet<String>,
}

impl JsonlSink {
    /// Create (or truncate) `path`, creating its parent directory.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SinkError::io(parent, e))?;
        }
        let file = File::create(&path).map_err(|e| SinkError::io(&path, e))?;
        Ok(JsonlSink {
            path,
            out: BufWriter::new(file),
            written: HashSet::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.written.len()
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }
}

impl RecordSink for JsonlSink {
    fn write(&mut self, record: &CanonicalRecord) -> Result<WriteOutcome, SinkError> {
        if self.written.contains(&record.id) {
            return Err(SinkError::DuplicateId {
                id: record.id.clone(),
            });
        }

        let line = serde_json::to_string(record).map_err(|source| SinkError::Serialize {
            id: record.id.clone(),
            source,
        })?;
        writeln!(self.out, "{}", line).map_err(|e| SinkError::io(&self.path, e))?;

        self.written.insert(record.id.clone());
        Ok(WriteOutcome::Written(self.path.clone()))
    }

    fn contains(&self, id: &str) -> bool {
        self.written.contains(id)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.out.flush().map_err(|e| SinkError::io(&self.path, e))
    }

    fn location(&self) -> &Path {
        &self.path
    }
}
