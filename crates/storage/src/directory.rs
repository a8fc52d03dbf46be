//! One pretty-printed JSON file per record.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use proactive_record::CanonicalRecord;

use crate::error::SinkError;
use crate::traits::{RecordSink, WriteOutcome};

/// Longest file stem kept after sanitizing, in characters.
pub const MAX_FILE_STEM_CHARS: usize = 200;

const UNSAFE_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Turn a record id into a safe file stem.
///
/// Unsafe characters become `_`, leading and trailing dots and spaces are
/// stripped, and the result is cut to [`MAX_FILE_STEM_CHARS`]. Returns
/// `None` when nothing is left.
pub fn sanitize_file_name(id: &str) -> Option<String> {
    let replaced: String = id
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) || c.is_control() { '_' } else { c })
        .collect();
    let trimmed = replaced.trim_matches(|c| c == '.' || c == ' ');
    let cut: String = trimmed.chars().take(MAX_FILE_STEM_CHARS).collect();
    if cut.is_empty() {
        None
    } else {
        Some(cut)
    }
}

/// Writes `{dir}/{sanitized id}.json` for each record.
///
/// Each file is written to a temporary file in the same directory and then
/// renamed over the target, so a failed write leaves no partial file. In
/// resume mode an existing target is never touched.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    resume: bool,
    written: HashSet<String>,
}

impl DirectorySink {
    /// Create the directory if needed and open a sink on it.
    pub fn create(dir: impl Into<PathBuf>, resume: bool) -> Result<Self, SinkError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| SinkError::io(&dir, e))?;
        Ok(DirectorySink {
            dir,
            resume,
            written: HashSet::new(),
        })
    }

    pub fn resume(&self) -> bool {
        self.resume
    }

    /// Output path for a record id.
    pub fn path_for(&self, id: &str) -> Result<PathBuf, SinkError> {
        let stem = sanitize_file_name(id).ok_or_else(|| SinkError::InvalidFileName {
            id: id.to_string(),
        })?;
        Ok(self.dir.join(format!("{}.json", stem)))
    }

    fn stem_for(id: &str) -> Option<String> {
        sanitize_file_name(id)
    }
}

impl RecordSink for DirectorySink {
    fn write(&mut self, record: &CanonicalRecord) -> Result<WriteOutcome, SinkError> {
        let path = self.path_for(&record.id)?;
        let stem = Self::stem_for(&record.id).unwrap_or_default();

        if self.written.contains(&stem) {
            return Err(SinkError::DuplicateId {
                id: record.id.clone(),
            });
        }

        if self.resume && path.exists() {
            debug!(id = %record.id, path = %path.display(), "output exists, skipping");
            return Ok(WriteOutcome::SkippedExisting(path));
        }

        let bytes = serde_json::to_vec_pretty(record).map_err(|source| SinkError::Serialize {
            id: record.id.clone(),
            source,
        })?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| SinkError::io(&self.dir, e))?;
        let tmp_path = tmp.path().to_path_buf();
        tmp.write_all(&bytes)
            .and_then(|()| tmp.flush())
            .map_err(|e| SinkError::io(tmp_path, e))?;
        tmp.persist(&path).map_err(|e| SinkError::io(&path, e.error))?;

        self.written.insert(stem);
        Ok(WriteOutcome::Written(path))
    }

    fn contains(&self, id: &str) -> bool {
        match Self::stem_for(id) {
            Some(stem) if self.written.contains(&stem) => true,
            Some(stem) => self.resume && self.dir.join(format!("{}.json", stem)).exists(),
            None => false,
        }
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.dir
    }
}
