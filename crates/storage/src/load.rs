//! Read emitted records back from either sink layout.

use std::path::Path;

use serde_json::Value;

use proactive_record::CanonicalRecord;

use crate::error::SinkError;

/// One record read back from disk, or the reason it could not be parsed.
#[derive(Debug)]
pub struct LoadedRecord {
    /// `file.json`, or `file.jsonl:LINE` (1-based) for line-delimited input.
    pub origin: String,
    pub value: Result<Value, String>,
}

impl LoadedRecord {
    /// Parse the JSON value into a typed record.
    pub fn parse(&self) -> Result<CanonicalRecord, String> {
        let value = self.value.as_ref().map_err(Clone::clone)?;
        serde_json::from_value(value.clone()).map_err(|e| e.to_string())
    }
}

fn is_jsonl(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "jsonl")
}

/// Load records from a directory of `*.json` files (sorted by name), a
/// `.jsonl` file, or a single JSON file.
pub fn load_records(path: &Path) -> Result<Vec<LoadedRecord>, SinkError> {
    if path.is_dir() {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(path).map_err(|e| SinkError::io(path, e))? {
            let entry = entry.map_err(|e| SinkError::io(path, e))?;
            let file = entry.path();
            if file.is_file() && file.extension().is_some_and(|ext| ext == "json") {
                files.push(file);
            }
        }
        files.sort();
        let mut records = Vec::with_capacity(files.len());
        for file in files {
            records.push(load_document(&file)?);
        }
        return Ok(records);
    }

    if is_jsonl(path) {
        let text = std::fs::read_to_string(path).map_err(|e| SinkError::io(path, e))?;
        return Ok(text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| LoadedRecord {
                origin: format!("{}:{}", path.display(), index + 1),
                value: serde_json::from_str(line).map_err(|e| e.to_string()),
            })
            .collect());
    }

    Ok(vec![load_document(path)?])
}

fn load_document(path: &Path) -> Result<LoadedRecord, SinkError> {
    let text = std::fs::read_to_string(path).map_err(|e| SinkError::io(path, e))?;
    Ok(LoadedRecord {
        origin: path.display().to_string(),
        value: serde_json::from_str(&text).map_err(|e| e.to_string()),
    })
}
