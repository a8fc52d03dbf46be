//! Read-only lookup from API/tool name to a human-readable capability.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ReadError;
use crate::readers::JsonlReader;

#[derive(Deserialize)]
struct ToolLine {
    api_name: Option<String>,
    #[serde(default)]
    api_description: String,
}

/// API-name-to-description map loaded once from a JSONL side table.
#[derive(Debug, Clone, Default)]
pub struct ApiDescriptionTable {
    entries: HashMap<String, String>,
}

impl ApiDescriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        ApiDescriptionTable {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Load `{api_name, api_description}` lines from `path`.
    ///
    /// A missing file yields an empty table. Lines without an `api_name`
    /// are ignored; later lines win on duplicate names.
    pub fn load(path: &Path) -> Result<Self, ReadError> {
        if !path.exists() {
            warn!(path = %path.display(), "tools file not found, using empty API table");
            return Ok(Self::new());
        }

        let mut table = Self::new();
        let mut reader = JsonlReader::open(path)?;
        for item in reader.by_ref() {
            match serde_json::from_value::<ToolLine>(item.value) {
                Ok(ToolLine {
                    api_name: Some(name),
                    api_description,
                }) => {
                    table.entries.insert(name, api_description);
                }
                Ok(_) => debug!(line = item.position + 1, "tool line without api_name"),
                Err(e) => warn!(line = item.position + 1, error = %e, "skipping tool line"),
            }
        }
        reader.finish()?;
        Ok(table)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Description for `name`, or a placeholder naming the API when the table
    /// has no (or an empty) description for it.
    pub fn describe(&self, name: &str) -> String {
        match self.get(name).map(str::trim) {
            Some(desc) if !desc.is_empty() => desc.to_string(),
            _ => format!("use the \"{}\" API", name),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
