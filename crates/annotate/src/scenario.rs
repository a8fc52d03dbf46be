//! Hand-authored scenario definitions fed to the generator.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::warn;

use proactive_core::{id_to_string, read_json_array, ReadError};

/// Top-level key holding the scenario array.
pub const SCENARIOS_KEY: &str = "scenarios";

/// Hex characters of the content hash kept in a derived scenario key.
const KEY_HASH_CHARS: usize = 16;

/// One scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Any JSON value; only a non-empty string or a number names the scenario.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub category: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_user_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_behavior: Option<String>,
    /// Free-form; rendered as text in the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_dialogue: Option<Value>,
}

impl Scenario {
    /// Stable key for output naming and resume.
    ///
    /// The explicit id when present, otherwise `scene_` followed by the
    /// first 16 hex characters of the SHA-256 of the scenario's key-sorted
    /// compact JSON, so key order in the source file does not matter.
    pub fn scenario_key(&self) -> String {
        if let Some(id) = self.id.as_ref().and_then(id_to_string) {
            return id;
        }
        let canonical = match serde_json::to_value(self) {
            Ok(value) => canonical_json(&value),
            Err(_) => format!("{:?}", self),
        };
        let hash = format!("{:x}", Sha256::digest(canonical.as_bytes()));
        format!("scene_{}", &hash[..KEY_HASH_CHARS])
    }

    /// Values for the scenario prompt placeholders.
    pub fn prompt_values(&self, json_schema: &str) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("proactive_category", self.category.clone()),
            ("scenario_description", self.description.clone()),
            (
                "initial_user_query",
                self.initial_user_query.clone().unwrap_or_default(),
            ),
            (
                "required_assistant_behavior",
                self.required_behavior.clone().unwrap_or_default(),
            ),
            ("example_dialogue", self.example_dialogue_text()),
            ("json_schema", json_schema.to_string()),
        ])
    }

    fn example_dialogue_text(&self) -> String {
        match &self.example_dialogue {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())
            }
        }
    }

    /// The opening user turn when the reply carries no usable dialogue.
    pub fn opening_query(&self) -> &str {
        self.initial_user_query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .unwrap_or(&self.description)
    }
}

/// Compact JSON with object keys sorted at every level.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Read the `scenarios` array. A malformed scenario is logged and skipped;
/// a malformed file is an error.
pub fn load_scenarios(path: &Path) -> Result<Vec<Scenario>, ReadError> {
    let items = read_json_array(path, SCENARIOS_KEY)?;
    let mut scenarios = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<Scenario>(item.value) {
            Ok(scenario) => scenarios.push(scenario),
            Err(e) => warn!(position = item.position, error = %e, "skipping scenario"),
        }
    }
    Ok(scenarios)
}
