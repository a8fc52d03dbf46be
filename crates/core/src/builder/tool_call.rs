//! Tool-calling API logs.
//!
//! The logs hold a user query and the API calls that answered it. The
//! record teaches the assistant to decline and name the capabilities it is
//! missing instead of pretending to make the calls.

use serde::Deserialize;
use serde_json::{Map, Value};

use proactive_record::Message;

use super::{thinking, BehaviorDecision, Example, SourceAdapter, Turn};
use crate::api_table::ApiDescriptionTable;
use crate::error::{ItemError, SourceKind};

pub const UNKNOWN_API: &str = "Unknown API";

#[derive(Debug, Deserialize)]
pub struct ToolCallItem {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub calling: Vec<ApiCall>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCall {
    #[serde(default)]
    pub api: Option<String>,
}

impl ToolCallItem {
    /// Distinct API names, in first-seen order.
    pub fn distinct_apis(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for call in &self.calling {
            let name = call.api.as_deref().unwrap_or(UNKNOWN_API);
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
        seen
    }
}

/// Adapter for the tool-call corpus. Borrows the API description table.
#[derive(Debug, Clone, Copy)]
pub struct ToolCallAdapter<'a> {
    table: &'a ApiDescriptionTable,
}

impl<'a> ToolCallAdapter<'a> {
    pub fn new(table: &'a ApiDescriptionTable) -> Self {
        ToolCallAdapter { table }
    }
}

impl SourceAdapter for ToolCallAdapter<'_> {
    type Raw = ToolCallItem;

    fn kind(&self) -> SourceKind {
        SourceKind::ToolCall
    }

    fn turns(&self, raw: &ToolCallItem) -> Result<Vec<Turn>, ItemError> {
        if raw.calling.is_empty() {
            return Err(ItemError::Empty("calling"));
        }
        Ok(vec![Turn::SINGLE])
    }

    fn extract_signal(&self, raw: &ToolCallItem, _turn: Turn) -> Result<BehaviorDecision, ItemError> {
        let capabilities = raw
            .distinct_apis()
            .into_iter()
            .map(|name| self.table.describe(name))
            .collect();
        Ok(BehaviorDecision::DeclineCapability { capabilities })
    }

    /// `position` is the 0-based line index; the fallback id uses the
    /// 1-based line number.
    fn shape(
        &self,
        raw: &ToolCallItem,
        original: &Value,
        _turn: Turn,
        _decision: &BehaviorDecision,
        position: usize,
    ) -> Result<Example, ItemError> {
        let id = raw
            .id
            .as_ref()
            .and_then(super::id_to_string)
            .unwrap_or_else(|| format!("converted_line_{}", position + 1));

        let sub_category = if raw.calling.len() > 1 {
            "multi_api_call"
        } else {
            "direct_api_call"
        };

        let mut provenance = Map::new();
        provenance.insert("original_tool_call_data".to_string(), original.clone());

        Ok(Example {
            id: id.clone(),
            context: vec![Message::user(raw.query.as_str())],
            sub_category: sub_category.to_string(),
            thinking: thinking::capability_gap(&raw.query, raw.distinct_apis().len()),
            source_dataset_id: None,
            source_scene_id: Some(id),
            provenance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CanonicalRecordBuilder;
    use crate::readers::SourceItem;
    use serde_json::json;

    #[test]
    fn test_distinct_apis_keeps_first_seen_order() {
        let item: ToolCallItem = serde_json::from_value(json!({
            "query": "q",
            "calling": [{"api": "b"}, {"api": "a"}, {"api": "b"}, {}]
        }))
        .unwrap();
        assert_eq!(item.distinct_apis(), ["b", "a", UNKNOWN_API]);
    }

    #[test]
    fn test_single_call_with_fallback_id() {
        let table = ApiDescriptionTable::from_entries([("weather", "check the weather")]);
        let builder = CanonicalRecordBuilder::new(ToolCallAdapter::new(&table));
        let r = builder
            .build(&SourceItem {
                position: 2,
                value: json!({"query": "Rain today?", "calling": [{"api": "weather", "city": "Oslo"}]}),
            })
            .unwrap()
            .remove(0);
        assert_eq!(r.id, "converted_line_3");
        assert_eq!(r.source_scene_id.as_deref(), Some("converted_line_3"));
        assert_eq!(r.sub_category, "direct_api_call");
        assert_eq!(
            r.final_answer,
            "As an LLM, I lack the capability to directly check the weather. I would need access to specific tools or APIs to fulfill this request."
        );
        assert_eq!(r.messages[0], Message::user("Rain today?"));
        assert!(r.requires_tool);
    }

    #[test]
    fn test_empty_calling_is_skipped() {
        let table = ApiDescriptionTable::new();
        let builder = CanonicalRecordBuilder::new(ToolCallAdapter::new(&table));
        let err = builder
            .build(&SourceItem {
                position: 0,
                value: json!({"id": "t1", "query": "q", "calling": []}),
            })
            .unwrap_err();
        assert!(err.to_string().contains("'calling' is empty"));
    }
}
