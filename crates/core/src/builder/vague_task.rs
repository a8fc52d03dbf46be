//! Vague-task interaction logs.
//!
//! One input line holds a whole interaction; every assistant action in it
//! becomes its own example whose context is everything said before it.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use proactive_record::{mint_action_id, Message, Role};

use super::{thinking, BehaviorDecision, Example, SourceAdapter, Turn};
use crate::error::{ItemError, SourceKind};

pub const ID_PREFIX: &str = "vague_task";

/// Action type marking a clarification question.
pub const CLARIFY_ACTION: &str = "New";
pub const SUMMARY_ACTION: &str = "summary";

#[derive(Debug, Deserialize)]
pub struct VagueTaskItem {
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub missing_details: Vec<MissingDetail>,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "unknown".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Action {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, rename = "type")]
    pub action_type: Option<String>,
}

impl Action {
    fn content(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    fn is_clarification(&self) -> bool {
        self.action_type.as_deref() == Some(CLARIFY_ACTION)
    }
}

#[derive(Debug, Deserialize)]
pub struct MissingDetail {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub importance: Option<Value>,
}

/// Adapter for the vague-task corpus.
#[derive(Debug, Clone, Copy, Default)]
pub struct VagueTaskAdapter;

fn action(raw: &VagueTaskItem, turn: Turn) -> Result<&Action, ItemError> {
    raw.actions
        .get(turn.index)
        .ok_or_else(|| ItemError::Invalid(format!("no action at index {}", turn.index)))
}

fn importance_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

impl SourceAdapter for VagueTaskAdapter {
    type Raw = VagueTaskItem;

    fn kind(&self) -> SourceKind {
        SourceKind::VagueTask
    }

    fn turns(&self, raw: &VagueTaskItem) -> Result<Vec<Turn>, ItemError> {
        if raw.actions.is_empty() {
            return Err(ItemError::Empty("actions"));
        }
        Ok(raw
            .actions
            .iter()
            .enumerate()
            .filter(|(_, a)| a.role == Role::Assistant)
            .enumerate()
            .map(|(ordinal, (index, _))| Turn { index, ordinal })
            .collect())
    }

    fn extract_signal(&self, raw: &VagueTaskItem, turn: Turn) -> Result<BehaviorDecision, ItemError> {
        let action = action(raw, turn)?;
        let content = action.content().to_string();
        Ok(if action.is_clarification() {
            BehaviorDecision::Clarify { question: content }
        } else {
            BehaviorDecision::Answer { answer: content }
        })
    }

    fn shape(
        &self,
        raw: &VagueTaskItem,
        original: &Value,
        turn: Turn,
        _decision: &BehaviorDecision,
        position: usize,
    ) -> Result<Example, ItemError> {
        let action = action(raw, turn)?;
        let task = raw.task.trim();

        let mut context = Vec::with_capacity(turn.index + 1);
        context.push(Message::user(task));
        context.extend(raw.actions[..turn.index].iter().map(|a| Message {
            role: a.role,
            content: a.content().to_string(),
        }));

        let action_type = action.action_type.as_deref().unwrap_or_default();
        let (sub_category, thinking) = if action.is_clarification() {
            let detail = raw.missing_details.get(turn.ordinal);
            let description = detail
                .and_then(|d| d.description.as_deref())
                .unwrap_or("unknown detail");
            let importance = importance_text(detail.and_then(|d| d.importance.as_ref()));
            (
                "detail_request",
                thinking::missing_detail(task, description, &importance),
            )
        } else if action_type == SUMMARY_ACTION {
            ("task_summary", thinking::task_progress(task, action_type))
        } else {
            ("task_execution", thinking::task_progress(task, action_type))
        };

        let mut provenance = Map::new();
        provenance.insert("original_action_index".to_string(), json!(turn.index));
        provenance.insert(
            "original_action_type".to_string(),
            json!(action.action_type),
        );
        provenance.insert("original_vague_task_data".to_string(), original.clone());

        Ok(Example {
            id: mint_action_id(ID_PREFIX, position, turn.ordinal),
            context,
            sub_category: sub_category.to_string(),
            thinking,
            source_dataset_id: Some(raw.category.clone()),
            source_scene_id: None,
            provenance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CanonicalRecordBuilder;
    use crate::readers::SourceItem;
    use proactive_record::ProactiveCategory;

    fn interaction() -> Value {
        json!({
            "task": " Plan a trip ",
            "vague": true,
            "category": "travel",
            "missing_details": [
                {"description": "destination", "importance": "3"},
                {"description": "budget", "importance": 2}
            ],
            "actions": [
                {"role": "assistant", "content": "Where to?", "type": "New"},
                {"role": "user", "content": "Paris", "type": "response"},
                {"role": "assistant", "content": "What budget?", "type": "New"},
                {"role": "user", "content": "Cheap", "type": "response"},
                {"role": "assistant", "content": "A cheap Paris trip.", "type": "summary"}
            ]
        })
    }

    #[test]
    fn test_vague_flag_of_any_shape_is_carried_in_original() {
        let mut value = interaction();
        value["vague"] = json!("yes");
        let builder = CanonicalRecordBuilder::new(VagueTaskAdapter);
        let records = builder.build(&SourceItem { position: 0, value }).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0].provenance["original_vague_task_data"]["vague"],
            json!("yes")
        );
    }

    #[test]
    fn test_one_record_per_assistant_action() {
        let builder = CanonicalRecordBuilder::new(VagueTaskAdapter);
        let records = builder
            .build(&SourceItem {
                position: 4,
                value: interaction(),
            })
            .unwrap();
        assert_eq!(records.len(), 3);

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            ids,
            [
                "vague_task_00004_assistant_action_0",
                "vague_task_00004_assistant_action_1",
                "vague_task_00004_assistant_action_2"
            ]
        );

        let second = &records[1];
        assert_eq!(second.proactive_category, ProactiveCategory::Clarification);
        assert_eq!(second.sub_category, "detail_request");
        assert_eq!(second.final_answer, "What budget?");
        assert_eq!(second.messages[0].content, "Plan a trip");
        assert_eq!(second.messages[1].content, "Where to?");
        assert_eq!(second.messages[2].content, "Paris");
        assert_eq!(second.messages.len(), 4);
        assert!(second
            .thinking_process
            .self_reflection
            .information_check
            .contains("'budget' (importance: 2)"));
        assert_eq!(second.provenance["original_action_index"], json!(2));
        assert_eq!(second.source_dataset_id.as_deref(), Some("travel"));

        let last = &records[2];
        assert_eq!(last.proactive_category, ProactiveCategory::DirectAnswer);
        assert_eq!(last.sub_category, "task_summary");
        assert_eq!(last.provenance["original_action_type"], json!("summary"));
    }

    #[test]
    fn test_empty_actions_is_skipped() {
        let builder = CanonicalRecordBuilder::new(VagueTaskAdapter);
        let err = builder
            .build(&SourceItem {
                position: 0,
                value: json!({"task": "t", "actions": []}),
            })
            .unwrap_err();
        assert!(err.to_string().contains("'actions' is empty"));
    }

    #[test]
    fn test_missing_detail_falls_back_to_unknown() {
        let builder = CanonicalRecordBuilder::new(VagueTaskAdapter);
        let value = json!({
            "task": "t",
            "actions": [{"role": "assistant", "content": "Which?", "type": "New"}]
        });
        let r = builder
            .build(&SourceItem { position: 0, value })
            .unwrap()
            .remove(0);
        assert!(r
            .thinking_process
            .self_reflection
            .information_check
            .contains("'unknown detail' (importance: unknown)"));
        assert_eq!(r.source_dataset_id.as_deref(), Some("unknown"));
    }
}
