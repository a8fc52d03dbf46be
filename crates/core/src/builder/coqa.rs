//! Coreference/ambiguity QA pairs.
//!
//! Each item is a story, a history of answered questions, a target
//! question, and optionally the clarification question a human asked back
//! instead of answering.

use serde::Deserialize;
use serde_json::{Map, Value};

use proactive_record::markers::wrap_think;
use proactive_record::{mint_sequential_id, Message};

use super::{thinking, BehaviorDecision, Example, SourceAdapter, Turn};
use crate::error::{ItemError, SourceKind};

pub const ID_PREFIX: &str = "converted_item";

/// Top-level key holding the item array.
pub const DATA_KEY: &str = "data";

/// Where the story passage goes in the reconstructed conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoryLayout {
    /// The story is its own leading user message.
    #[default]
    Separate,
    /// The story is merged into the first question of the conversation.
    MergeIntoFirst,
}

#[derive(Debug, Deserialize)]
pub struct CoqaItem {
    pub id: Option<Value>,
    #[serde(default)]
    pub story: String,
    #[serde(default)]
    pub history_turns: Vec<HistoryTurn>,
    pub target_turn: Option<TargetTurn>,
    #[serde(default)]
    pub clarification_turn: Option<Value>,
    #[serde(default)]
    pub ambiguity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryTurn {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub rationale: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TargetTurn {
    pub question: String,
    pub answer: String,
}

/// Adapter for the coreference QA corpus.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoqaAdapter {
    layout: StoryLayout,
}

impl CoqaAdapter {
    pub fn new(layout: StoryLayout) -> Self {
        CoqaAdapter { layout }
    }

    pub fn layout(&self) -> StoryLayout {
        self.layout
    }
}

fn target(raw: &CoqaItem) -> Result<&TargetTurn, ItemError> {
    raw.target_turn
        .as_ref()
        .ok_or(ItemError::MissingField("target_turn"))
}

/// The clarification question, if the item carries a clarification turn.
///
/// Null, `false`, and empty objects, strings, or arrays count as absent.
fn clarification_question(raw: &CoqaItem) -> Result<Option<String>, ItemError> {
    let turn = match &raw.clarification_turn {
        None | Some(Value::Null) | Some(Value::Bool(false)) => return Ok(None),
        Some(Value::Object(map)) if map.is_empty() => return Ok(None),
        Some(Value::String(s)) if s.is_empty() => return Ok(None),
        Some(Value::Array(a)) if a.is_empty() => return Ok(None),
        Some(turn) => turn,
    };
    match turn.get("question") {
        Some(Value::String(q)) => Ok(Some(q.clone())),
        Some(_) => Err(ItemError::Invalid(
            "clarification_turn.question must be a string".to_string(),
        )),
        None => Err(ItemError::MissingField("clarification_turn.question")),
    }
}

fn merged_opening(story: &str, question: &str) -> String {
    if story.is_empty() {
        question.to_string()
    } else {
        format!(
            "According to the story:\n\n{}\n\nAnswer the following question:\n\n{}",
            story, question
        )
    }
}

impl CoqaAdapter {
    fn context(&self, raw: &CoqaItem, target: &TargetTurn) -> Vec<Message> {
        let mut messages = Vec::with_capacity(raw.history_turns.len() * 2 + 2);
        match self.layout {
            StoryLayout::Separate => {
                if !raw.story.is_empty() {
                    messages.push(Message::user(raw.story.as_str()));
                }
                for turn in &raw.history_turns {
                    messages.push(Message::user(turn.question.as_str()));
                    messages.push(Message::assistant(turn.answer.as_str()));
                }
                messages.push(Message::user(target.question.as_str()));
            }
            StoryLayout::MergeIntoFirst => {
                let story = raw.story.trim();
                let Some((first, rest)) = raw.history_turns.split_first() else {
                    messages.push(Message::user(merged_opening(story, &target.question)));
                    return messages;
                };
                messages.push(Message::user(merged_opening(story, &first.question)));
                messages.push(Message::assistant(first.answer.as_str()));
                for turn in rest {
                    messages.push(Message::user(turn.question.as_str()));
                    let answer = match &turn.rationale {
                        Some(r) => format!("{}{}", wrap_think(r), turn.answer),
                        None => turn.answer.clone(),
                    };
                    messages.push(Message::assistant(answer));
                }
                messages.push(Message::user(target.question.as_str()));
            }
        }
        messages
    }
}

impl SourceAdapter for CoqaAdapter {
    type Raw = CoqaItem;

    fn kind(&self) -> SourceKind {
        SourceKind::Coqa
    }

    fn turns(&self, _raw: &CoqaItem) -> Result<Vec<Turn>, ItemError> {
        Ok(vec![Turn::SINGLE])
    }

    fn extract_signal(&self, raw: &CoqaItem, _turn: Turn) -> Result<BehaviorDecision, ItemError> {
        let target = target(raw)?;
        Ok(match clarification_question(raw)? {
            Some(question) => BehaviorDecision::Clarify { question },
            None => BehaviorDecision::Answer {
                answer: target.answer.clone(),
            },
        })
    }

    fn shape(
        &self,
        raw: &CoqaItem,
        original: &Value,
        _turn: Turn,
        decision: &BehaviorDecision,
        position: usize,
    ) -> Result<Example, ItemError> {
        let target = target(raw)?;
        let source_id = raw
            .id
            .as_ref()
            .and_then(super::id_to_string)
            .ok_or(ItemError::MissingField("id"))?;

        let (sub_category, thinking) = match decision {
            BehaviorDecision::Clarify { .. } => (
                "contextual_ambiguity".to_string(),
                thinking::ambiguous_question(&target.question),
            ),
            _ => (
                raw.ambiguity
                    .clone()
                    .unwrap_or_else(|| "non_ambiguous".to_string()),
                thinking::answerable_question(&target.question),
            ),
        };

        let mut provenance = Map::new();
        provenance.insert("original_coref_data".to_string(), original.clone());

        Ok(Example {
            id: mint_sequential_id(ID_PREFIX, position),
            context: self.context(raw, target),
            sub_category,
            thinking,
            source_dataset_id: Some(source_id),
            source_scene_id: None,
            provenance,
        })
    }
}
