//! Reply parsing as an ordered chain of strategies.
//!
//! Each strategy either produces a payload or says why it could not. The
//! chain tries them in order and records every rejection, so the fallback
//! path taken for a reply can be logged and tested on its own.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use proactive_record::{Message, Role, ThinkingProcess, UncertaintyType};

use crate::schema;

/// The structured reply requested from the generator.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnnotationPayload {
    pub messages: Vec<Message>,
    pub sub_category: String,
    pub uncertainty_type: Option<UncertaintyType>,
    pub requires_tool: bool,
    pub thinking_process: ThinkingProcess,
}

impl AnnotationPayload {
    /// Content of the last assistant message, if any.
    pub fn last_assistant(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }
}

/// Result of one strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseAttempt {
    Parsed(AnnotationPayload),
    Rejected(String),
}

/// One way of reading a payload out of a reply.
pub trait ReplyParser {
    fn name(&self) -> &'static str;
    fn attempt(&self, reply: &str) -> ParseAttempt;
}

/// What the chain made of a reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub payload: Option<AnnotationPayload>,
    /// Name of the strategy that produced the payload.
    pub strategy: Option<&'static str>,
    /// Strategies tried before it, with their reasons.
    pub rejections: Vec<(&'static str, String)>,
}

/// Ordered list of strategies; the first success wins.
pub struct ParserChain {
    parsers: Vec<Box<dyn ReplyParser>>,
}

impl fmt::Debug for ParserChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.parsers.iter().map(|p| p.name()))
            .finish()
    }
}

impl ParserChain {
    pub fn new(parsers: Vec<Box<dyn ReplyParser>>) -> Self {
        ParserChain { parsers }
    }

    /// Strict schema-validated JSON, then the first fenced JSON block, then
    /// a lenient read of the whole reply.
    pub fn standard() -> Result<Self, String> {
        let validator = Arc::new(schema::compile(schema::ANNOTATION_SCHEMA)?);
        Ok(ParserChain::new(vec![
            Box::new(StrictJson {
                validator: Arc::clone(&validator),
            }),
            Box::new(FencedJson { validator }),
            Box::new(LenientJson),
        ]))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.parsers.iter().map(|p| p.name()).collect()
    }

    pub fn parse(&self, reply: &str) -> ParseOutcome {
        let mut rejections = Vec::new();
        for parser in &self.parsers {
            match parser.attempt(reply) {
                ParseAttempt::Parsed(payload) => {
                    return ParseOutcome {
                        payload: Some(payload),
                        strategy: Some(parser.name()),
                        rejections,
                    }
                }
                ParseAttempt::Rejected(reason) => rejections.push((parser.name(), reason)),
            }
        }
        ParseOutcome {
            payload: None,
            strategy: None,
            rejections,
        }
    }
}

fn validated(validator: &jsonschema::Validator, text: &str) -> ParseAttempt {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => return ParseAttempt::Rejected(format!("not JSON: {}", e)),
    };
    let errors = schema::violations(validator, &value);
    if !errors.is_empty() {
        return ParseAttempt::Rejected(format!("schema: {}", errors.join("; ")));
    }
    match serde_json::from_value(value) {
        Ok(payload) => ParseAttempt::Parsed(payload),
        Err(e) => ParseAttempt::Rejected(format!("payload: {}", e)),
    }
}

// ── Strategies ──────────────────────────────────────────────────────

/// The whole reply is JSON that satisfies the annotation schema.
pub struct StrictJson {
    validator: Arc<jsonschema::Validator>,
}

impl ReplyParser for StrictJson {
    fn name(&self) -> &'static str {
        "strict_json"
    }

    fn attempt(&self, reply: &str) -> ParseAttempt {
        validated(&self.validator, reply.trim())
    }
}

/// The first ```json fenced block satisfies the annotation schema.
pub struct FencedJson {
    validator: Arc<jsonschema::Validator>,
}

impl ReplyParser for FencedJson {
    fn name(&self) -> &'static str {
        "fenced_json"
    }

    fn attempt(&self, reply: &str) -> ParseAttempt {
        match fenced_json_block(reply) {
            Some(block) => validated(&self.validator, block),
            None => ParseAttempt::Rejected("no ```json block".to_string()),
        }
    }
}

/// The whole reply, or its outermost `{...}` span, read with defaults and
/// no schema check.
pub struct LenientJson;

impl ReplyParser for LenientJson {
    fn name(&self) -> &'static str {
        "lenient_json"
    }

    fn attempt(&self, reply: &str) -> ParseAttempt {
        let trimmed = strip_code_fences(reply);
        let first_err = match serde_json::from_str::<AnnotationPayload>(trimmed) {
            Ok(payload) => return ParseAttempt::Parsed(payload),
            Err(e) => e,
        };
        match outer_object(reply).map(|span| serde_json::from_str::<AnnotationPayload>(span)) {
            Some(Ok(payload)) => ParseAttempt::Parsed(payload),
            Some(Err(e)) => ParseAttempt::Rejected(format!("object span: {}", e)),
            None => ParseAttempt::Rejected(format!("not JSON: {}", first_err)),
        }
    }
}

/// Contents of the first ```json ... ``` block.
pub fn fenced_json_block(text: &str) -> Option<&str> {
    let open = text.find("```json")?;
    let body = &text[open + "```json".len()..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

/// Strip markdown code fences (```json ... ```) wrapping the whole text.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    if text.starts_with("```") {
        let after_open = match text.find('\n') {
            Some(nl) => &text[nl + 1..],
            None => return text,
        };
        if let Some(close) = after_open.rfind("```") {
            return after_open[..close].trim();
        }
        return after_open.trim();
    }
    text
}

fn outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
