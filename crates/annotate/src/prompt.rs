//! Prompt templates with named `{placeholder}` slots.
//!
//! `{{` and `}}` render as literal braces. Templates are checked against
//! the set of names the caller can fill when they are loaded, so a typo in
//! a template fails before any request is made.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::PromptError;

/// Placeholders a scenario prompt template may use.
pub const SCENARIO_PLACEHOLDERS: &[&str] = &[
    "proactive_category",
    "scenario_description",
    "initial_user_query",
    "required_assistant_behavior",
    "example_dialogue",
    "json_schema",
];

/// Built-in scenario prompt template.
pub const DEFAULT_SCENARIO_TEMPLATE: &str =
    include_str!("../../../docs/scenario-prompt-template.txt");

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl PromptTemplate {
    /// Parse `text`, rejecting any placeholder not listed in `allowed`.
    pub fn parse(text: &str, allowed: &[&str]) -> Result<Self, PromptError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = text;
        let mut offset = 0;

        while let Some(i) = rest.find(&['{', '}'][..]) {
            literal.push_str(&rest[..i]);
            let tail = &rest[i..];
            if tail.starts_with("{{") {
                literal.push('{');
                rest = &tail[2..];
                offset += i + 2;
            } else if tail.starts_with("}}") {
                literal.push('}');
                rest = &tail[2..];
                offset += i + 2;
            } else if tail.starts_with('}') {
                return Err(PromptError::StrayClose { offset: offset + i });
            } else {
                let close = tail.find('}').ok_or(PromptError::Unclosed { offset: offset + i })?;
                let name = &tail[1..close];
                if !is_identifier(name) {
                    return Err(PromptError::InvalidPlaceholder {
                        text: name.to_string(),
                    });
                }
                if !allowed.contains(&name) {
                    return Err(PromptError::UnknownPlaceholder {
                        name: name.to_string(),
                    });
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(name.to_string()));
                rest = &tail[close + 1..];
                offset += i + close + 1;
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(PromptTemplate { segments })
    }

    /// Read and parse a template file. The text is trimmed first.
    pub fn load(path: &Path, allowed: &[&str]) -> Result<Self, PromptError> {
        let text = std::fs::read_to_string(path).map_err(|e| PromptError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(text.trim(), allowed)
    }

    /// The built-in scenario template.
    pub fn default_scenario() -> Result<Self, PromptError> {
        Self::parse(DEFAULT_SCENARIO_TEMPLATE.trim(), SCENARIO_PLACEHOLDERS)
    }

    /// Distinct placeholder names, in first-use order.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Placeholder(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Fill every placeholder from `values`.
    pub fn render(&self, values: &BTreeMap<&str, String>) -> Result<String, PromptError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = values
                        .get(name.as_str())
                        .ok_or_else(|| PromptError::MissingValue { name: name.clone() })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// Prompt for rewriting the final assistant turn of an existing record into
/// reasoning, caveat, and answer sections.
pub fn refine_prompt(history: &str, last_request: &str, current_reply: &str) -> String {
    format!(
        "Analyse the conversation history and the user's last request, then reply in the format below.\n\
         \n\
         Conversation history: {history}\n\
         User's last request: {last_request}\n\
         Reply to rewrite: {current_reply}\n\
         \n\
         Reply in exactly this format:\n\
         <think>\n\
         your reasoning: go through each part of the request and say which parts are clear and which are vague\n\
         </think>\n\
         <perplexity>\n\
         if some part cannot be resolved, say here what you do not understand or cannot do\n\
         </perplexity>\n\
         final_answer:\n\
         \n\
         Requirements:\n\
         1. The think section analyses the ambiguity of the request in detail.\n\
         2. The perplexity section states the concrete reason the task cannot be completed directly.\n\
         3. The final_answer explains politely to the user what cannot be done directly and offers a way forward."
    )
}
