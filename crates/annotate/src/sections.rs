//! The three marker-delimited sections of a generated assistant reply.

use proactive_record::markers::{
    compose_sectioned, extract_final_answer, extract_tagged, PERPLEXITY_TAG, THINK_TAG,
};

/// Reasoning used when a reply has no `<think>` section.
pub const DEFAULT_REASONING: &str = "Analysing the user's request...";

/// Caveat used when a reply has no `<perplexity>` section.
pub const DEFAULT_CAVEAT: &str = "As an LLM, I lack the ability to directly retrieve the specific data, assess technical feasibility, or access the internal policies this request depends on.";

/// Answer used when a reply has no `final_answer` section.
pub const DEFAULT_ANSWER: &str = "As an LLM, I cannot complete this request directly. I can outline a general approach or share relevant background knowledge instead. How would you like to proceed?";

/// Reasoning, caveat, and answer extracted from a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sections {
    pub reasoning: String,
    pub caveat: String,
    pub answer: String,
}

impl Sections {
    /// Extract the sections from `text`, substituting the fixed default for
    /// each one that is missing or empty.
    pub fn extract(text: &str) -> Self {
        fn or_default(found: Option<&str>, default: &str) -> String {
            match found {
                Some(s) if !s.is_empty() => s.to_string(),
                _ => default.to_string(),
            }
        }
        Sections {
            reasoning: or_default(extract_tagged(text, THINK_TAG), DEFAULT_REASONING),
            caveat: or_default(extract_tagged(text, PERPLEXITY_TAG), DEFAULT_CAVEAT),
            answer: or_default(extract_final_answer(text), DEFAULT_ANSWER),
        }
    }

    /// The all-default sections.
    pub fn defaults() -> Self {
        Sections {
            reasoning: DEFAULT_REASONING.to_string(),
            caveat: DEFAULT_CAVEAT.to_string(),
            answer: DEFAULT_ANSWER.to_string(),
        }
    }

    /// Whether any section fell back to its sentinel. Callers that care
    /// about quality should filter these records out.
    pub fn is_default(&self) -> bool {
        self.reasoning == DEFAULT_REASONING
            || self.caveat == DEFAULT_CAVEAT
            || self.answer == DEFAULT_ANSWER
    }

    /// `<think>r</think>\n<perplexity>c</perplexity>\nfinal_answer: a`
    pub fn render(&self) -> String {
        compose_sectioned(&self.reasoning, &self.caveat, &self.answer)
    }
}
