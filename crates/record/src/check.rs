//! Invariant checks over a finished [`CanonicalRecord`].

use crate::markers::{extract_final_answer, wrap_perplexity};
use crate::types::{CanonicalRecord, ProactiveCategory, Role};

/// A single invariant violation found in a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("record '{id}' has no messages")]
    EmptyMessages { id: String },

    #[error("record '{id}' has no user message")]
    NoUserMessage { id: String },

    #[error("record '{id}' does not end with an assistant message")]
    MissingTrailingAssistant { id: String },

    #[error("record '{id}' has an empty id")]
    EmptyId { id: String },

    #[error("record '{id}': clarification text is not wrapped in the assistant message")]
    ClarificationNotWrapped { id: String },

    #[error("record '{id}': final answer does not match the assistant message")]
    AnswerMismatch { id: String },

    #[error("record '{id}': uncertainty type set on non-help-seeking category '{category}'")]
    UnexpectedUncertainty { id: String, category: String },
}

impl CanonicalRecord {
    /// Check the record invariants, collecting every violation.
    pub fn check(&self) -> Result<(), Vec<RecordError>> {
        let id = self.id.clone();
        let mut errors = Vec::new();

        if self.id.trim().is_empty() {
            errors.push(RecordError::EmptyId { id: id.clone() });
        }

        if self.messages.is_empty() {
            errors.push(RecordError::EmptyMessages { id });
            return Err(errors);
        }

        if !self.messages.iter().any(|m| m.role == Role::User) {
            errors.push(RecordError::NoUserMessage { id: id.clone() });
        }

        match self.target_message() {
            None => errors.push(RecordError::MissingTrailingAssistant { id: id.clone() }),
            Some(target) => {
                let sectioned = extract_final_answer(&target.content);
                match self.proactive_category {
                    ProactiveCategory::Clarification => {
                        let wrapped = target.content.contains(&wrap_perplexity(&self.final_answer));
                        if !wrapped && sectioned != Some(self.final_answer.as_str()) {
                            errors.push(RecordError::ClarificationNotWrapped { id: id.clone() });
                        }
                    }
                    ProactiveCategory::DirectAnswer => {
                        if target.content != self.final_answer
                            && sectioned != Some(self.final_answer.as_str())
                        {
                            errors.push(RecordError::AnswerMismatch { id: id.clone() });
                        }
                    }
                    _ => {}
                }
            }
        }

        if self.uncertainty_type.is_some() && !self.proactive_category.is_help_seeking() {
            errors.push(RecordError::UnexpectedUncertainty {
                id,
                category: self.proactive_category.to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
