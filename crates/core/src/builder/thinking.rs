//! Fixed phrase templates for the `thinking_process` bookkeeping object.
//!
//! Nothing here infers anything: each function fills the question or task
//! text into a sentence chosen by the branch the builder took.

use proactive_record::{SelfReflection, ThinkingProcess};

const NO_TOOL_LANGUAGE: &str = "This is a language understanding task; no external tool is needed.";
const NO_TOOL_INTERACTION: &str =
    "This is a language understanding and interaction task; no external tool is needed.";

fn thinking(intent: String, information: String, knowledge: String, tool: &str) -> ThinkingProcess {
    ThinkingProcess {
        intent_understanding: intent,
        self_reflection: SelfReflection {
            information_check: information,
            knowledge_check: knowledge,
            tool_check: tool.to_string(),
        },
    }
}

/// Ambiguous question over a story.
pub fn ambiguous_question(question: &str) -> ThinkingProcess {
    thinking(
        format!(
            "The assistant notices that the question '{}' has an unclear reference and could point to more than one object or concept.",
            question
        ),
        "Reviewing the story and the conversation so far, the referent of the question is not determined.".to_string(),
        "Given the context, the answer could correspond to several candidates.".to_string(),
        NO_TOOL_LANGUAGE,
    )
}

/// Answerable question over a story.
pub fn answerable_question(question: &str) -> ThinkingProcess {
    thinking(
        format!(
            "The assistant understands the question '{}' and finds the answer in the context.",
            question
        ),
        "The story and the conversation so far are sufficient to answer.".to_string(),
        format!("The assistant has located the answer to '{}'.", question),
        NO_TOOL_LANGUAGE,
    )
}

/// Vague task missing a detail the assistant asks about.
pub fn missing_detail(task: &str, description: &str, importance: &str) -> ThinkingProcess {
    thinking(
        format!(
            "The assistant recognises that the task '{}' is vague and lacks key details.",
            task
        ),
        format!(
            "The task and conversation so far say nothing about '{}' (importance: {}).",
            description, importance
        ),
        "This information is needed to serve the request well.".to_string(),
        NO_TOOL_INTERACTION,
    )
}

/// Task step the assistant carries out or summarises.
pub fn task_progress(task: &str, action_type: &str) -> ThinkingProcess {
    thinking(
        format!(
            "The assistant understands the task '{}' and the conversation, and provides a summary or an execution result.",
            task
        ),
        "The conversation and task requirements provide enough to respond.".to_string(),
        format!(
            "The assistant produces a reply of type '{}' from the available information.",
            action_type
        ),
        NO_TOOL_INTERACTION,
    )
}

/// Request that needs tools the assistant lacks.
pub fn capability_gap(query: &str, api_count: usize) -> ThinkingProcess {
    thinking(
        format!(
            "The assistant understands the request '{}' and sees that it needs live external operations.",
            query
        ),
        "The request itself is clear.".to_string(),
        "The assistant cannot perform these operations from its own knowledge.".to_string(),
        &format!(
            "Fulfilling the request requires {} external API{} the assistant has no access to.",
            api_count,
            if api_count == 1 { "" } else { "s" }
        ),
    )
}
