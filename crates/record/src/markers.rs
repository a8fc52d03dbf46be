//! Fixed textual markers embedded in assistant content.
//!
//! `<perplexity>` wraps a clarification question or a capability caveat,
//! `<think>` wraps reasoning, and `final_answer:` introduces the terminal
//! answer of a sectioned reply.

pub const PERPLEXITY_TAG: &str = "perplexity";
pub const THINK_TAG: &str = "think";
pub const FINAL_ANSWER_PREFIX: &str = "final_answer:";

/// `<perplexity>{text}</perplexity>`
pub fn wrap_perplexity(text: &str) -> String {
    wrap(PERPLEXITY_TAG, text)
}

/// `<think>{text}</think>`
pub fn wrap_think(text: &str) -> String {
    wrap(THINK_TAG, text)
}

fn wrap(tag: &str, text: &str) -> String {
    format!("<{tag}>{text}</{tag}>")
}

/// Return the trimmed content of the first `<tag>...</tag>` span.
///
/// Spans may cross lines. An opening tag without a closing tag yields `None`.
pub fn extract_tagged<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = text.find(&open)? + open.len();
    let len = text[start..].find(&close)?;
    Some(text[start..start + len].trim())
}

/// Return the trimmed text following the last `final_answer` marker.
///
/// The colon is optional, matching replies that write `final_answer` on
/// its own line.
pub fn extract_final_answer(text: &str) -> Option<&str> {
    let marker = FINAL_ANSWER_PREFIX.trim_end_matches(':');
    let start = text.rfind(marker)? + marker.len();
    let rest = text[start..].trim_start();
    let rest = rest.strip_prefix(':').unwrap_or(rest);
    Some(rest.trim())
}

/// Render the three sections of a sectioned assistant reply.
pub fn compose_sectioned(reasoning: &str, caveat: &str, answer: &str) -> String {
    format!(
        "{}\n{}\n{} {}",
        wrap_think(reasoning),
        wrap_perplexity(caveat),
        FINAL_ANSWER_PREFIX,
        answer
    )
}
