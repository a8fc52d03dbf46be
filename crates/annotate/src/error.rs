/// Failure of one request to the text-generation service.
///
/// Any of these drops the record for this run; the caller may re-run later.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("API key environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("invalid proxy URL '{url}': {message}")]
    Proxy { url: String, message: String },

    #[error("service returned HTTP {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("cannot read service response: {0}")]
    Response(String),
}

/// A prompt template that cannot be parsed or rendered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    #[error("unknown placeholder '{{{name}}}' in prompt template")]
    UnknownPlaceholder { name: String },

    #[error("unclosed '{{' at byte {offset} in prompt template")]
    Unclosed { offset: usize },

    #[error("single '}}' at byte {offset} in prompt template (use '}}}}')")]
    StrayClose { offset: usize },

    #[error("invalid placeholder '{{{text}}}' in prompt template")]
    InvalidPlaceholder { text: String },

    #[error("cannot read prompt template {path}: {message}")]
    Read { path: String, message: String },

    #[error("no value for placeholder '{{{name}}}'")]
    MissingValue { name: String },
}

/// Why one scenario produced no record.
#[derive(Debug, thiserror::Error)]
pub enum AnnotateError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Generate(#[from] GenerateError),
}
