//! Gemini `generateContent` client (no retry).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GenerateError;

/// Base URL of the Generative Language API.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Environment variable holding the API key, unless configured otherwise.
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Anything that turns a prompt into text.
///
/// Implementations issue one request per call and never retry; callers
/// decide whether to re-run.
pub trait TextGenerator {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, GenerateError>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for &T {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, GenerateError> {
        (**self).generate(model, prompt)
    }
}

// ── Configuration ───────────────────────────────────────────────────

/// Everything the client needs, passed in explicitly. The process
/// environment is never read or changed here.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub endpoint: String,
    /// HTTP(S) proxy URL, e.g. `http://127.0.0.1:10808`.
    pub proxy: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Config with the default endpoint, no proxy, and the default timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        ClientConfig {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            proxy: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Read an API key from the named environment variable.
pub fn api_key_from_env(var: &str) -> Result<String, GenerateError> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(GenerateError::MissingApiKey(var.to_string())),
    }
}

// ── Request / Response types ────────────────────────────────────────

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn into_text(self) -> Result<String, GenerateError> {
        let content = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| GenerateError::Response("response contained no candidates".to_string()))?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.is_empty() {
            return Err(GenerateError::Response(
                "first candidate contained no text".to_string(),
            ));
        }
        Ok(text)
    }
}

// ── Client ──────────────────────────────────────────────────────────

/// Synchronous client for the Gemini REST API.
pub struct GeminiClient {
    agent: ureq::Agent,
    config: ClientConfig,
}

impl GeminiClient {
    pub fn new(config: ClientConfig) -> Result<Self, GenerateError> {
        let proxy = match &config.proxy {
            Some(url) => Some(ureq::Proxy::new(url).map_err(|e| GenerateError::Proxy {
                url: url.clone(),
                message: e.to_string(),
            })?),
            None => None,
        };
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .proxy(proxy)
            .build()
            .into();
        Ok(GeminiClient { agent, config })
    }

    fn url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            model
        )
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, GenerateError> {
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let url = self.url(model);
        let response = self
            .agent
            .post(url.as_str())
            .header("x-goog-api-key", self.config.api_key.as_str())
            .header("content-type", "application/json")
            .send_json(&body)
            .map_err(classify_error)?;

        let parsed: GenerateContentResponse = response
            .into_body()
            .read_json()
            .map_err(|e| GenerateError::Response(e.to_string()))?;

        parsed.into_text()
    }
}

fn classify_error(err: ureq::Error) -> GenerateError {
    match err {
        ureq::Error::StatusCode(status) => GenerateError::Status(status),
        other => GenerateError::Transport(other.to_string()),
    }
}
