//! Pipeline configuration for `proactive --config proactive.toml`.
//!
//! Every field is optional; anything left out keeps its default. Command-line
//! flags override values read here.
//!
//! # Example
//!
//! ```toml
//! [paths]
//! coqa_input = "data/coqa_abg_train.json"
//! scenarios_output = "dataset/proactive_annotations"
//!
//! [generation]
//! model = "gemini-2.0-flash"
//! delay_ms = 1000
//! api_key_env = "GEMINI_API_KEY"
//!
//! [network]
//! proxy = "http://127.0.0.1:10808"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use proactive_annotate::client::DEFAULT_API_KEY_ENV;
use proactive_annotate::{ClientConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL};

/// Config file read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "proactive.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

// ── Types ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub generation: GenerationConfig,
    pub network: NetworkConfig,
}

/// `[paths]`: inputs and outputs of each source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub coqa_input: PathBuf,
    /// Output directory when writing one file per record.
    pub coqa_output_dir: PathBuf,
    /// Output file when writing JSONL.
    pub coqa_output_jsonl: PathBuf,
    pub vague_task_input: PathBuf,
    pub vague_task_output: PathBuf,
    pub tool_use_input: PathBuf,
    pub tool_use_tools: PathBuf,
    pub tool_use_output: PathBuf,
    pub scenarios_input: PathBuf,
    pub scenarios_template: PathBuf,
    pub scenarios_output: PathBuf,
    pub refine_input: PathBuf,
    pub refine_output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            coqa_input: "data/coqa_abg_train.json".into(),
            coqa_output_dir: "dataset/proactive_annotations_from_coqa_abg_all_with_story".into(),
            coqa_output_jsonl:
                "dataset/contextual_ambiguity/proactive_annotations_from_coqa_abg_all_with_story.jsonl"
                    .into(),
            vague_task_input: "data/interaction_data_train.jsonl".into(),
            vague_task_output: "dataset/proactive_annotations_from_in3.jsonl".into(),
            tool_use_input: "data/Seal-Tools_Dataset/train.jsonl".into(),
            tool_use_tools: "data/Seal-Tools_Dataset/tool.jsonl".into(),
            tool_use_output: "dataset/capability_limitation/converted_perplexity_training_data.jsonl"
                .into(),
            scenarios_input: "data/proactive_scenarios.json".into(),
            scenarios_template: "data/proactive_prompt_template.txt".into(),
            scenarios_output: "dataset/proactive_annotations".into(),
            refine_input:
                "dataset/contextual_ambiguity/proactive_annotations_from_coqa_abg_all_with_story.jsonl"
                    .into(),
            refine_output: "dataset/contextual_ambiguity/refined.jsonl".into(),
        }
    }
}

/// `[generation]`: the remote text-generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    pub model: String,
    /// Pause after every service call, in milliseconds.
    pub delay_ms: u64,
    pub endpoint: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            model: DEFAULT_MODEL.to_string(),
            delay_ms: 1000,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: 120,
        }
    }
}

impl GenerationConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Client settings for `api_key`, carrying the endpoint, timeout, and
    /// the proxy from `network`.
    pub fn client_config(&self, api_key: String, network: &NetworkConfig) -> ClientConfig {
        ClientConfig::new(api_key)
            .with_endpoint(self.endpoint.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_proxy(network.proxy.clone())
    }
}

/// `[network]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// HTTP(S) proxy for service calls.
    pub proxy: Option<String>,
}

// ── Loading ─────────────────────────────────────────────────────────

pub fn read_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// The explicit config file if given, else `proactive.toml` in the working
/// directory if present, else defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    match explicit {
        Some(path) => read_config(path),
        None => {
            let fallback = Path::new(DEFAULT_CONFIG_FILE);
            if fallback.is_file() {
                read_config(fallback)
            } else {
                Ok(PipelineConfig::default())
            }
        }
    }
}
