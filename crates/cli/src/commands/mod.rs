pub(crate) mod convert;
pub(crate) mod refine;
pub(crate) mod scenarios;
pub(crate) mod validate;

use std::path::{Path, PathBuf};
use std::process;

use serde::Serialize;

use proactive_annotate::client::api_key_from_env;
use proactive_annotate::GeminiClient;
use proactive_storage::{DirectorySink, JsonlSink, RecordSink, SinkError};

use crate::config::PipelineConfig;
use crate::{report_error, OutputFormat, SinkFormat};

/// Settings shared by every command.
pub(crate) struct Context {
    pub config: PipelineConfig,
    pub output: OutputFormat,
    pub quiet: bool,
}

impl Context {
    /// Report `msg` and exit with status 1.
    pub fn fail(&self, msg: &str) -> ! {
        report_error(msg, self.output, self.quiet);
        process::exit(1);
    }

    /// A client for the configured service. Exits when the API key is
    /// missing or the proxy URL is invalid.
    pub fn client(&self) -> GeminiClient {
        let generation = &self.config.generation;
        let api_key = api_key_from_env(&generation.api_key_env)
            .unwrap_or_else(|e| self.fail(&e.to_string()));
        GeminiClient::new(generation.client_config(api_key, &self.config.network))
            .unwrap_or_else(|e| self.fail(&e.to_string()))
    }
}

pub(crate) fn open_sink(
    out: &Path,
    format: SinkFormat,
    resume: bool,
) -> Result<Box<dyn RecordSink>, SinkError> {
    Ok(match format {
        SinkFormat::Dir => Box::new(DirectorySink::create(out, resume)?),
        SinkFormat::Jsonl => Box::new(JsonlSink::create(out)?),
    })
}

/// Final counts of one run, printed as the last line on stdout.
#[derive(Debug, Serialize)]
pub(crate) struct RunReport {
    pub command: &'static str,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaulted: Option<usize>,
    pub sink: PathBuf,
}

impl RunReport {
    pub fn print(&self, output: OutputFormat) {
        match output {
            OutputFormat::Text => {
                let mut line = format!(
                    "Conversion complete: {} records written to {} ({} skipped, {} failed",
                    self.written,
                    self.sink.display(),
                    self.skipped,
                    self.failed
                );
                if let Some(defaulted) = self.defaulted {
                    line.push_str(&format!(", {} with default sections", defaulted));
                }
                line.push(')');
                println!("{}", line);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(self).unwrap_or_default());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_json_omits_unset_defaulted() {
        let report = RunReport {
            command: "coqa",
            written: 2,
            skipped: 0,
            failed: 1,
            defaulted: None,
            sink: PathBuf::from("out"),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["written"], 2);
        assert!(value.get("defaulted").is_none());
    }

    #[test]
    fn test_open_sink_by_format() {
        let dir = tempfile::tempdir().unwrap();
        let jsonl = open_sink(&dir.path().join("a.jsonl"), SinkFormat::Jsonl, false).unwrap();
        assert!(jsonl.location().ends_with("a.jsonl"));
        let per_file = open_sink(&dir.path().join("records"), SinkFormat::Dir, false).unwrap();
        assert!(per_file.location().is_dir());
    }
}
