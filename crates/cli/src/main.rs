mod commands;
mod config;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// How converted records are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum SinkFormat {
    /// One pretty-printed JSON file per record, named by id.
    Dir,
    /// One compact JSON object per line.
    Jsonl,
}

/// Proactive dialogue dataset converter.
#[derive(Parser)]
#[command(
    name = "proactive",
    version,
    about = "Convert dialogue corpora into canonical proactive-assistant training records"
)]
struct Cli {
    /// Pipeline config file (default: ./proactive.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert coreference QA items (a JSON document with a `data` array)
    Coqa {
        /// Input JSON document
        #[arg(long)]
        input: Option<PathBuf>,
        /// Output directory (dir) or file (jsonl)
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, default_value = "dir", value_enum)]
        format: SinkFormat,
        /// Merge the story into the first question instead of a separate message
        #[arg(long)]
        merge_story: bool,
        /// Keep existing per-record files instead of overwriting them (dir only)
        #[arg(long)]
        resume: bool,
    },

    /// Convert vague-task interaction logs (JSONL)
    VagueTask {
        /// Input JSONL file
        #[arg(long)]
        input: Option<PathBuf>,
        /// Output directory (dir) or file (jsonl)
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, default_value = "jsonl", value_enum)]
        format: SinkFormat,
        /// Keep existing per-record files instead of overwriting them (dir only)
        #[arg(long)]
        resume: bool,
    },

    /// Convert tool-call logs (JSONL) into capability-limitation records
    ToolUse {
        /// Input JSONL file of tool-call logs
        #[arg(long)]
        input: Option<PathBuf>,
        /// JSONL file of API descriptions
        #[arg(long)]
        tools: Option<PathBuf>,
        /// Output directory (dir) or file (jsonl)
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, default_value = "jsonl", value_enum)]
        format: SinkFormat,
        /// Keep existing per-record files instead of overwriting them (dir only)
        #[arg(long)]
        resume: bool,
    },

    /// Generate records for scenario definitions through the remote model
    Scenarios {
        /// Scenario JSON document with a `scenarios` array
        #[arg(long)]
        input: Option<PathBuf>,
        /// Prompt template file (built-in template if absent)
        #[arg(long)]
        template: Option<PathBuf>,
        /// Output directory; existing records are kept and not regenerated
        #[arg(long)]
        out: Option<PathBuf>,
        /// Model identifier
        #[arg(long)]
        model: Option<String>,
        /// Pause after each service call, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Rewrite the final assistant turn of existing records into sectioned form
    Refine {
        /// Canonical records (JSONL, a JSON file, or a directory of JSON files)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Output JSONL file
        #[arg(long)]
        out: Option<PathBuf>,
        /// Model identifier
        #[arg(long)]
        model: Option<String>,
        /// Pause after each service call, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Validate emitted records against the canonical schema and invariants
    Validate {
        /// Record files, directories of record files, or JSONL files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "proactive=warn" } else { "proactive=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    let config = match config::resolve_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e.to_string(), cli.output, cli.quiet);
            process::exit(1);
        }
    };
    let ctx = commands::Context {
        config,
        output: cli.output,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Coqa {
            input,
            out,
            format,
            merge_story,
            resume,
        } => {
            commands::convert::cmd_coqa(&ctx, input, out, format, merge_story, resume);
        }
        Commands::VagueTask {
            input,
            out,
            format,
            resume,
        } => {
            commands::convert::cmd_vague_task(&ctx, input, out, format, resume);
        }
        Commands::ToolUse {
            input,
            tools,
            out,
            format,
            resume,
        } => {
            commands::convert::cmd_tool_use(&ctx, input, tools, out, format, resume);
        }
        Commands::Scenarios {
            input,
            template,
            out,
            model,
            delay_ms,
        } => {
            commands::scenarios::cmd_scenarios(&ctx, input, template, out, model, delay_ms);
        }
        Commands::Refine {
            input,
            out,
            model,
            delay_ms,
        } => {
            commands::refine::cmd_refine(&ctx, input, out, model, delay_ms);
        }
        Commands::Validate { paths } => {
            commands::validate::cmd_validate(&paths, cli.output, cli.quiet);
        }
    }
}

/// Print an error message to stderr in the requested output format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{{\"error\": \"{}\"}}", msg.replace('"', "\\\""));
        }
    }
}
