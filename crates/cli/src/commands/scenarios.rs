use std::path::{Path, PathBuf};

use tracing::info;

use proactive_annotate::prompt::SCENARIO_PLACEHOLDERS;
use proactive_annotate::{
    load_scenarios, AnnotationGenerator, GeneratorOptions, PromptError, PromptTemplate,
};
use proactive_storage::{DirectorySink, RecordSink};

use super::{Context, RunReport};

/// An explicit template must exist; the configured default path falls back
/// to the built-in template when the file is absent.
fn resolve_template(
    explicit: Option<&Path>,
    configured: &Path,
) -> Result<PromptTemplate, PromptError> {
    match explicit {
        Some(path) => PromptTemplate::load(path, SCENARIO_PLACEHOLDERS),
        None if configured.is_file() => PromptTemplate::load(configured, SCENARIO_PLACEHOLDERS),
        None => PromptTemplate::default_scenario(),
    }
}

pub(crate) fn cmd_scenarios(
    ctx: &Context,
    input: Option<PathBuf>,
    template: Option<PathBuf>,
    out: Option<PathBuf>,
    model: Option<String>,
    delay_ms: Option<u64>,
) {
    let paths = &ctx.config.paths;
    let generation = &ctx.config.generation;
    let input = input.unwrap_or_else(|| paths.scenarios_input.clone());
    let out = out.unwrap_or_else(|| paths.scenarios_output.clone());

    // Everything that can be checked locally is checked before the first
    // request.
    let template = resolve_template(template.as_deref(), &paths.scenarios_template)
        .unwrap_or_else(|e| ctx.fail(&e.to_string()));
    let scenarios = load_scenarios(&input).unwrap_or_else(|e| ctx.fail(&e.to_string()));
    let mut sink = DirectorySink::create(&out, true).unwrap_or_else(|e| ctx.fail(&e.to_string()));
    let client = ctx.client();

    let options = GeneratorOptions {
        model: model.unwrap_or_else(|| generation.model.clone()),
        delay: delay_ms.map_or_else(|| generation.delay(), std::time::Duration::from_millis),
    };
    info!(
        input = %input.display(),
        scenarios = scenarios.len(),
        model = %options.model,
        "generating scenario records"
    );
    let generator = AnnotationGenerator::new(client, template, options)
        .unwrap_or_else(|e| ctx.fail(&e));

    let summary = generator.run(&scenarios, &mut sink);
    if let Err(e) = sink.finish() {
        ctx.fail(&e.to_string());
    }

    RunReport {
        command: "scenarios",
        written: summary.written,
        skipped: summary.skipped,
        failed: summary.failed,
        defaulted: Some(summary.defaulted),
        sink: out,
    }
    .print(ctx.output);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_configured_template_uses_builtin() {
        let t = resolve_template(None, Path::new("/nonexistent/template.txt")).unwrap();
        assert_eq!(t, PromptTemplate::default_scenario().unwrap());
    }

    #[test]
    fn test_missing_explicit_template_is_error() {
        let err = resolve_template(Some(Path::new("/nonexistent/template.txt")), Path::new("x"))
            .unwrap_err();
        assert!(matches!(err, PromptError::Read { .. }));
    }
}
