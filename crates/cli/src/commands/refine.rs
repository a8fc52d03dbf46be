use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use proactive_annotate::Refiner;
use proactive_storage::{load_records, JsonlSink, RecordSink};

use super::{Context, RunReport};

pub(crate) fn cmd_refine(
    ctx: &Context,
    input: Option<PathBuf>,
    out: Option<PathBuf>,
    model: Option<String>,
    delay_ms: Option<u64>,
) {
    let paths = &ctx.config.paths;
    let generation = &ctx.config.generation;
    let input = input.unwrap_or_else(|| paths.refine_input.clone());
    let out = out.unwrap_or_else(|| paths.refine_output.clone());

    let loaded = load_records(&input).unwrap_or_else(|e| ctx.fail(&e.to_string()));
    let mut unreadable = 0;
    let records: Vec<_> = loaded
        .iter()
        .filter_map(|entry| match entry.parse() {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(origin = %entry.origin, error = %e, "skipping unreadable record");
                unreadable += 1;
                None
            }
        })
        .collect();

    let client = ctx.client();
    let mut sink = JsonlSink::create(&out).unwrap_or_else(|e| ctx.fail(&e.to_string()));
    let model = model.unwrap_or_else(|| generation.model.clone());
    let delay = delay_ms.map_or_else(|| generation.delay(), Duration::from_millis);
    info!(input = %input.display(), records = records.len(), model = %model, "refining records");

    let summary = Refiner::new(client, model, delay).run(records, &mut sink);
    if let Err(e) = sink.finish() {
        ctx.fail(&e.to_string());
    }

    RunReport {
        command: "refine",
        written: summary.refined,
        skipped: summary.unsuitable + unreadable,
        failed: summary.failed,
        defaulted: Some(summary.defaulted),
        sink: out,
    }
    .print(ctx.output);
}
