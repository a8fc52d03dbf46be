//! `coqa`, `vague-task`, and `tool-use`: deterministic source conversion.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use proactive_core::builder::coqa::DATA_KEY;
use proactive_core::{
    convert_into, read_json_array, ApiDescriptionTable, CanonicalRecordBuilder, CoqaAdapter,
    JsonlReader, SourceAdapter, SourceItem, StoryLayout, ToolCallAdapter, VagueTaskAdapter,
};
use proactive_storage::{RecordSink, WriteOutcome};

use super::{open_sink, Context, RunReport};
use crate::SinkFormat;

/// Build every item and write the records to `sink`.
///
/// Items that fail to build and records the sink refuses are logged and
/// counted; neither stops the run.
fn write_all<A, I>(
    command: &'static str,
    builder: &CanonicalRecordBuilder<A>,
    items: I,
    sink: &mut dyn RecordSink,
) -> RunReport
where
    A: SourceAdapter,
    I: IntoIterator<Item = SourceItem>,
{
    let mut written = 0;
    let mut skipped = 0;
    let mut failed = 0;
    let conversion = convert_into(builder, items, |record| match sink.write(&record) {
        Ok(WriteOutcome::Written(_)) => written += 1,
        Ok(WriteOutcome::SkippedExisting(path)) => {
            info!(id = %record.id, path = %path.display(), "output exists, skipping");
            skipped += 1;
        }
        Err(e) => {
            error!(id = %record.id, error = %e, "cannot write record");
            failed += 1;
        }
    });

    info!(
        items = conversion.items_seen,
        records = conversion.records_emitted,
        skipped_items = conversion.skipped.len(),
        "conversion finished"
    );
    RunReport {
        command,
        written,
        skipped,
        failed: failed + conversion.skipped.len(),
        defaulted: None,
        sink: sink.location().to_path_buf(),
    }
}

fn run(
    ctx: &Context,
    command: &'static str,
    out: &Path,
    format: SinkFormat,
    resume: bool,
    convert: impl FnOnce(&mut dyn RecordSink) -> RunReport,
) {
    let mut sink = open_sink(out, format, resume).unwrap_or_else(|e| ctx.fail(&e.to_string()));
    let report = convert(sink.as_mut());
    if let Err(e) = sink.finish() {
        ctx.fail(&e.to_string());
    }
    report.print(ctx.output);
}

/// Directory output defaults to the JSONL path without its extension.
fn default_out(jsonl: &Path, format: SinkFormat) -> PathBuf {
    match format {
        SinkFormat::Jsonl => jsonl.to_path_buf(),
        SinkFormat::Dir => jsonl.with_extension(""),
    }
}

pub(crate) fn cmd_coqa(
    ctx: &Context,
    input: Option<PathBuf>,
    out: Option<PathBuf>,
    format: SinkFormat,
    merge_story: bool,
    resume: bool,
) {
    let paths = &ctx.config.paths;
    let input = input.unwrap_or_else(|| paths.coqa_input.clone());
    let out = out.unwrap_or_else(|| match format {
        SinkFormat::Dir => paths.coqa_output_dir.clone(),
        SinkFormat::Jsonl => paths.coqa_output_jsonl.clone(),
    });

    let items = read_json_array(&input, DATA_KEY).unwrap_or_else(|e| ctx.fail(&e.to_string()));
    let layout = if merge_story {
        StoryLayout::MergeIntoFirst
    } else {
        StoryLayout::Separate
    };
    let builder = CanonicalRecordBuilder::new(CoqaAdapter::new(layout));
    info!(input = %input.display(), items = items.len(), ?layout, "converting coreference QA");

    run(ctx, "coqa", &out, format, resume, |sink| {
        write_all("coqa", &builder, items, sink)
    });
}

pub(crate) fn cmd_vague_task(
    ctx: &Context,
    input: Option<PathBuf>,
    out: Option<PathBuf>,
    format: SinkFormat,
    resume: bool,
) {
    let paths = &ctx.config.paths;
    let input = input.unwrap_or_else(|| paths.vague_task_input.clone());
    let out = out.unwrap_or_else(|| default_out(&paths.vague_task_output, format));

    let mut reader = JsonlReader::open(&input).unwrap_or_else(|e| ctx.fail(&e.to_string()));
    let builder = CanonicalRecordBuilder::new(VagueTaskAdapter);
    info!(input = %input.display(), "converting vague-task logs");

    run(ctx, "vague-task", &out, format, resume, |sink| {
        let mut report = write_all("vague-task", &builder, reader.by_ref(), sink);
        report.failed += reader.malformed_lines();
        if let Some(e) = reader.read_error() {
            error!(input = %input.display(), error = %e, "input ended early, later lines not converted");
            report.failed += 1;
        }
        report
    });
}

pub(crate) fn cmd_tool_use(
    ctx: &Context,
    input: Option<PathBuf>,
    tools: Option<PathBuf>,
    out: Option<PathBuf>,
    format: SinkFormat,
    resume: bool,
) {
    let paths = &ctx.config.paths;
    let input = input.unwrap_or_else(|| paths.tool_use_input.clone());
    let tools = tools.unwrap_or_else(|| paths.tool_use_tools.clone());
    let out = out.unwrap_or_else(|| default_out(&paths.tool_use_output, format));

    // Without descriptions every API falls back to its placeholder text.
    let table = ApiDescriptionTable::load(&tools).unwrap_or_else(|e| {
        warn!(error = %e, "no API descriptions loaded");
        ApiDescriptionTable::new()
    });
    let mut reader = JsonlReader::open(&input).unwrap_or_else(|e| ctx.fail(&e.to_string()));
    let builder = CanonicalRecordBuilder::new(ToolCallAdapter::new(&table));
    info!(input = %input.display(), apis = table.len(), "converting tool-call logs");

    run(ctx, "tool-use", &out, format, resume, |sink| {
        let mut report = write_all("tool-use", &builder, reader.by_ref(), sink);
        report.failed += reader.malformed_lines();
        if let Some(e) = reader.read_error() {
            error!(input = %input.display(), error = %e, "input ended early, later lines not converted");
            report.failed += 1;
        }
        report
    });
}
