//! Rewrite the final assistant turn of existing records into sectioned form.

use std::time::Duration;

use tracing::{error, info, warn};

use proactive_record::{CanonicalRecord, Message, Role};
use proactive_storage::RecordSink;

use crate::client::TextGenerator;
use crate::error::GenerateError;
use crate::prompt::refine_prompt;
use crate::sections::Sections;

/// Counts from one [`Refiner::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefineSummary {
    pub refined: usize,
    /// Records dropped because the request failed.
    pub failed: usize,
    /// Records not ending in a user request followed by an assistant reply;
    /// no request was made.
    pub unsuitable: usize,
    /// Refined records where at least one section is a sentinel.
    pub defaulted: usize,
}

pub struct Refiner<G> {
    generator: G,
    model: String,
    delay: Duration,
}

impl<G: TextGenerator> Refiner<G> {
    pub fn new(generator: G, model: impl Into<String>, delay: Duration) -> Self {
        Refiner {
            generator,
            model: model.into(),
            delay,
        }
    }

    /// The rewrite prompt for `record`, or `None` unless it ends with a user
    /// request followed by an assistant reply.
    pub fn prompt_for(record: &CanonicalRecord) -> Option<String> {
        let reply = record.target_message()?;
        let n = record.messages.len();
        let request = n
            .checked_sub(2)
            .map(|i| &record.messages[i])
            .filter(|m| m.role == Role::User)?;
        let history = serde_json::to_string(&record.messages[..n - 2]).ok()?;
        Some(refine_prompt(&history, &request.content, &reply.content))
    }

    /// The record with its trailing assistant reply replaced by `sections`.
    ///
    /// Id, category, sub-category, and source ids carry over unchanged.
    pub fn apply(record: &CanonicalRecord, sections: &Sections) -> CanonicalRecord {
        let mut refined = record.clone();
        match refined.messages.last_mut() {
            Some(last) if last.role == Role::Assistant => {
                *last = Message::assistant(sections.render());
            }
            _ => refined.messages.push(Message::assistant(sections.render())),
        }
        refined.final_answer = sections.answer.clone();
        refined
    }

    /// Refine one record. `Ok(None)` when it has no request and reply to work
    /// from.
    pub fn refine(
        &self,
        record: &CanonicalRecord,
    ) -> Result<Option<(CanonicalRecord, Sections)>, GenerateError> {
        let Some(prompt) = Self::prompt_for(record) else {
            return Ok(None);
        };
        let reply = self.generator.generate(&self.model, &prompt);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let sections = Sections::extract(&reply?);
        Ok(Some((Self::apply(record, &sections), sections)))
    }

    /// Refine every record in order into `sink`. Failures are logged,
    /// counted, and leave no output for that record.
    pub fn run<I, S>(&self, records: I, sink: &mut S) -> RefineSummary
    where
        I: IntoIterator<Item = CanonicalRecord>,
        S: RecordSink + ?Sized,
    {
        let mut summary = RefineSummary::default();
        for record in records {
            let (refined, sections) = match self.refine(&record) {
                Ok(Some(done)) => done,
                Ok(None) => {
                    warn!(id = %record.id, "record does not end with a request and reply, not refined");
                    summary.unsuitable += 1;
                    continue;
                }
                Err(e) => {
                    warn!(id = %record.id, error = %e, "refine request failed, record dropped");
                    summary.failed += 1;
                    continue;
                }
            };
            match sink.write(&refined) {
                Ok(_) => {
                    summary.refined += 1;
                    if sections.is_default() {
                        summary.defaulted += 1;
                    }
                    info!(id = %refined.id, "refined record");
                }
                Err(e) => {
                    error!(id = %refined.id, error = %e, "cannot write refined record");
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}
