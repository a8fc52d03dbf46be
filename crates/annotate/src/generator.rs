//! Scenario annotation: one generation request per scenario, resumable.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use proactive_record::{CanonicalRecord, Message, ProactiveCategory, Role};
use proactive_storage::{RecordSink, WriteOutcome};

use crate::client::{TextGenerator, DEFAULT_MODEL};
use crate::error::{AnnotateError, PromptError};
use crate::parse::{AnnotationPayload, ParserChain};
use crate::prompt::PromptTemplate;
use crate::scenario::Scenario;
use crate::schema::ANNOTATION_SCHEMA;
use crate::sections::Sections;

/// Default pause after each service call.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub model: String,
    /// Fixed pause after every service call, successful or not.
    pub delay: Duration,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            model: DEFAULT_MODEL.to_string(),
            delay: DEFAULT_DELAY,
        }
    }
}

/// Counts from one [`AnnotationGenerator::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub written: usize,
    /// Scenarios whose output already existed; no request was made.
    pub skipped: usize,
    /// Scenarios with no record this run (request, prompt, or sink failure).
    pub failed: usize,
    /// Written records where at least one section is a sentinel.
    pub defaulted: usize,
}

/// A record built from one reply.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub record: CanonicalRecord,
    pub sections: Sections,
    /// Parser strategy that read the reply, if any did.
    pub strategy: Option<&'static str>,
}

/// Turns scenarios into canonical records through a [`TextGenerator`].
pub struct AnnotationGenerator<G> {
    generator: G,
    template: PromptTemplate,
    chain: ParserChain,
    options: GeneratorOptions,
}

impl<G: TextGenerator> AnnotationGenerator<G> {
    pub fn new(
        generator: G,
        template: PromptTemplate,
        options: GeneratorOptions,
    ) -> Result<Self, String> {
        Ok(AnnotationGenerator {
            generator,
            template,
            chain: ParserChain::standard()?,
            options,
        })
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// The filled prompt for `scenario`.
    pub fn prompt_for(&self, scenario: &Scenario) -> Result<String, PromptError> {
        self.template
            .render(&scenario.prompt_values(ANNOTATION_SCHEMA.trim()))
    }

    /// Build the record for `scenario` from a reply already received.
    pub fn annotation_from_reply(&self, scenario: &Scenario, reply: &str) -> Annotation {
        let outcome = self.chain.parse(reply);
        for (strategy, reason) in &outcome.rejections {
            debug!(strategy, reason = %reason, "parser rejected reply");
        }
        let payload = outcome.payload.unwrap_or_default();
        let sections = Sections::extract(payload.last_assistant().unwrap_or(reply));
        let record = scenario_record(scenario, payload, &sections);
        Annotation {
            record,
            sections,
            strategy: outcome.strategy,
        }
    }

    /// Request and build the record for one scenario. No retry.
    pub fn annotate(&self, scenario: &Scenario) -> Result<Annotation, AnnotateError> {
        let prompt = self.prompt_for(scenario)?;
        let reply = self.generator.generate(&self.options.model, &prompt);
        self.pause();
        Ok(self.annotation_from_reply(scenario, &reply?))
    }

    fn pause(&self) {
        if !self.options.delay.is_zero() {
            std::thread::sleep(self.options.delay);
        }
    }

    /// Annotate every scenario in order, writing each record to `sink`.
    ///
    /// A scenario whose key the sink already holds is skipped without a
    /// request. Failures are logged and counted; they never stop the run.
    pub fn run<S: RecordSink + ?Sized>(&self, scenarios: &[Scenario], sink: &mut S) -> RunSummary {
        let mut summary = RunSummary::default();
        for scenario in scenarios {
            let key = scenario.scenario_key();
            if sink.contains(&key) {
                info!(scene = %key, "output exists, skipping");
                summary.skipped += 1;
                continue;
            }

            info!(scene = %key, category = %scenario.category, "annotating scenario");
            let annotation = match self.annotate(scenario) {
                Ok(a) => a,
                Err(e) => {
                    warn!(scene = %key, error = %e, "annotation failed, no record written");
                    summary.failed += 1;
                    continue;
                }
            };

            if let Err(errors) = annotation.record.check() {
                for e in &errors {
                    error!(scene = %key, error = %e, "annotated record failed checks");
                }
                summary.failed += 1;
                continue;
            }

            match sink.write(&annotation.record) {
                Ok(WriteOutcome::Written(path)) => {
                    summary.written += 1;
                    if annotation.sections.is_default() {
                        summary.defaulted += 1;
                        warn!(scene = %key, "reply had missing sections, wrote sentinel text");
                    }
                    info!(
                        scene = %key,
                        path = %path.display(),
                        strategy = annotation.strategy.unwrap_or("none"),
                        "wrote record"
                    );
                }
                Ok(WriteOutcome::SkippedExisting(_)) => summary.skipped += 1,
                Err(e) => {
                    error!(scene = %key, error = %e, "cannot write record");
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

/// Assemble the record for `scenario` from a parsed payload (possibly
/// empty) and the extracted sections.
pub fn scenario_record(
    scenario: &Scenario,
    payload: AnnotationPayload,
    sections: &Sections,
) -> CanonicalRecord {
    let key = scenario.scenario_key();
    let sectioned = Message::assistant(sections.render());

    let mut messages = payload.messages;
    if messages.iter().any(|m| m.role == Role::User) {
        match messages.last_mut() {
            Some(last) if last.role == Role::Assistant => *last = sectioned,
            _ => messages.push(sectioned),
        }
    } else {
        messages = vec![Message::user(scenario.opening_query()), sectioned];
    }

    let category = ProactiveCategory::from(scenario.category.as_str());
    let uncertainty_type = payload
        .uncertainty_type
        .filter(|_| category.is_help_seeking());

    CanonicalRecord {
        id: key.clone(),
        messages,
        proactive_category: category,
        sub_category: payload.sub_category,
        uncertainty_type,
        requires_tool: payload.requires_tool,
        thinking_process: payload.thinking_process,
        final_answer: sections.answer.clone(),
        source_dataset_id: None,
        source_scene_id: Some(key),
        provenance: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proactive_record::UncertaintyType;
    use serde_json::json;

    fn scenario(category: &str) -> Scenario {
        serde_json::from_value(json!({
            "id": "s1",
            "category": category,
            "description": "The user asks for a restaurant without a city.",
            "initial_user_query": "Find me a good restaurant."
        }))
        .unwrap()
    }

    #[test]
    fn test_record_replaces_trailing_assistant() {
        let payload: AnnotationPayload = serde_json::from_value(json!({
            "messages": [
                {"role": "user", "content": "Find me a good restaurant."},
                {"role": "assistant", "content": "old"}
            ],
            "sub_category": "detail_request",
            "uncertainty_type": "epistemic"
        }))
        .unwrap();
        let sections = Sections::extract("<think>r</think><perplexity>c</perplexity>final_answer: a");
        let r = scenario_record(&scenario("clarification"), payload, &sections);
        assert_eq!(r.messages.len(), 2);
        assert_eq!(
            r.messages[1].content,
            "<think>r</think>\n<perplexity>c</perplexity>\nfinal_answer: a"
        );
        assert_eq!(r.final_answer, "a");
        assert_eq!(r.uncertainty_type, Some(UncertaintyType::Epistemic));
        assert_eq!(r.source_scene_id.as_deref(), Some("s1"));
        assert!(r.check().is_ok());
    }

    #[test]
    fn test_record_without_payload_uses_opening_query() {
        let r = scenario_record(
            &scenario("direct_answer"),
            AnnotationPayload {
                uncertainty_type: Some(UncertaintyType::Aleatoric),
                ..Default::default()
            },
            &Sections::defaults(),
        );
        assert_eq!(r.messages[0], Message::user("Find me a good restaurant."));
        assert_eq!(r.messages[1].role, Role::Assistant);
        // Uncertainty is only kept for help-seeking categories.
        assert!(r.uncertainty_type.is_none());
        assert!(r.check().is_ok());
    }

    #[test]
    fn test_record_appends_when_payload_ends_with_user() {
        let payload: AnnotationPayload = serde_json::from_value(json!({
            "messages": [{"role": "user", "content": "q"}]
        }))
        .unwrap();
        let r = scenario_record(&scenario("help_seeking"), payload, &Sections::defaults());
        assert_eq!(r.messages.len(), 2);
        assert_eq!(r.messages[0].content, "q");
    }
}
