//! proactive-annotate: synthesize canonical records with a remote text
//! generator.
//!
//! The scenario path ([`generator`]) fills a prompt template per scenario,
//! sends it through a [`TextGenerator`], and parses the reply with an
//! ordered [`ParserChain`]. The refine path ([`refine`]) rewrites the final
//! assistant turn of existing records into reasoning, caveat, and answer
//! sections. Both fall back to fixed sentinel text when a reply has no
//! usable sections, and both drop a record when the request itself fails.

pub mod client;
pub mod error;
pub mod generator;
pub mod parse;
pub mod prompt;
pub mod refine;
pub mod scenario;
pub mod schema;
pub mod sections;

pub use client::{ClientConfig, GeminiClient, TextGenerator, DEFAULT_ENDPOINT, DEFAULT_MODEL};
pub use error::{AnnotateError, GenerateError, PromptError};
pub use generator::{Annotation, AnnotationGenerator, GeneratorOptions, RunSummary, DEFAULT_DELAY};
pub use parse::{AnnotationPayload, ParseAttempt, ParseOutcome, ParserChain, ReplyParser};
pub use prompt::PromptTemplate;
pub use refine::{RefineSummary, Refiner};
pub use scenario::{load_scenarios, Scenario};
pub use sections::Sections;
