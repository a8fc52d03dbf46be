//! proactive-storage: where canonical records go once built.
//!
//! [`RecordSink`] is the seam; [`DirectorySink`] writes one pretty JSON file
//! per record and supports resuming an interrupted run, [`JsonlSink`] writes
//! one compact line per record. [`load`] reads either layout back.

mod directory;
mod error;
mod jsonl;
mod traits;

pub mod conformance;
pub mod load;

pub use directory::{sanitize_file_name, DirectorySink, MAX_FILE_STEM_CHARS};
pub use error::SinkError;
pub use jsonl::JsonlSink;
pub use load::{load_records, LoadedRecord};
pub use traits::{RecordSink, WriteOutcome};
