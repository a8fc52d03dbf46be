//! proactive-core: turns heterogeneous source corpora into canonical records.
//!
//! - [`readers`] parse each corpus's native container (a JSON document
//!   wrapping an array, or JSONL) into positioned [`readers::SourceItem`]s.
//! - [`api_table`] holds the read-only API-name-to-description lookup.
//! - [`builder`] drives one [`builder::SourceAdapter`] per corpus through a
//!   single assembly path that picks the assistant behavior.

pub mod api_table;
pub mod builder;
pub mod error;
pub mod readers;

pub use api_table::ApiDescriptionTable;
pub use builder::{
    convert_all, convert_into, BehaviorDecision, CanonicalRecordBuilder, ConversionReport,
    CoqaAdapter, id_to_string, SourceAdapter, StoryLayout, ToolCallAdapter, VagueTaskAdapter,
};
pub use error::{BuildError, ItemError, ReadError, SourceKind};
pub use readers::{read_json_array, JsonlReader, SourceItem};
