//! Embedded JSON schemas.

use serde_json::Value;

/// Schema the annotation reply must satisfy for strict parsing.
pub const ANNOTATION_SCHEMA: &str = include_str!("../../../docs/annotation-schema.json");

/// Schema every emitted canonical record satisfies.
pub const CANONICAL_RECORD_SCHEMA: &str =
    include_str!("../../../docs/canonical-record-schema.json");

/// Compile one of the embedded schemas.
pub fn compile(schema_text: &str) -> Result<jsonschema::Validator, String> {
    let schema: Value = serde_json::from_str(schema_text)
        .map_err(|e| format!("internal error: failed to parse embedded schema: {}", e))?;
    jsonschema::validator_for(&schema)
        .map_err(|e| format!("internal error: failed to compile schema: {}", e))
}

/// Every schema violation in `instance`, formatted.
pub fn violations(validator: &jsonschema::Validator, instance: &Value) -> Vec<String> {
    validator
        .iter_errors(instance)
        .map(|e| format!("{}", e))
        .collect()
}
