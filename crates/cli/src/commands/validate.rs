use std::path::PathBuf;
use std::process;

use serde::Serialize;

use proactive_annotate::schema::{compile, violations, CANONICAL_RECORD_SCHEMA};
use proactive_storage::{load_records, LoadedRecord};

use crate::{report_error, OutputFormat};

#[derive(Debug, Serialize)]
struct Problem {
    origin: String,
    message: String,
}

/// Every schema violation and invariant failure for one loaded record.
fn problems_for(validator: &jsonschema::Validator, entry: &LoadedRecord) -> Vec<Problem> {
    let problem = |message: String| Problem {
        origin: entry.origin.clone(),
        message,
    };
    let value = match &entry.value {
        Ok(v) => v,
        Err(e) => return vec![problem(format!("invalid JSON: {}", e))],
    };

    let schema_errors = violations(validator, value);
    if !schema_errors.is_empty() {
        return schema_errors.into_iter().map(problem).collect();
    }

    match entry.parse() {
        Ok(record) => match record.check() {
            Ok(()) => Vec::new(),
            Err(errors) => errors.iter().map(|e| problem(e.to_string())).collect(),
        },
        Err(e) => vec![problem(e)],
    }
}

fn validate_paths(paths: &[PathBuf]) -> Result<(usize, Vec<Problem>), String> {
    let validator = compile(CANONICAL_RECORD_SCHEMA)?;
    let mut total = 0;
    let mut problems = Vec::new();
    for path in paths {
        let loaded = load_records(path).map_err(|e| e.to_string())?;
        total += loaded.len();
        for entry in &loaded {
            problems.extend(problems_for(&validator, entry));
        }
    }
    Ok((total, problems))
}

pub(crate) fn cmd_validate(paths: &[PathBuf], output: OutputFormat, quiet: bool) {
    let (total, problems) = match validate_paths(paths) {
        Ok(r) => r,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    if problems.is_empty() {
        if !quiet {
            match output {
                OutputFormat::Text => println!("valid: {} records", total),
                OutputFormat::Json => {
                    println!("{{\"valid\": true, \"records\": {}}}", total);
                }
            }
        }
        return;
    }

    match output {
        OutputFormat::Text => {
            if !quiet {
                eprintln!("invalid records in {}", describe(paths));
                for p in &problems {
                    eprintln!("  - {}: {}", p.origin, p.message);
                }
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "valid": false,
                "records": total,
                "errors": problems,
            });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            );
        }
    }
    process::exit(1);
}

fn describe(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(value: serde_json::Value) -> LoadedRecord {
        LoadedRecord {
            origin: "r.json".to_string(),
            value: Ok(value),
        }
    }

    fn validator() -> jsonschema::Validator {
        compile(CANONICAL_RECORD_SCHEMA).unwrap()
    }

    #[test]
    fn test_valid_record_has_no_problems() {
        let e = entry(json!({
            "id": "converted_item_00000",
            "messages": [
                {"role": "user", "content": "Who waved?"},
                {"role": "assistant", "content": "Tom"}
            ],
            "proactive_category": "direct_answer",
            "final_answer": "Tom"
        }));
        assert!(problems_for(&validator(), &e).is_empty());
    }

    #[test]
    fn test_trailing_user_message_is_invalid() {
        let e = entry(json!({
            "id": "x",
            "messages": [{"role": "user", "content": "hello?"}],
            "proactive_category": "direct_answer"
        }));
        let problems = problems_for(&validator(), &e);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].message.contains("assistant"));
    }

    #[test]
    fn test_schema_violation_reported() {
        let e = entry(json!({"id": "x", "messages": []}));
        assert!(!problems_for(&validator(), &e).is_empty());
    }

    #[test]
    fn test_unparsable_line_reported() {
        let e = LoadedRecord {
            origin: "out.jsonl:3".to_string(),
            value: Err("EOF while parsing".to_string()),
        };
        let problems = problems_for(&validator(), &e);
        assert_eq!(problems[0].origin, "out.jsonl:3");
        assert!(problems[0].message.starts_with("invalid JSON"));
    }
}
