//! Validation of raw entity payloads into [`SystemReport`]s.
//!
//! Reporting agents send a loosely typed JSON document. Every field the view
//! needs is required; validation collects every problem it finds so the
//! resulting error names all of them at once.

use fleetwatch_types::{StorageUsage, SystemReport};
use serde_json::{Map, Value};

use crate::error::{Error, FieldProblem, Result};

const NUMBER: &str = "a non-negative number";
const STRING: &str = "a string";

/// Validate a raw payload for `entity`.
///
/// A JSON string holding encoded JSON is decoded first, which is how most
/// agents store their reports.
pub fn parse_report(entity: &str, raw: &Value) -> Result<SystemReport> {
    let decoded;
    let value = match raw {
        Value::String(text) => {
            decoded = serde_json::from_str::<Value>(text).map_err(|e| Error::Payload {
                entity: entity.to_string(),
                problems: vec![FieldProblem::invalid("payload", json_expectation(&e))],
            })?;
            &decoded
        }
        other => other,
    };

    let Some(object) = value.as_object() else {
        return Err(Error::Payload {
            entity: entity.to_string(),
            problems: vec![FieldProblem::invalid("payload", "a JSON object")],
        });
    };

    let mut problems = Vec::new();

    let name = string_field(object, "name", "name", &mut problems);
    let cpu = number_field(object, "cpu", "cpu", &mut problems);
    let memory_used = number_field(object, "memory_used", "memory_used", &mut problems);
    let memory_total = number_field(object, "memory_total", "memory_total", &mut problems);
    let storage = storage_field(object, &mut problems);

    if !problems.is_empty() {
        return Err(Error::Payload {
            entity: entity.to_string(),
            problems,
        });
    }

    Ok(SystemReport {
        name: name.unwrap_or_default(),
        cpu: cpu.map(|c| c.min(u32::MAX as f64) as u32).unwrap_or_default(),
        memory_used: memory_used.map(|m| m as u64).unwrap_or_default(),
        memory_total: memory_total.map(|m| m as u64).unwrap_or_default(),
        storage,
    })
}

fn json_expectation(err: &serde_json::Error) -> &'static str {
    if err.is_eof() {
        "complete JSON"
    } else {
        "valid JSON"
    }
}

fn string_field(
    object: &Map<String, Value>,
    key: &str,
    path: &str,
    problems: &mut Vec<FieldProblem>,
) -> Option<String> {
    match object.get(key) {
        None | Some(Value::Null) => {
            problems.push(FieldProblem::missing(path));
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            problems.push(FieldProblem::invalid(path, STRING));
            None
        }
    }
}

fn number_field(
    object: &Map<String, Value>,
    key: &str,
    path: &str,
    problems: &mut Vec<FieldProblem>,
) -> Option<f64> {
    match object.get(key) {
        None | Some(Value::Null) => {
            problems.push(FieldProblem::missing(path));
            None
        }
        Some(value) => match value.as_f64() {
            Some(n) if n >= 0.0 && n.is_finite() => Some(n),
            _ => {
                problems.push(FieldProblem::invalid(path, NUMBER));
                None
            }
        },
    }
}

fn storage_field(
    object: &Map<String, Value>,
    problems: &mut Vec<FieldProblem>,
) -> Vec<StorageUsage> {
    let entries = match object.get("storage") {
        None | Some(Value::Null) => {
            problems.push(FieldProblem::missing("storage"));
            return Vec::new();
        }
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            problems.push(FieldProblem::invalid("storage", "an array"));
            return Vec::new();
        }
    };

    let mut storage = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let Some(disk) = entry.as_object() else {
            problems.push(FieldProblem::invalid(format!("storage[{}]", i), "an object"));
            continue;
        };
        let directory = string_field(
            disk,
            "directory",
            &format!("storage[{}].directory", i),
            problems,
        );
        let total = number_field(disk, "total", &format!("storage[{}].total", i), problems);
        let used = number_field(disk, "used", &format!("storage[{}].used", i), problems);

        if let (Some(directory), Some(total), Some(used)) = (directory, total, used) {
            storage.push(StorageUsage {
                directory,
                total: total as u64,
                used: used as u64,
            });
        }
    }
    storage
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProblemKind;
    use serde_json::json;

    fn problems(err: Error) -> Vec<FieldProblem> {
        match err {
            Error::Payload { problems, .. } => problems,
            other => panic!("expected payload error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_complete_payload() {
        let raw = json!({
            "name": "web-1",
            "cpu": 42,
            "memory_used": 1024,
            "memory_total": 4096,
            "storage": [{"directory": "/", "total": 100000, "used": 25000}]
        });

        let report = parse_report("web-1", &raw).unwrap();
        assert_eq!(report.name, "web-1");
        assert_eq!(report.cpu, 42);
        assert_eq!(report.memory_used, 1024);
        assert_eq!(report.memory_total, 4096);
        assert_eq!(report.storage, vec![StorageUsage::new("/", 100000, 25000)]);
    }

    #[test]
    fn test_parse_encoded_string_payload() {
        let raw = Value::String(
            r#"{"name":"db","cpu":7.9,"memory_used":1,"memory_total":2,"storage":[]}"#
                .to_string(),
        );

        let report = parse_report("db", &raw).unwrap();
        assert_eq!(report.name, "db");
        // fractional CPU is truncated
        assert_eq!(report.cpu, 7);
        assert!(report.storage.is_empty());
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let raw = json!({ "name": "web-1", "cpu": 5 });

        let fields: Vec<String> = problems(parse_report("web-1", &raw).unwrap_err())
            .into_iter()
            .map(|p| p.field)
            .collect();
        assert_eq!(fields, vec!["memory_used", "memory_total", "storage"]);
    }

    #[test]
    fn test_invalid_field_types() {
        let raw = json!({
            "name": 12,
            "cpu": -1,
            "memory_used": "lots",
            "memory_total": 100,
            "storage": [{"directory": "/", "total": 10}, 3]
        });

        let problems = problems(parse_report("x", &raw).unwrap_err());
        assert_eq!(problems[0], FieldProblem::invalid("name", STRING));
        assert_eq!(problems[1], FieldProblem::invalid("cpu", NUMBER));
        assert_eq!(problems[2], FieldProblem::invalid("memory_used", NUMBER));
        assert_eq!(problems[3], FieldProblem::missing("storage[0].used"));
        assert_eq!(problems[4].field, "storage[1]");
        assert_eq!(problems.len(), 5);
    }

    #[test]
    fn test_malformed_json_text() {
        let raw = Value::String("{\"name\": \"web".to_string());

        let problems = problems(parse_report("web-1", &raw).unwrap_err());
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].field, "payload");
        assert_eq!(problems[0].kind, ProblemKind::Invalid("complete JSON"));
    }

    #[test]
    fn test_non_object_payload() {
        let problems = problems(parse_report("a", &json!([1, 2])).unwrap_err());
        assert_eq!(problems, vec![FieldProblem::invalid("payload", "a JSON object")]);
    }

    #[test]
    fn test_null_counts_as_missing() {
        let raw = json!({
            "name": null,
            "cpu": 1,
            "memory_used": 1,
            "memory_total": 1,
            "storage": []
        });
        let problems = problems(parse_report("a", &raw).unwrap_err());
        assert_eq!(problems, vec![FieldProblem::missing("name")]);
    }
}
