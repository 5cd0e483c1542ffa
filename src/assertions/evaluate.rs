use serde_json::Value;

use super::json_path::lookup_path;
use super::response::ResponseView;
use super::status::StatusSpec;
use crate::domain::{Check, TestDefinition, TestReport, TestResult};

/// Evaluates every enabled definition against the response. Disabled
/// definitions are skipped entirely and do not count towards `total`.
#[must_use]
pub fn evaluate(tests: &[TestDefinition], response: &ResponseView) -> TestReport {
    let mut report = TestReport::default();
    for test in tests.iter().filter(|test| test.enabled) {
        let (pass, message) = run_check(&test.check, response);
        let name = test
            .name
            .clone()
            .unwrap_or_else(|| test.check.describe());
        report.push(TestResult::structured(name, pass, message));
    }
    report
}

fn run_check(check: &Check, response: &ResponseView) -> (bool, String) {
    match check {
        Check::StatusEquals { expected } => {
            if response.status == *expected {
                (true, format!("Status is {}", expected))
            } else {
                (
                    false,
                    format!("Expected status {} but got {}", expected, response.status),
                )
            }
        }
        Check::StatusRange { expected } => {
            let spec = StatusSpec::parse(expected);
            let note = if spec.fallback {
                format!(" (could not parse '{}'; defaulted to 200)", expected)
            } else {
                String::new()
            };
            if spec.accepts(response.status) {
                (
                    true,
                    format!("Status {} is in {}{}", response.status, spec.describe(), note),
                )
            } else {
                (
                    false,
                    format!(
                        "Expected status in {} but got {}{}",
                        spec.describe(),
                        response.status,
                        note
                    ),
                )
            }
        }
        Check::StatusOneOf { expected } => {
            let listed = expected
                .iter()
                .map(u16::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            if expected.contains(&response.status) {
                (true, format!("Status {} is one of {}", response.status, listed))
            } else {
                (
                    false,
                    format!("Expected status one of {} but got {}", listed, response.status),
                )
            }
        }
        Check::HeaderExists { header } => match response.header(header) {
            Some(_) => (true, format!("Header {} is present", header)),
            None => (false, format!("Header {} is missing", header)),
        },
        Check::HeaderEquals { header, expected } => match response.header(header) {
            Some(actual) if actual == *expected => {
                (true, format!("Header {} equals '{}'", header, expected))
            }
            Some(actual) => (
                false,
                format!(
                    "Expected header {} to be '{}' but got '{}'",
                    header, expected, actual
                ),
            ),
            None => (false, format!("Header {} is missing", header)),
        },
        Check::HeaderContains { header, expected } => match response.header(header) {
            Some(actual) if actual.contains(expected.as_str()) => {
                (true, format!("Header {} contains '{}'", header, expected))
            }
            Some(actual) => (
                false,
                format!(
                    "Expected header {} to contain '{}' but got '{}'",
                    header, expected, actual
                ),
            ),
            None => (false, format!("Header {} is missing", header)),
        },
        Check::JsonExists { path } => with_path(response, path, |_| {
            (true, format!("Path '{}' exists", path))
        }),
        Check::JsonEquals { path, expected } => with_path(response, path, |actual| {
            if json_loose_eq(actual, expected) {
                (true, format!("Path '{}' equals {}", path, expected))
            } else {
                (
                    false,
                    format!("Expected '{}' to equal {} but got {}", path, expected, actual),
                )
            }
        }),
        Check::JsonContains { path, expected } => with_path(response, path, |actual| {
            if json_contains(actual, expected) {
                (true, format!("Path '{}' contains {}", path, expected))
            } else {
                (
                    false,
                    format!("Expected '{}' to contain {} but got {}", path, expected, actual),
                )
            }
        }),
        Check::JsonType { path, expected } => with_path(response, path, |actual| {
            let kind = crate::domain::JsonKind::of(actual);
            if kind == *expected {
                (true, format!("Path '{}' is {}", path, expected))
            } else {
                (
                    false,
                    format!("Expected '{}' to be {} but got {}", path, expected, kind),
                )
            }
        }),
        Check::JsonNotEmpty { path } => with_path(response, path, |actual| {
            if is_empty_json(actual) {
                (false, format!("Expected '{}' to be non-empty but got {}", path, actual))
            } else {
                (true, format!("Path '{}' is not empty", path))
            }
        }),
        Check::RequiredFields { fields } => {
            let Some(json) = response.json.as_ref() else {
                return (false, "Response body is not valid JSON".to_owned());
            };
            let missing: Vec<&str> = fields
                .iter()
                .filter(|field| lookup_path(json, field).is_none())
                .map(String::as_str)
                .collect();
            if missing.is_empty() {
                (true, format!("All {} required field(s) present", fields.len()))
            } else {
                (false, format!("Missing required field(s): {}", missing.join(", ")))
            }
        }
        Check::ResponseTimeBelow { max_ms } => {
            if response.elapsed_ms < *max_ms {
                (
                    true,
                    format!("Response time {}ms is below {}ms", response.elapsed_ms, max_ms),
                )
            } else {
                (
                    false,
                    format!(
                        "Expected response time below {}ms but took {}ms",
                        max_ms, response.elapsed_ms
                    ),
                )
            }
        }
        Check::BodyContains { expected } => {
            if response.body.contains(expected.as_str()) {
                (true, format!("Body contains '{}'", expected))
            } else {
                (false, format!("Expected body to contain '{}'", expected))
            }
        }
        Check::Unknown { kind } => (false, format!("unknown test type: {}", kind)),
    }
}

fn with_path<F>(response: &ResponseView, path: &str, check: F) -> (bool, String)
where
    F: FnOnce(&Value) -> (bool, String),
{
    let Some(json) = response.json.as_ref() else {
        return (false, "Response body is not valid JSON".to_owned());
    };
    match lookup_path(json, path) {
        Some(value) => check(value),
        None => (false, format!("Path '{}' does not exist", path)),
    }
}

fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Deep equality where numbers compare by value (`1` equals `1.0`).
#[must_use]
pub fn json_deep_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => a
                .as_f64()
                .zip(b.as_f64())
                .is_some_and(|(x, y)| (x - y).abs() <= f64::EPSILON),
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| json_deep_eq(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| json_deep_eq(x, y)))
        }
        _ => left == right,
    }
}

/// Deep equality, falling back to comparing display text when either side is
/// a string (`"42"` equals `42`).
#[must_use]
pub fn json_loose_eq(actual: &Value, expected: &Value) -> bool {
    if json_deep_eq(actual, expected) {
        return true;
    }
    match (actual, expected) {
        (Value::String(_), _) | (_, Value::String(_)) => {
            display_text(actual) == display_text(expected)
        }
        _ => false,
    }
}

fn json_contains(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::String(text) => text.contains(display_text(expected).as_str()),
        Value::Array(items) => items.iter().any(|item| json_loose_eq(item, expected)),
        Value::Object(fields) => match expected {
            Value::String(key) => fields.contains_key(key),
            Value::Object(subset) => subset.iter().all(|(key, value)| {
                fields
                    .get(key)
                    .is_some_and(|actual_value| json_loose_eq(actual_value, value))
            }),
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::Array(_) => false,
        },
        Value::Null | Value::Bool(_) | Value::Number(_) => {
            display_text(actual).contains(display_text(expected).as_str())
        }
    }
}

pub(crate) fn display_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            value.to_string()
        }
    }
}
