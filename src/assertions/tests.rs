use super::*;
use crate::domain::{Check, JsonKind, TestDefinition, TestReport};
use serde_json::{Value, json};

fn view(status: u16, json: Option<Value>) -> ResponseView {
    let body = json.as_ref().map(Value::to_string).unwrap_or_default();
    ResponseView {
        status,
        elapsed_ms: 40,
        json,
        headers: vec![
            ("Content-Type".to_owned(), "application/json".to_owned()),
            ("Set-Cookie".to_owned(), "a=1".to_owned()),
            ("set-cookie".to_owned(), "b=2".to_owned()),
        ],
        body,
    }
}

fn single(check: Check, response: &ResponseView) -> Result<(bool, String), String> {
    let report = evaluate(&[TestDefinition::new(check)], response);
    match report.results.first() {
        Some(result) if report.total == 1 => Ok((result.pass, result.message.clone())),
        _ => Err(format!("Expected exactly one result, got {:?}", report)),
    }
}

fn expect_counts(report: &TestReport, total: usize, passed: usize) -> Result<(), String> {
    if report.total != total || report.passed != passed || report.failed != total.saturating_sub(passed) {
        return Err(format!(
            "Expected {}/{} passed, got {}/{} (failed {})",
            passed, total, report.passed, report.total, report.failed
        ));
    }
    Ok(())
}

#[test]
fn status_equals_passes_and_names_both_codes_on_failure() -> Result<(), String> {
    let check = Check::StatusEquals { expected: 200 };
    let (pass, _) = single(check.clone(), &view(200, None))?;
    if !pass {
        return Err("Expected 200 to pass".to_owned());
    }
    let (pass, message) = single(check, &view(404, None))?;
    if pass || !message.contains("200") || !message.contains("404") {
        return Err(format!("Unexpected failure message: {}", message));
    }
    Ok(())
}

#[test]
fn disabled_tests_are_not_counted() -> Result<(), String> {
    let tests = vec![
        TestDefinition::new(Check::StatusEquals { expected: 200 }),
        TestDefinition::new(Check::StatusEquals { expected: 500 }).disabled(),
        TestDefinition::new(Check::BodyContains {
            expected: "\"id\"".to_owned(),
        }),
    ];
    let report = evaluate(&tests, &view(200, Some(json!({"id": 1}))));
    expect_counts(&report, 2, 2)
}

#[test]
fn json_exists_distinguishes_null_from_missing() -> Result<(), String> {
    let response = view(200, Some(json!({"id": null})));
    let (exists, _) = single(
        Check::JsonExists {
            path: "id".to_owned(),
        },
        &response,
    )?;
    if !exists {
        return Err("Expected null key to exist".to_owned());
    }
    let (not_empty, _) = single(
        Check::JsonNotEmpty {
            path: "id".to_owned(),
        },
        &response,
    )?;
    if not_empty {
        return Err("Expected null value to count as empty".to_owned());
    }
    let (missing, message) = single(
        Check::JsonEquals {
            path: "name".to_owned(),
            expected: Value::Null,
        },
        &response,
    )?;
    if missing || !message.contains("does not exist") {
        return Err(format!("Expected missing path to fail, got {}", message));
    }
    Ok(())
}

#[test]
fn json_not_empty_rejects_empty_containers() -> Result<(), String> {
    let response = view(
        200,
        Some(json!({"s": "", "a": [], "o": {}, "zero": 0, "flag": false, "list": [1]})),
    );
    for (path, expected) in [
        ("s", false),
        ("a", false),
        ("o", false),
        ("zero", true),
        ("flag", true),
        ("list", true),
    ] {
        let (pass, message) = single(
            Check::JsonNotEmpty {
                path: path.to_owned(),
            },
            &response,
        )?;
        if pass != expected {
            return Err(format!("{}: expected {} got {} ({})", path, expected, pass, message));
        }
    }
    Ok(())
}

#[test]
fn json_comparisons_are_numeric_and_string_aware() -> Result<(), String> {
    let response = view(
        200,
        Some(json!({
            "count": 3,
            "price": 1.5,
            "code": "42",
            "tags": ["a", "b"],
            "user": {"name": "ada", "role": "admin"},
            "items": [{"id": 7}]
        })),
    );
    let cases = [
        (Check::JsonEquals { path: "count".to_owned(), expected: json!(3.0) }, true),
        (Check::JsonEquals { path: "price".to_owned(), expected: json!(1.5) }, true),
        (Check::JsonEquals { path: "code".to_owned(), expected: json!(42) }, true),
        (Check::JsonEquals { path: "count".to_owned(), expected: json!(4) }, false),
        (Check::JsonEquals { path: "$.items[0].id".to_owned(), expected: json!(7) }, true),
        (Check::JsonContains { path: "tags".to_owned(), expected: json!("b") }, true),
        (Check::JsonContains { path: "tags".to_owned(), expected: json!("c") }, false),
        (Check::JsonContains { path: "user".to_owned(), expected: json!("role") }, true),
        (Check::JsonContains { path: "user".to_owned(), expected: json!({"name": "ada"}) }, true),
        (Check::JsonContains { path: "user.name".to_owned(), expected: json!("d") }, true),
        (Check::JsonType { path: "tags".to_owned(), expected: JsonKind::Array }, true),
        (Check::JsonType { path: "count".to_owned(), expected: JsonKind::String }, false),
    ];
    for (check, expected) in cases {
        let (pass, message) = single(check.clone(), &response)?;
        if pass != expected {
            return Err(format!("{:?}: expected {} got {} ({})", check, expected, pass, message));
        }
    }
    Ok(())
}

#[test]
fn json_checks_fail_without_json_body() -> Result<(), String> {
    let response = ResponseView {
        status: 200,
        body: "plain text".to_owned(),
        ..ResponseView::default()
    };
    let (pass, message) = single(
        Check::JsonExists {
            path: "$".to_owned(),
        },
        &response,
    )?;
    if pass || !message.contains("not valid JSON") {
        return Err(format!("Unexpected result {} {}", pass, message));
    }
    Ok(())
}

#[test]
fn status_range_forms() -> Result<(), String> {
    let cases = [
        ("200-299", 204, true),
        ("200-299", 301, false),
        ("200, 201 ,204", 201, true),
        ("200,201", 202, false),
        ("418", 418, true),
    ];
    for (expected, status, accepted) in cases {
        let (pass, message) = single(
            Check::StatusRange {
                expected: expected.to_owned(),
            },
            &view(status, None),
        )?;
        if pass != accepted || message.contains("defaulted") {
            return Err(format!("{} vs {}: {} ({})", expected, status, pass, message));
        }
    }
    Ok(())
}

#[test]
fn unparseable_status_range_accepts_only_200() -> Result<(), String> {
    for text in ["abc", "", "299-200", "2xx", "200,abc"] {
        let spec = StatusSpec::parse(text);
        if !spec.fallback || !spec.accepts(200) || spec.accepts(201) {
            return Err(format!("Unexpected fallback for {:?}: {:?}", text, spec));
        }
    }
    let (pass, message) = single(
        Check::StatusRange {
            expected: "2xx".to_owned(),
        },
        &view(204, None),
    )?;
    if pass || !message.contains("defaulted to 200") {
        return Err(format!("Expected flagged fallback failure, got {}", message));
    }
    Ok(())
}

#[test]
fn headers_match_case_insensitively() -> Result<(), String> {
    let response = view(200, None);
    let cases = [
        (
            Check::HeaderExists {
                header: "content-type".to_owned(),
            },
            true,
        ),
        (
            Check::HeaderEquals {
                header: "CONTENT-TYPE".to_owned(),
                expected: "application/json".to_owned(),
            },
            true,
        ),
        (
            Check::HeaderEquals {
                header: "set-cookie".to_owned(),
                expected: "a=1, b=2".to_owned(),
            },
            true,
        ),
        (
            Check::HeaderContains {
                header: "Content-Type".to_owned(),
                expected: "json".to_owned(),
            },
            true,
        ),
        (
            Check::HeaderExists {
                header: "x-missing".to_owned(),
            },
            false,
        ),
    ];
    for (check, expected) in cases {
        let (pass, message) = single(check.clone(), &response)?;
        if pass != expected {
            return Err(format!("{:?}: expected {} got {} ({})", check, expected, pass, message));
        }
    }
    Ok(())
}

#[test]
fn unknown_kind_fails_without_aborting_the_rest() -> Result<(), String> {
    let tests = vec![
        TestDefinition::new(Check::Unknown {
            kind: "xml_matches".to_owned(),
        }),
        TestDefinition::new(Check::StatusOneOf {
            expected: vec![200, 201],
        }),
    ];
    let report = evaluate(&tests, &view(201, None));
    expect_counts(&report, 2, 1)?;
    match report.results.first() {
        Some(result) if result.message == "unknown test type: xml_matches" => Ok(()),
        other => Err(format!("Unexpected first result {:?}", other)),
    }
}

#[test]
fn required_fields_and_response_time() -> Result<(), String> {
    let response = view(200, Some(json!({"id": 1, "meta": {"page": 2}})));
    let (pass, _) = single(
        Check::RequiredFields {
            fields: vec!["id".to_owned(), "meta.page".to_owned()],
        },
        &response,
    )?;
    if !pass {
        return Err("Expected required fields to pass".to_owned());
    }
    let (pass, message) = single(
        Check::RequiredFields {
            fields: vec!["id".to_owned(), "name".to_owned(), "meta.size".to_owned()],
        },
        &response,
    )?;
    if pass || !message.contains("name, meta.size") {
        return Err(format!("Unexpected message {}", message));
    }
    let (fast, _) = single(Check::ResponseTimeBelow { max_ms: 100 }, &response)?;
    let (slow, _) = single(Check::ResponseTimeBelow { max_ms: 40 }, &response)?;
    if !fast || slow {
        return Err(format!("Unexpected timing results {} {}", fast, slow));
    }
    Ok(())
}

#[test]
fn named_definitions_keep_their_name() -> Result<(), String> {
    let mut test = TestDefinition::new(Check::StatusEquals { expected: 200 });
    test.name = Some("is ok".to_owned());
    let report = evaluate(&[test], &view(200, None));
    match report.results.first() {
        Some(result) if result.name == "is ok" => Ok(()),
        other => Err(format!("Unexpected result {:?}", other)),
    }
}

#[test]
fn json_path_syntax() -> Result<(), String> {
    let root = json!({
        "data": {"items": [{"id": 1}, {"id": 2}], "1": "key"},
        "a.b": "flat"
    });
    let cases = [
        ("data.items[1].id", Some(json!(2))),
        ("$.data.items.0.id", Some(json!(1))),
        ("$data.items[0]", Some(json!({"id": 1}))),
        ("data[1]", Some(json!("key"))),
        ("data.items[5]", None),
        ("data..items", None),
        ("data.items[x]", None),
        ("data.items.0.id.deeper", None),
    ];
    for (path, expected) in cases {
        let found = lookup_path(&root, path).cloned();
        if found != expected {
            return Err(format!("{}: expected {:?} got {:?}", path, expected, found));
        }
    }
    if lookup_path(&root, "$") != Some(&root) {
        return Err("Expected $ to return the root".to_owned());
    }
    Ok(())
}

#[test]
fn loose_equality_rules() -> Result<(), String> {
    let cases = [
        (json!(1), json!(1.0), true),
        (json!("true"), json!(true), true),
        (json!({"a": [1, 2]}), json!({"a": [1.0, 2]}), true),
        (json!({"a": 1}), json!({"a": 1, "b": 2}), false),
        (json!(null), json!("null"), true),
        (json!(false), json!(0), false),
    ];
    for (left, right, expected) in cases {
        if json_loose_eq(&left, &right) != expected {
            return Err(format!("{} vs {} expected {}", left, right, expected));
        }
    }
    if json_deep_eq(&json!("1"), &json!(1)) {
        return Err("Deep equality must not coerce strings".to_owned());
    }
    Ok(())
}
