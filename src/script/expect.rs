use rhai::{Array, Dynamic, Engine, EvalAltResult, INT, Map};
use serde_json::Value;

use crate::assertions::{json_deep_eq, json_loose_eq};

type ExpectResult = Result<Expectation, Box<EvalAltResult>>;
type AssertResult = Result<(), Box<EvalAltResult>>;

/// Words that only make an expectation read well.
const LINKS: [&str; 13] = [
    "to", "be", "been", "that", "which", "and", "has", "have", "at", "of", "same", "deep", "does",
];

/// Chai-style expectation built by `pm.expect(value)`.
#[derive(Debug, Clone)]
pub(super) struct Expectation {
    actual: Dynamic,
    negate: bool,
}

impl Expectation {
    pub fn new(actual: Dynamic) -> Self {
        Self {
            actual,
            negate: false,
        }
    }

    fn check(&self, pass: bool, claim: &str) -> ExpectResult {
        if pass != self.negate {
            return Ok(self.clone());
        }
        Err(format!(
            "expected {} to {}{}",
            describe(&self.actual),
            if self.negate { "not " } else { "" },
            claim
        )
        .into())
    }

    fn compare(&self, bound: &Dynamic, claim: &str, test: fn(f64, f64) -> bool) -> ExpectResult {
        let (Some(actual), Some(limit)) = (as_number(&self.actual), as_number(bound)) else {
            return Err(format!(
                "expected {} and {} to be numbers",
                describe(&self.actual),
                describe(bound)
            )
            .into());
        };
        self.check(test(actual, limit), &format!("{} {}", claim, describe(bound)))
    }
}

/// `pm.assert`.
#[derive(Debug, Clone, Copy)]
pub(super) struct Assert;

pub(super) fn register(engine: &mut Engine) {
    engine.register_type_with_name::<Expectation>("Expectation");
    engine.register_type_with_name::<Assert>("Assert");

    for link in LINKS {
        engine.register_get(link, |exp: &mut Expectation| exp.clone());
    }
    engine.register_get("not", |exp: &mut Expectation| Expectation {
        actual: exp.actual.clone(),
        negate: !exp.negate,
    });

    for name in ["equal", "eq", "equals"] {
        engine.register_fn(name, |exp: &mut Expectation, expected: Dynamic| {
            let pass = json_deep_eq(&to_json(&exp.actual), &to_json(&expected));
            exp.check(pass, &format!("equal {}", describe(&expected)))
        });
    }
    engine.register_fn("eql", |exp: &mut Expectation, expected: Dynamic| {
        let pass = json_deep_eq(&to_json(&exp.actual), &to_json(&expected));
        exp.check(pass, &format!("deeply equal {}", describe(&expected)))
    });
    for name in ["above", "gt"] {
        engine.register_fn(name, |exp: &mut Expectation, bound: Dynamic| {
            exp.compare(&bound, "be above", |actual, limit| actual > limit)
        });
    }
    for name in ["below", "lt"] {
        engine.register_fn(name, |exp: &mut Expectation, bound: Dynamic| {
            exp.compare(&bound, "be below", |actual, limit| actual < limit)
        });
    }
    for name in ["least", "gte"] {
        engine.register_fn(name, |exp: &mut Expectation, bound: Dynamic| {
            exp.compare(&bound, "be at least", |actual, limit| actual >= limit)
        });
    }
    for name in ["most", "lte"] {
        engine.register_fn(name, |exp: &mut Expectation, bound: Dynamic| {
            exp.compare(&bound, "be at most", |actual, limit| actual <= limit)
        });
    }
    for name in ["include", "contain", "includes", "contains"] {
        engine.register_fn(name, |exp: &mut Expectation, needle: Dynamic| {
            let pass = includes(&exp.actual, &needle);
            exp.check(pass, &format!("include {}", describe(&needle)))
        });
    }
    engine.register_fn("property", |exp: &mut Expectation, name: &str| -> ExpectResult {
        let found = property(&exp.actual, name);
        let checked = exp.check(found.is_some(), &format!("have property '{}'", name))?;
        Ok(match found {
            Some(value) if !exp.negate => Expectation::new(value),
            _ => checked,
        })
    });
    engine.register_fn(
        "property",
        |exp: &mut Expectation, name: &str, expected: Dynamic| {
            let found = property(&exp.actual, name);
            let pass = found
                .as_ref()
                .is_some_and(|value| json_deep_eq(&to_json(value), &to_json(&expected)));
            exp.check(
                pass,
                &format!("have property '{}' of {}", name, describe(&expected)),
            )
        },
    );
    engine.register_fn("lengthOf", |exp: &mut Expectation, expected: INT| {
        let length = length_of(&exp.actual);
        let pass = length.is_some_and(|length| i64::try_from(length).ok() == Some(expected));
        exp.check(pass, &format!("have a length of {}", expected))
    });
    for name in ["a", "an"] {
        engine.register_fn(name, |exp: &mut Expectation, kind: &str| {
            let pass = kind_of(&exp.actual).eq_ignore_ascii_case(kind.trim());
            exp.check(pass, &format!("be a {}", kind))
        });
    }
    engine.register_get("ok", |exp: &mut Expectation| {
        exp.check(is_truthy(&exp.actual), "be ok")
    });
    engine.register_fn("ok", |exp: &mut Expectation| {
        exp.check(is_truthy(&exp.actual), "be ok")
    });
    engine.register_get("exist", |exp: &mut Expectation| {
        exp.check(!exp.actual.is_unit(), "exist")
    });
    engine.register_fn("exist", |exp: &mut Expectation| {
        exp.check(!exp.actual.is_unit(), "exist")
    });
    engine.register_get("empty", |exp: &mut Expectation| {
        exp.check(length_of(&exp.actual) == Some(0), "be empty")
    });
    engine.register_fn("empty", |exp: &mut Expectation| {
        exp.check(length_of(&exp.actual) == Some(0), "be empty")
    });
    engine.register_fn("oneOf", |exp: &mut Expectation, options: Array| {
        let actual = to_json(&exp.actual);
        let pass = options
            .iter()
            .any(|option| json_deep_eq(&actual, &to_json(option)));
        exp.check(pass, &format!("be one of {}", describe(&Dynamic::from_array(options))))
    });

    register_assert(engine);
}

fn register_assert(engine: &mut Engine) {
    engine.register_fn("equal", |_: &mut Assert, actual: Dynamic, expected: Dynamic| {
        assert_that(
            json_loose_eq(&to_json(&actual), &to_json(&expected)),
            None,
            || format!("expected {} to equal {}", describe(&actual), describe(&expected)),
        )
    });
    engine.register_fn(
        "equal",
        |_: &mut Assert, actual: Dynamic, expected: Dynamic, message: &str| {
            assert_that(
                json_loose_eq(&to_json(&actual), &to_json(&expected)),
                Some(message),
                String::new,
            )
        },
    );
    engine.register_fn("notEqual", |_: &mut Assert, actual: Dynamic, expected: Dynamic| {
        assert_that(
            !json_loose_eq(&to_json(&actual), &to_json(&expected)),
            None,
            || format!("expected {} to not equal {}", describe(&actual), describe(&expected)),
        )
    });
    engine.register_fn("deepEqual", |_: &mut Assert, actual: Dynamic, expected: Dynamic| {
        assert_that(
            json_deep_eq(&to_json(&actual), &to_json(&expected)),
            None,
            || {
                format!(
                    "expected {} to deeply equal {}",
                    describe(&actual),
                    describe(&expected)
                )
            },
        )
    });
    engine.register_fn("ok", |_: &mut Assert, value: Dynamic| {
        assert_that(is_truthy(&value), None, || {
            format!("expected {} to be truthy", describe(&value))
        })
    });
    engine.register_fn("ok", |_: &mut Assert, value: Dynamic, message: &str| {
        assert_that(is_truthy(&value), Some(message), String::new)
    });
    engine.register_fn("isTrue", |_: &mut Assert, value: Dynamic| {
        assert_that(value.as_bool().ok() == Some(true), None, || {
            format!("expected {} to be true", describe(&value))
        })
    });
    engine.register_fn("isFalse", |_: &mut Assert, value: Dynamic| {
        assert_that(value.as_bool().ok() == Some(false), None, || {
            format!("expected {} to be false", describe(&value))
        })
    });
    engine.register_fn("fail", |_: &mut Assert, message: &str| -> AssertResult {
        Err(message.into())
    });
    engine.register_fn("fail", |_: &mut Assert| -> AssertResult {
        Err("assert.fail()".into())
    });
}

fn assert_that<F>(pass: bool, message: Option<&str>, otherwise: F) -> AssertResult
where
    F: FnOnce() -> String,
{
    if pass {
        return Ok(());
    }
    Err(message.map_or_else(otherwise, str::to_owned).into())
}

/// Converts a script value to JSON. Values JSON cannot express fall back to
/// their display text.
pub(super) fn to_json(value: &Dynamic) -> Value {
    rhai::serde::from_dynamic::<Value>(value).unwrap_or_else(|_err| Value::String(value.to_string()))
}

pub(super) fn from_json(value: &Value) -> Dynamic {
    rhai::serde::to_dynamic(value).unwrap_or(Dynamic::UNIT)
}

/// Text used when a script value is written out: strings as-is, maps and
/// arrays as JSON, everything else by display.
pub(super) fn display(value: &Dynamic) -> String {
    if value.is_string() {
        return value.to_string();
    }
    if value.is_map() || value.is_array() {
        return to_json(value).to_string();
    }
    value.to_string()
}

fn describe(value: &Dynamic) -> String {
    if value.is_unit() {
        return "()".to_owned();
    }
    to_json(value).to_string()
}

pub(super) fn is_truthy(value: &Dynamic) -> bool {
    if value.is_unit() {
        return false;
    }
    if let Ok(flag) = value.as_bool() {
        return flag;
    }
    if let Ok(number) = value.as_int() {
        return number != 0;
    }
    if let Ok(number) = value.as_float() {
        return number != 0.0 && !number.is_nan();
    }
    if value.is_string() {
        return !value.to_string().is_empty();
    }
    true
}

fn as_number(value: &Dynamic) -> Option<f64> {
    if let Ok(number) = value.as_int() {
        return Some(number as f64);
    }
    value.as_float().ok()
}

fn length_of(value: &Dynamic) -> Option<usize> {
    if value.is_string() {
        return Some(value.to_string().chars().count());
    }
    if let Some(array) = value.read_lock::<Array>() {
        return Some(array.len());
    }
    if let Some(map) = value.read_lock::<Map>() {
        return Some(map.len());
    }
    None
}

fn kind_of(value: &Dynamic) -> &'static str {
    if value.is_unit() {
        "null"
    } else if value.is_string() {
        "string"
    } else if value.is_int() || value.is_float() {
        "number"
    } else if value.is_bool() {
        "boolean"
    } else if value.is_array() {
        "array"
    } else if value.is_map() {
        "object"
    } else if value.is::<rhai::FnPtr>() {
        "function"
    } else {
        "unknown"
    }
}

fn includes(haystack: &Dynamic, needle: &Dynamic) -> bool {
    match to_json(haystack) {
        Value::String(text) => text.contains(display(needle).as_str()),
        Value::Array(items) => {
            let needle = to_json(needle);
            items.iter().any(|item| json_loose_eq(item, &needle))
        }
        Value::Object(fields) => match to_json(needle) {
            Value::String(key) => fields.contains_key(&key),
            Value::Object(subset) => subset.iter().all(|(key, value)| {
                fields
                    .get(key)
                    .is_some_and(|actual| json_loose_eq(actual, value))
            }),
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::Array(_) => false,
        },
        Value::Null | Value::Bool(_) | Value::Number(_) => false,
    }
}

fn property(value: &Dynamic, name: &str) -> Option<Dynamic> {
    let json = to_json(value);
    crate::assertions::lookup_path(&json, name).map(from_json)
}
