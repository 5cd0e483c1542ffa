use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use crate::domain::VarMap;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Names seen while resolving; shared across calls so a whole draft can be
/// summarized at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolveMeta {
    pub used: BTreeSet<String>,
    pub resolved: BTreeSet<String>,
    pub missing: BTreeSet<String>,
}

/// Replaces every resolvable `{{name}}` token in `input`.
///
/// A token resolves when its name (flat key first, then a dotted walk through
/// nested objects) is present, not null, and stringifies to a non-empty
/// value. Any other token is copied through verbatim. Substituted text is not
/// scanned again.
#[must_use]
pub fn resolve_str(input: &str, vars: &VarMap, mut meta: Option<&mut ResolveMeta>) -> String {
    let mut rest = input;
    let mut output = String::with_capacity(input.len());

    loop {
        let Some(start) = rest.find(OPEN) else {
            output.push_str(rest);
            break;
        };
        let (before, token_start) = rest.split_at(start);
        output.push_str(before);
        let Some(after) = token_start.strip_prefix(OPEN) else {
            output.push_str(token_start);
            break;
        };
        let Some(end) = after.find(CLOSE) else {
            output.push_str(token_start);
            break;
        };
        let (key_part, after_end) = after.split_at(end);
        if key_part.contains(OPEN) {
            // `{{a {{b}}`: keep the stray opener and rescan from the inner one.
            output.push_str(OPEN);
            rest = after;
            continue;
        }
        let Some(remaining) = after_end.strip_prefix(CLOSE) else {
            output.push_str(token_start);
            break;
        };
        let raw_len = token_start.len().saturating_sub(remaining.len());
        let raw = token_start.get(..raw_len).unwrap_or(token_start);

        let name = key_part.trim();
        match resolve_name(name, vars) {
            Some(value) => {
                if let Some(meta) = meta.as_deref_mut() {
                    meta.used.insert(name.to_owned());
                    meta.resolved.insert(name.to_owned());
                }
                output.push_str(&value);
            }
            None => {
                if let Some(meta) = meta.as_deref_mut()
                    && !name.is_empty()
                {
                    meta.used.insert(name.to_owned());
                    meta.missing.insert(name.to_owned());
                }
                output.push_str(raw);
            }
        }
        rest = remaining;
    }

    output
}

fn resolve_name(name: &str, vars: &VarMap) -> Option<String> {
    if !is_valid_name(name) {
        return None;
    }
    lookup_var(vars, name)
        .and_then(stringify)
        .filter(|value| !value.is_empty())
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|ch| ch.is_whitespace() || ch == '{' || ch == '}')
        && name.split('.').all(|segment| !segment.is_empty())
}

/// Looks up a variable by flat key, then by dotted path through nested
/// objects and array indices. Presence is by key, not truthiness.
#[must_use]
pub fn lookup_var<'vars>(vars: &'vars VarMap, name: &str) -> Option<&'vars Value> {
    if let Some(value) = vars.get(name) {
        return Some(value);
    }
    let mut segments = name.split('.');
    let first = segments.next()?;
    let mut current = vars.get(first)?;
    for segment in segments {
        current = match current {
            Value::Object(fields) => fields.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => return None,
        };
    }
    Some(current)
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            Some(value.to_string())
        }
    }
}
