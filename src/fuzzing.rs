use std::time::Duration;

use serde_json::Value;

use crate::args::{parse_duration_arg, parse_header};
use crate::assertions::{StatusSpec, lookup_path};
use crate::config::CollectionFile;
use crate::domain::VarMap;
use crate::error::{AppError, AppResult, ConfigError};
use crate::template::{ResolveMeta, resolve_str};
use crate::trace::{correlate, parse_jsonl};

/// Parses a header string in `Key: Value` format.
///
/// # Errors
///
/// Returns an error when the header is malformed.
pub fn parse_header_input(input: &str) -> AppResult<(String, String)> {
    parse_header(input).map_err(AppError::from)
}

/// Parses a duration argument (e.g. `10s`, `500ms`).
///
/// # Errors
///
/// Returns an error when the duration is invalid.
pub fn parse_duration_arg_input(input: &str) -> AppResult<Duration> {
    parse_duration_arg(input).map_err(AppError::from)
}

/// Resolves `{{name}}` tokens and reports which names were seen.
#[must_use]
pub fn render_template_input(input: &str, vars: &VarMap) -> (String, ResolveMeta) {
    let mut meta = ResolveMeta::default();
    let rendered = resolve_str(input, vars, Some(&mut meta));
    (rendered, meta)
}

/// Parses `json` and walks `path` through it.
#[must_use]
pub fn lookup_path_input(json: &str, path: &str) -> Option<Value> {
    let root: Value = serde_json::from_str(json).ok()?;
    lookup_path(&root, path).cloned()
}

/// Parses a textual status expectation and checks one code against it.
#[must_use]
pub fn status_spec_input(spec: &str, status: u16) -> (bool, bool) {
    let parsed = StatusSpec::parse(spec);
    (parsed.accepts(status), parsed.fallback)
}

/// Parses a TOML collection.
///
/// # Errors
///
/// Returns an error when the input is not a valid collection.
pub fn collection_from_toml(input: &str) -> AppResult<CollectionFile> {
    toml::from_str(input).map_err(|err| {
        AppError::config(ConfigError::ParseToml {
            path: "fuzz.toml".into(),
            source: err,
        })
    })
}

/// Parses a JSON collection.
///
/// # Errors
///
/// Returns an error when the input is not a valid collection.
pub fn collection_from_json(input: &str) -> AppResult<CollectionFile> {
    serde_json::from_str(input).map_err(|err| {
        AppError::config(ConfigError::ParseJson {
            path: "fuzz.json".into(),
            source: err,
        })
    })
}

/// Parses trace JSONL and groups it; returns `(events, groups)`.
///
/// # Errors
///
/// Returns an error when a line is not a trace event.
pub fn correlate_jsonl_input(input: &str) -> AppResult<(usize, usize)> {
    let events = parse_jsonl(input)?;
    let groups = correlate(&events);
    Ok((events.len(), groups.len()))
}
