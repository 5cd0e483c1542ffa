use std::path::Path;
use std::time::Duration;

use tempfile::tempdir;

use super::{DurationValue, load_config_file, load_data_rows};
use crate::domain::{Auth, Check, ExecutionMode, HttpMethod, RequestBody};
use crate::error::{AppError, ConfigError, ValidationError};

fn write(path: &Path, content: &str) -> Result<(), String> {
    std::fs::write(path, content).map_err(|err| format!("write failed: {}", err))
}

const TOML_COLLECTION: &str = r#"
[settings]
default_environment = "staging"
script_timeout = "2s"
request_timeout = 1500
proxy_url = "http://127.0.0.1:7000/proxy"

[environments.staging.vars]
base = "http://localhost:9000"
retries = 3
debug = true
nothing = "x"

[environments.staging.secrets]
token = "s3cret"
base = "http://secret-host"

[environments.local.vars]
base = "http://127.0.0.1"

[[requests]]
name = "list users"
method = "GET"
url = "{{base}}/users"
headers = [{ key = "Authorization", value = "Bearer {{token}}" }]
post_response_script = "pm.test(\"ok\", || pm.response.to.have.status(200));"

[[requests.tests]]
type = "status_equals"
expected = 200

[[requests.tests]]
type = "json_exists"
path = "data.0.id"
name = "first id"

[[requests]]
name = "create user"
method = "post"
url = "{{base}}/users"
mode = "proxy"
body = { mode = "json", json = { name = "{{name}}" } }
auth = { type = "bearer", token = "{{token}}" }
data = [{ name = "ada" }, { name = "grace" }]
"#;

#[test]
fn parse_toml_collection() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("reqpilot.toml");
    write(&path, TOML_COLLECTION)?;

    let collection = load_config_file(&path).map_err(|err| err.to_string())?;
    if collection.settings.default_environment.as_deref() != Some("staging") {
        return Err(format!("Unexpected settings {:?}", collection.settings));
    }
    if collection.requests.len() != 2 {
        return Err(format!("Expected 2 requests, got {}", collection.requests.len()));
    }
    let first = collection.requests.first().ok_or("Missing first request")?;
    if first.method != HttpMethod::Get || first.tests.len() != 2 {
        return Err(format!("Unexpected first request {:?}", first));
    }
    match first.tests.get(1) {
        Some(test) if test.name.as_deref() == Some("first id") => match &test.check {
            Check::JsonExists { path } if path == "data.0.id" => {}
            other => return Err(format!("Unexpected check {:?}", other)),
        },
        other => return Err(format!("Unexpected test {:?}", other)),
    }
    let second = collection.requests.get(1).ok_or("Missing second request")?;
    if second.method != HttpMethod::Post || second.mode != ExecutionMode::Proxy {
        return Err(format!("Unexpected second request {:?}", second));
    }
    if !matches!(&second.body, RequestBody::Json { .. }) {
        return Err(format!("Unexpected body {:?}", second.body));
    }
    if !matches!(&second.auth, Auth::Bearer { token } if token == "{{token}}") {
        return Err(format!("Unexpected auth {:?}", second.auth));
    }
    if second.data.len() != 2 {
        return Err(format!("Unexpected data rows {:?}", second.data));
    }
    Ok(())
}

#[test]
fn parse_json_collection() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("reqpilot.json");
    let content = r#"{
  "settings": { "script_timeout": 250 },
  "environments": { "dev": { "vars": { "base": "http://localhost" } } },
  "requests": [
    { "name": "ping", "url": "{{base}}/ping", "tests": [{ "type": "status_range", "expected": "2xx" }] }
  ]
}"#;
    write(&path, content)?;

    let collection = load_config_file(&path).map_err(|err| err.to_string())?;
    if collection.settings.script_timeout != Some(DurationValue::Millis(250)) {
        return Err(format!("Unexpected settings {:?}", collection.settings));
    }
    let request = collection.requests.first().ok_or("Missing request")?;
    if request.method != HttpMethod::Get || request.tests.len() != 1 {
        return Err(format!("Unexpected request {:?}", request));
    }
    Ok(())
}

#[test]
fn unknown_test_kinds_survive_loading() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("reqpilot.json");
    let content = r#"{ "requests": [
    { "name": "ping", "url": "http://localhost", "tests": [{ "type": "schema_matches", "schema": {} }] }
]}"#;
    write(&path, content)?;

    let collection = load_config_file(&path).map_err(|err| err.to_string())?;
    let request = collection.requests.first().ok_or("Missing request")?;
    match request.tests.first().map(|test| &test.check) {
        Some(Check::Unknown { .. }) => Ok(()),
        other => Err(format!("Expected unknown check, got {:?}", other)),
    }
}

#[test]
fn rejects_unsupported_extension() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("reqpilot.yaml");
    write(&path, "requests: []")?;

    match load_config_file(&path) {
        Err(AppError::Config(ConfigError::UnsupportedExtension { ext })) if ext == "yaml" => {
            Ok(())
        }
        other => Err(format!("Expected unsupported extension, got {:?}", other)),
    }
}

#[test]
fn rejects_missing_extension_and_missing_file() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let bare = dir.path().join("reqpilot");
    write(&bare, "")?;
    if !matches!(
        load_config_file(&bare),
        Err(AppError::Config(ConfigError::MissingExtension))
    ) {
        return Err("Expected missing extension error".to_owned());
    }
    let absent = dir.path().join("absent.toml");
    match load_config_file(&absent) {
        Err(AppError::Config(ConfigError::ReadConfig { .. })) => Ok(()),
        other => Err(format!("Expected read error, got {:?}", other)),
    }
}

#[test]
fn reports_toml_parse_errors() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("broken.toml");
    write(&path, "[[requests]\nname = ")?;
    match load_config_file(&path) {
        Err(AppError::Config(ConfigError::ParseToml { .. })) => Ok(()),
        other => Err(format!("Expected TOML parse error, got {:?}", other)),
    }
}

#[test]
fn environment_layers_and_selection() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("reqpilot.toml");
    write(&path, TOML_COLLECTION)?;
    let collection = load_config_file(&path).map_err(|err| err.to_string())?;

    let staging = collection.environment(None).map_err(|err| err.to_string())?;
    if staging.name() != "staging" {
        return Err(format!("Unexpected environment {}", staging.name()));
    }
    if staging.get("base") != Some("http://secret-host") || staging.get("token") != Some("s3cret")
    {
        return Err(format!("Secrets should override vars: {:?}", staging));
    }
    if staging.get("retries") != Some("3") || staging.get("debug") != Some("true") {
        return Err(format!("Scalars should be stored as text: {:?}", staging));
    }

    let local = collection
        .environment(Some("local"))
        .map_err(|err| err.to_string())?;
    if local.get("base") != Some("http://127.0.0.1") || local.get("token").is_some() {
        return Err(format!("Unexpected local environment {:?}", local));
    }

    match collection.environment(Some("prod")) {
        Err(ValidationError::UnknownEnvironment { name }) if name == "prod" => Ok(()),
        other => Err(format!("Expected unknown environment, got {:?}", other)),
    }
}

#[test]
fn environment_fallbacks_without_a_default() -> Result<(), String> {
    let mut collection = super::CollectionFile::default();
    let empty = collection.environment(None).map_err(|err| err.to_string())?;
    if empty.name() != "default" || !empty.is_empty() {
        return Err(format!("Unexpected empty environment {:?}", empty));
    }

    collection
        .environments
        .insert("only".to_owned(), super::EnvironmentConfig::default());
    let only = collection.environment(None).map_err(|err| err.to_string())?;
    if only.name() != "only" {
        return Err(format!("Expected the only environment, got {}", only.name()));
    }

    collection
        .environments
        .insert("other".to_owned(), super::EnvironmentConfig::default());
    let fallback = collection.environment(None).map_err(|err| err.to_string())?;
    if fallback.name() != "default" || !fallback.is_empty() {
        return Err(format!("Unexpected fallback {:?}", fallback));
    }
    Ok(())
}

#[test]
fn request_filters_keep_file_order() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("reqpilot.toml");
    write(&path, TOML_COLLECTION)?;
    let collection = load_config_file(&path).map_err(|err| err.to_string())?;

    let all = collection
        .select_requests(&[])
        .map_err(|err| err.to_string())?;
    if all.len() != 2 {
        return Err(format!("Expected all requests, got {}", all.len()));
    }
    let picked = collection
        .select_requests(&["create user".to_owned(), "list users".to_owned()])
        .map_err(|err| err.to_string())?;
    let names: Vec<&str> = picked.iter().map(|request| request.name.as_str()).collect();
    if names != vec!["list users", "create user"] {
        return Err(format!("Unexpected order {:?}", names));
    }
    match collection.select_requests(&["nope".to_owned()]) {
        Err(ValidationError::UnknownRequest { name }) if name == "nope" => {}
        other => return Err(format!("Expected unknown request, got {:?}", other)),
    }
    match super::CollectionFile::default().select_requests(&[]) {
        Err(ValidationError::NoRequests) => Ok(()),
        other => Err(format!("Expected no requests, got {:?}", other)),
    }
}

#[test]
fn duration_values_accept_numbers_and_units() -> Result<(), String> {
    let millis = DurationValue::Millis(1500)
        .to_duration()
        .map_err(|err| err.to_string())?;
    if millis != Duration::from_millis(1500) {
        return Err(format!("Unexpected duration {:?}", millis));
    }
    let text = DurationValue::Text("2s".to_owned())
        .to_duration()
        .map_err(|err| err.to_string())?;
    if text != Duration::from_secs(2) {
        return Err(format!("Unexpected duration {:?}", text));
    }
    if !matches!(
        DurationValue::Millis(0).to_duration(),
        Err(ValidationError::DurationZero)
    ) {
        return Err("Zero milliseconds should be rejected".to_owned());
    }
    Ok(())
}

#[test]
fn data_rows_load_from_json_array() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("rows.json");
    write(&path, r#"[{"name": "ada", "user": {"id": 1}}, {"name": "grace"}]"#)?;
    let rows = load_data_rows(&path).map_err(|err| err.to_string())?;
    if rows.len() != 2 {
        return Err(format!("Expected 2 rows, got {}", rows.len()));
    }
    let first = rows.first().ok_or("Missing row")?;
    if first.get("name").and_then(|value| value.as_str()) != Some("ada") {
        return Err(format!("Unexpected row {:?}", first));
    }

    let bad = dir.path().join("bad.json");
    write(&bad, r#"{"name": "ada"}"#)?;
    match load_data_rows(&bad) {
        Err(AppError::Config(ConfigError::ParseDataRows { .. })) => Ok(()),
        other => Err(format!("Expected parse error, got {:?}", other)),
    }
}
