
use std::fs;
use std::path::Path;

use serde_json::Value;
use tempfile::tempdir;

use support_single::{run_reqpilot, spawn_http_server_or_skip};

fn collection(base: &str) -> String {
    format!(
        r#"
[settings]
default_environment = "local"
script_timeout = "2s"
request_timeout = "5s"

[environments.local.vars]
base = "{base}"

[[requests]]
name = "list users"
method = "GET"
url = "{{{{base}}}}/users"
params = [{{ key = "name", value = "{{{{name}}}}" }}]
data = [{{ name = "ada" }}, {{ name = "grace" }}]
post_response_script = '''
pm.test("has data", || pm.expect(pm.response.json().data.len()).to.equal(1));
pm.environment.set("last_name", pm.iterationData.get("name"));
'''

[[requests.tests]]
type = "status_equals"
expected = 200

[[requests.tests]]
type = "header_equals"
header = "X-Served-By"
expected = "support"

[[requests]]
name = "missing page"
url = "{{{{base}}}}/missing"

[[requests.tests]]
type = "status_range"
expected = "200-299"
"#
    )
}

fn stdout_json(output: &std::process::Output) -> Result<Value, String> {
    serde_json::from_slice(&output.stdout).map_err(|err| {
        format!(
            "stdout is not JSON ({}): {}\nstderr: {}",
            err,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

fn write_collection(dir: &Path, base: &str) -> Result<(), String> {
    fs::write(dir.join("reqpilot.toml"), collection(base))
        .map_err(|err| format!("write collection failed: {}", err))
}

#[test]
fn e2e_single_passing_request_with_trace() -> Result<(), String> {
    let Some((url, _server)) = spawn_http_server_or_skip()? else {
        return Ok(());
    };
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    write_collection(dir.path(), &url)?;

    let output = run_reqpilot(
        dir.path(),
        [
            "-r",
            "list users",
            "-o",
            "json",
            "--trace-out",
            "trace.jsonl",
        ],
    )?;
    if !output.status.success() {
        return Err(format!(
            "stdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    let report = stdout_json(&output)?;
    if report["environment"] != "local" || report["summary"]["iterations"] != 2 {
        return Err(format!("Unexpected report {}", report));
    }
    if report["summary"]["failedIterations"] != 0 || report["summary"]["tests"]["passed"] != 6 {
        return Err(format!("Unexpected summary {}", report["summary"]));
    }
    if report["iterations"][1]["url"] != format!("{}/users?name=grace", url) {
        return Err(format!("Unexpected url {}", report["iterations"][1]["url"]));
    }

    let trace = fs::read_to_string(dir.path().join("trace.jsonl"))
        .map_err(|err| format!("read trace failed: {}", err))?;
    let kinds: Vec<String> = trace
        .lines()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .filter_map(|event| event["type"].as_str().map(str::to_owned))
        .collect();
    let expected = vec!["request", "response", "request", "response"];
    if kinds != expected {
        return Err(format!("Unexpected trace kinds {:?}", kinds));
    }
    Ok(())
}

#[test]
fn e2e_single_failing_test_sets_exit_status() -> Result<(), String> {
    let Some((url, _server)) = spawn_http_server_or_skip()? else {
        return Ok(());
    };
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    write_collection(dir.path(), &url)?;

    let failing = run_reqpilot(dir.path(), ["-r", "missing page"])?;
    if failing.status.success() {
        return Err("A failing status test should fail the run".to_owned());
    }
    let stdout = String::from_utf8_lossy(&failing.stdout);
    if !stdout.contains("[FAIL] missing page #0 404 Not Found") {
        return Err(format!("Unexpected stdout {}", stdout));
    }

    let tolerated = run_reqpilot(dir.path(), ["-r", "missing page", "--no-fail"])?;
    if !tolerated.status.success() {
        return Err(format!(
            "--no-fail should exit cleanly: {}",
            String::from_utf8_lossy(&tolerated.stderr)
        ));
    }
    Ok(())
}

#[test]
fn e2e_single_missing_collection_fails() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let output = run_reqpilot(dir.path(), ["--no-fail"])?;
    if output.status.success() {
        return Err("Running without a collection should fail".to_owned());
    }
    Ok(())
}

#[test]
fn e2e_single_unknown_environment_fails_before_sending() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    write_collection(dir.path(), "http://127.0.0.1:9")?;
    let output = run_reqpilot(dir.path(), ["-e", "prod"])?;
    if output.status.success() {
        return Err("Unknown environment should fail".to_owned());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.contains("prod") {
        return Err(format!("Unexpected stderr {}", stderr));
    }
    Ok(())
}
