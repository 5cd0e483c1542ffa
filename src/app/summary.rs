use serde_json::{Value, json};

use super::RunOutcome;
use crate::domain::TestReport;
use crate::runner::{BatchReport, IterationResult};

/// Iterations that errored or had a failing test.
pub(crate) fn failed_iterations(report: &BatchReport) -> usize {
    report
        .iterations
        .iter()
        .filter(|result| !iteration_passed(result))
        .count()
}

fn iteration_passed(result: &IterationResult) -> bool {
    result.ok && result.tests.all_passed()
}

pub(crate) fn iteration_line(result: &IterationResult) -> String {
    let verdict = if iteration_passed(result) {
        "PASS"
    } else {
        "FAIL"
    };
    let status = match result.status_text.as_deref() {
        Some(text) if !text.is_empty() => format!("{} {}", result.status, text),
        Some(_) | None => result.status.to_string(),
    };
    let mut line = format!(
        "[{}] {} #{} {} {}ms tests {}/{}",
        verdict,
        result.request,
        result.iteration,
        status,
        result.elapsed_ms,
        result.tests.passed,
        result.tests.total
    );
    if let Some(error) = result.error.as_ref() {
        line = format!("{} ({}: {})", line, error.kind.as_str(), error.message);
    }
    line
}

/// Failing tests of one iteration, indented under its line.
pub(crate) fn failed_test_lines(tests: &TestReport) -> Vec<String> {
    tests
        .results
        .iter()
        .filter(|result| !result.pass)
        .map(|result| format!("    x {}: {}", result.name, result.message))
        .collect()
}

pub(crate) fn summary_lines(outcome: &RunOutcome) -> Vec<String> {
    let report = &outcome.report;
    let tests = report.tests();
    let mut lines = Vec::new();
    for result in &report.iterations {
        lines.push(iteration_line(result));
        lines.extend(failed_test_lines(&result.tests));
        if !result.missing_vars.is_empty() {
            lines.push(format!(
                "    ! unresolved: {}",
                result.missing_vars.join(", ")
            ));
        }
    }
    lines.push(format!("Environment: {}", outcome.environment));
    lines.push(format!(
        "Iterations: {} ({} failed)",
        report.iterations.len(),
        failed_iterations(report)
    ));
    lines.push(format!(
        "Tests: {} passed, {} failed, {} total",
        tests.passed, tests.failed, tests.total
    ));
    lines.push(format!("Duration: {}ms", report.duration_ms));
    if report.aborted {
        lines.push("Aborted before all iterations ran.".to_owned());
    }
    lines
}

pub(crate) fn print_summary(outcome: &RunOutcome) {
    for line in summary_lines(outcome) {
        println!("{}", line);
    }
}

pub(crate) fn json_report(outcome: &RunOutcome) -> Value {
    let report = &outcome.report;
    let tests = report.tests();
    json!({
        "environment": outcome.environment,
        "aborted": report.aborted,
        "durationMs": report.duration_ms,
        "summary": {
            "iterations": report.iterations.len(),
            "failedIterations": failed_iterations(report),
            "tests": {
                "total": tests.total,
                "passed": tests.passed,
                "failed": tests.failed,
            },
        },
        "iterations": report.iterations,
    })
}
