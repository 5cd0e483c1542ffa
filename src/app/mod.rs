mod runner;
pub(crate) mod summary;
mod transports;


pub(crate) use runner::{RunOutcome, run_local};

use tracing::info;

use crate::args::{OutputFormat, RunnerArgs};
use crate::error::{AppResult, ValidationError};
use crate::shutdown::abort_channel;
use crate::shutdown_handlers::setup_signal_abort_handler;
use crate::trace::write_jsonl;

/// Runs the selected requests, writes the requested outputs and turns the
/// report into the process outcome.
///
/// # Errors
///
/// Returns an error when the collection cannot be loaded or validated, an
/// output cannot be written, or the run failed and `--no-fail` is not set.
pub(crate) async fn run(args: RunnerArgs) -> AppResult<()> {
    let (abort_tx, abort_rx) = abort_channel();
    let signal_handle = setup_signal_abort_handler(&abort_tx);
    let outcome = run_local(&args, &abort_rx).await;
    signal_handle.abort();
    let outcome = outcome?;

    if let Some(path) = args.trace_out.as_deref() {
        write_jsonl(path, &outcome.events).await?;
        info!(
            "Wrote {} trace event(s) to {}.",
            outcome.events.len(),
            path.display()
        );
    }

    match args.output {
        OutputFormat::Text => summary::print_summary(&outcome),
        OutputFormat::Json => {
            let report = summary::json_report(&outcome);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    exit_status(&outcome, args.no_fail)
}

pub(crate) fn exit_status(outcome: &RunOutcome, no_fail: bool) -> AppResult<()> {
    if outcome.report.aborted {
        return Err(ValidationError::Cancelled.into());
    }
    let failed = summary::failed_iterations(&outcome.report);
    if failed > 0 && !no_fail {
        return Err(ValidationError::RunFailed {
            failed,
            total: outcome.report.iterations.len(),
        }
        .into());
    }
    Ok(())
}
