use std::time::Duration;

use tracing::{debug, info, warn};

use super::transports::{DEFAULT_REQUEST_TIMEOUT, build_transports};
use crate::args::RunnerArgs;
use crate::config::{CollectionFile, DurationValue, load_config, load_data_rows};
use crate::domain::{KeyValue, RequestDraft, RowVars};
use crate::error::AppResult;
use crate::runner::{BatchReport, BatchRunner};
use crate::script::DEFAULT_SCRIPT_TIMEOUT;
use crate::shutdown::AbortReceiver;
use crate::trace::{LogSink, MemorySink, TraceEvent};

/// Everything a finished run hands to the output stage.
#[derive(Debug)]
pub(crate) struct RunOutcome {
    pub(crate) environment: String,
    pub(crate) report: BatchReport,
    pub(crate) events: Vec<TraceEvent>,
}

/// Loads the collection and runs the selected requests against one
/// environment snapshot.
///
/// # Errors
///
/// Returns an error when the collection, the data rows or the settings are
/// invalid, or when a transport cannot be built.
pub(crate) async fn run_local(args: &RunnerArgs, abort: &AbortReceiver) -> AppResult<RunOutcome> {
    let (path, collection) = load_config(args.config.as_deref())?;
    debug!("Loaded collection from {}.", path.display());

    let rows = match args.data.as_deref() {
        Some(path) => Some(load_data_rows(path)?),
        None => None,
    };
    let drafts = prepare_drafts(&collection, args, rows)?;

    let script_timeout = pick_timeout(
        args.script_timeout,
        collection.settings.script_timeout.as_ref(),
        DEFAULT_SCRIPT_TIMEOUT,
    )?;
    let request_timeout = pick_timeout(
        args.request_timeout,
        collection.settings.request_timeout.as_ref(),
        DEFAULT_REQUEST_TIMEOUT,
    )?;

    let mut env = collection.environment(args.env.as_deref())?;
    info!(
        "Environment '{}' with {} variable(s).",
        env.name(),
        env.len()
    );

    let transports = build_transports(&collection.settings, request_timeout)?;
    let runner = BatchRunner::new(transports).with_script_timeout(script_timeout);
    let mut sink = LogSink::new(MemorySink::new());
    let report = runner
        .run_collection(&drafts, &mut env, &mut sink, abort)
        .await?;

    Ok(RunOutcome {
        environment: env.name().to_owned(),
        report,
        events: sink.into_inner().into_events(),
    })
}

/// Applies the CLI request filter, extra headers and data rows.
pub(crate) fn prepare_drafts(
    collection: &CollectionFile,
    args: &RunnerArgs,
    rows: Option<Vec<RowVars>>,
) -> AppResult<Vec<RequestDraft>> {
    let mut drafts = collection.select_requests(&args.requests)?;
    for draft in &mut drafts {
        for (key, value) in &args.headers {
            draft
                .headers
                .retain(|header| !header.key.eq_ignore_ascii_case(key));
            draft.headers.push(KeyValue::new(key.as_str(), value.as_str()));
        }
        if let Some(rows) = rows.as_ref() {
            if !draft.data.is_empty() {
                warn!(
                    "Data rows from --data replace the rows defined on '{}'.",
                    draft.label()
                );
            }
            draft.data.clone_from(rows);
        }
    }
    Ok(drafts)
}

/// CLI value, then the collection setting, then the default.
pub(crate) fn pick_timeout(
    cli: Option<Duration>,
    setting: Option<&DurationValue>,
    default: Duration,
) -> AppResult<Duration> {
    if let Some(timeout) = cli {
        return Ok(timeout);
    }
    match setting {
        Some(value) => Ok(value.to_duration()?),
        None => Ok(default),
    }
}
