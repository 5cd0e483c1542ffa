//! Sequential request × data-row orchestration.
//!
//! The runner owns the only writer to the environment snapshot: every script
//! delta is committed in iteration order, so a later iteration always sees
//! what an earlier one wrote.
mod emit;
mod types;


use std::time::{Duration, Instant};

use serde_json::{Value, json};

use tracing::{debug, info, warn};

use crate::assertions::{ResponseView, evaluate};
use crate::domain::{EnvironmentSnapshot, ExecutionMode, RequestDraft, RowVars};
use crate::error::{AppResult, ValidationError};
use crate::http::{HttpResponse, PreparedRequest, TransportSet, prepare_request};
use crate::script::{
    DEFAULT_SCRIPT_TIMEOUT, RequestSnapshot, ScriptInfo, ScriptJob, ScriptOutcome, ScriptResponse,
    ScriptRole, run_script,
};
use crate::shutdown::AbortReceiver;
use crate::template::{ResolveMeta, resolve_draft};
use crate::trace::{EventKind, TraceId, TraceSink};

use emit::{Emitter, IterationEvents};
pub use types::{
    BatchReport, IterationError, IterationErrorKind, IterationResult, IterationStatus,
};

pub struct BatchRunner {
    transports: TransportSet,
    script_timeout: Duration,
}

enum Step {
    Done(IterationResult),
    Aborted,
}

impl BatchRunner {
    #[must_use]
    pub fn new(transports: TransportSet) -> Self {
        Self {
            transports,
            script_timeout: DEFAULT_SCRIPT_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_script_timeout(mut self, timeout: Duration) -> Self {
        self.script_timeout = timeout;
        self
    }

    /// Runs every data row of one request.
    ///
    /// # Errors
    ///
    /// Returns a validation error before anything runs when the request can
    /// never be sent. Iteration failures are reported in the batch report.
    pub async fn run(
        &self,
        draft: &RequestDraft,
        env: &mut EnvironmentSnapshot,
        sink: &mut dyn TraceSink,
        abort: &AbortReceiver,
    ) -> AppResult<BatchReport> {
        self.run_collection(std::slice::from_ref(draft), env, sink, abort)
            .await
    }

    /// Runs several requests in order against one shared snapshot.
    ///
    /// # Errors
    ///
    /// Returns a validation error before anything runs when the collection
    /// is empty or any request can never be sent.
    pub async fn run_collection(
        &self,
        drafts: &[RequestDraft],
        env: &mut EnvironmentSnapshot,
        sink: &mut dyn TraceSink,
        abort: &AbortReceiver,
    ) -> AppResult<BatchReport> {
        if drafts.is_empty() {
            return Err(ValidationError::NoRequests.into());
        }
        for draft in drafts {
            self.validate(draft)?;
        }

        let started = Instant::now();
        let mut emitter = Emitter::new(sink);
        let mut report = BatchReport::default();

        'requests: for draft in drafts {
            let empty = [RowVars::new()];
            let rows = if draft.data.is_empty() {
                &empty[..]
            } else {
                draft.data.as_slice()
            };
            info!(
                "Running '{}' ({} iteration(s)) against environment '{}'.",
                draft.label(),
                rows.len(),
                env.name()
            );

            for (iteration, row) in rows.iter().enumerate() {
                if *abort.borrow() {
                    report.aborted = true;
                    break 'requests;
                }
                match self
                    .run_iteration(draft, iteration, row, env, &mut emitter, abort)
                    .await
                {
                    Step::Done(result) => report.iterations.push(result),
                    Step::Aborted => {
                        report.aborted = true;
                        break 'requests;
                    }
                }
            }
        }

        report.duration_ms = elapsed_ms(started);
        if report.aborted {
            warn!(
                "Batch aborted after {} iteration(s).",
                report.iterations.len()
            );
        }
        Ok(report)
    }

    fn validate(&self, draft: &RequestDraft) -> Result<(), ValidationError> {
        draft.validate()?;
        if self.transports.for_mode(draft.mode).is_none() {
            let request = draft.label().to_owned();
            return Err(match draft.mode {
                ExecutionMode::Agent => ValidationError::AgentNotConfigured { request },
                ExecutionMode::Proxy | ExecutionMode::Direct => {
                    ValidationError::ProxyNotConfigured { request }
                }
            });
        }
        Ok(())
    }

    async fn run_iteration(
        &self,
        draft: &RequestDraft,
        iteration: usize,
        row: &RowVars,
        env: &mut EnvironmentSnapshot,
        emitter: &mut Emitter<'_>,
        abort: &AbortReceiver,
    ) -> Step {
        let trace_id = TraceId::generate();
        let name = draft.label().to_owned();
        let mut events = IterationEvents::new(
            trace_id.clone(),
            json!({
                "request": name,
                "iteration": iteration,
                "method": draft.method.as_str(),
                "url": draft.url,
            }),
        );
        let info = ScriptInfo {
            iteration,
            request_name: name.clone(),
        };
        let fail = |events: &mut IterationEvents, error: IterationError| {
            events.error(error.kind.as_str(), &error.message);
            IterationResult::failed(&name, iteration, trace_id.clone(), error)
        };

        // Pre-request script; its delta lands in the snapshot even when it fails.
        let mut request_override = None;
        if let Some(source) = script_source(draft.pre_request_script.as_deref()) {
            let merged = env.merged_with(row);
            let mut job = ScriptJob::new(ScriptRole::PreRequest, source);
            let resolved = resolve_draft(draft, &merged, None);
            // Scripts see the request as it would go out, params and auth included.
            job.request = prepare_request(&resolved).map_or_else(
                |_| RequestSnapshot::from_draft(&resolved),
                |prepared| RequestSnapshot::from_prepared(&prepared),
            );
            job.environment = env.values().clone();
            job.row = row.clone();
            job.info = info.clone();
            job.timeout = self.script_timeout;

            let mut outcome = run_script(job).await;
            env.apply(&outcome.environment_delta);
            events.pre_request_logs = std::mem::take(&mut outcome.logs);
            if let Some(error) = script_failure(&outcome) {
                warn!("Pre-request script of '{}' failed: {}", name, error.message);
                let result = fail(&mut events, error);
                emitter.flush(events);
                return Step::Done(result);
            }
            request_override = outcome.request_override;
        }

        let effective = match request_override.as_ref() {
            Some(change) => match draft.with_override(change) {
                Ok(next) => next,
                Err(err) => {
                    let result = fail(
                        &mut events,
                        IterationError::new(IterationErrorKind::Validation, err.to_string()),
                    );
                    emitter.flush(events);
                    return Step::Done(result);
                }
            },
            None => draft.clone(),
        };

        let merged = env.merged_with(row);
        let mut meta = ResolveMeta::default();
        let resolved = resolve_draft(&effective, &merged, Some(&mut meta));
        let missing_vars: Vec<String> = meta.missing.into_iter().collect();
        if !missing_vars.is_empty() {
            warn!(
                "'{}' references unresolved variable(s): {}",
                name,
                missing_vars.join(", ")
            );
        }

        let prepared = match prepare_request(&resolved) {
            Ok(prepared) => prepared,
            Err(err) => {
                let mut result = fail(
                    &mut events,
                    IterationError::new(IterationErrorKind::Validation, err.to_string()),
                );
                result.missing_vars = missing_vars;
                emitter.flush(events);
                return Step::Done(result);
            }
        };
        events.request = request_data(&name, iteration, &prepared);

        let started = Instant::now();
        let response = match self.send(resolved.mode, &prepared, abort).await {
            Some(Ok(response)) => response,
            Some(Err(error)) => {
                let mut result = fail(&mut events, error);
                result.url = Some(prepared.url.clone());
                result.missing_vars = missing_vars;
                emitter.flush(events);
                return Step::Done(result);
            }
            None => {
                info!("Aborted '{}' during the network call.", name);
                events.error(IterationErrorKind::Aborted.as_str(), "Request was aborted.");
                emitter.flush(events);
                return Step::Aborted;
            }
        };
        let elapsed = elapsed_ms(started);
        debug!(
            "{} {} -> {} in {}ms",
            prepared.method, prepared.url, response.status, elapsed
        );

        let mut tests = evaluate(
            &resolved.tests,
            &ResponseView::from_response(&response, elapsed),
        );
        let mut error = None;
        if let Some(source) = script_source(resolved.post_response_script.as_deref()) {
            let mut job = ScriptJob::new(ScriptRole::PostResponse, source);
            job.request = RequestSnapshot::from_prepared(&prepared);
            job.response = Some(ScriptResponse {
                response: response.clone(),
                elapsed_ms: elapsed,
            });
            job.environment = env.values().clone();
            job.row = row.clone();
            job.info = info;
            job.timeout = self.script_timeout;

            let mut outcome = run_script(job).await;
            env.apply(&outcome.environment_delta);
            tests.extend(outcome.report());
            events.post_response_logs = std::mem::take(&mut outcome.logs);
            error = script_failure(&outcome);
            if let Some(error) = error.as_ref() {
                warn!("Post-response script of '{}' failed: {}", name, error.message);
            }
        }

        events.outcome = Some((
            EventKind::Response,
            json!({
                "status": response.status,
                "statusText": response.status_text,
                "elapsedMs": elapsed,
                "tests": {
                    "total": tests.total,
                    "passed": tests.passed,
                    "failed": tests.failed,
                },
            }),
        ));
        emitter.flush(events);

        Step::Done(IterationResult {
            request: name,
            iteration,
            trace_id,
            ok: error.is_none(),
            status: IterationStatus::Code(response.status),
            status_text: Some(response.status_text),
            url: Some(prepared.url),
            elapsed_ms: elapsed,
            tests,
            error,
            missing_vars,
        })
    }

    /// `None` means the abort signal fired first.
    async fn send(
        &self,
        mode: ExecutionMode,
        prepared: &PreparedRequest,
        abort: &AbortReceiver,
    ) -> Option<Result<HttpResponse, IterationError>> {
        let Some(transport) = self.transports.for_mode(mode) else {
            return Some(Err(IterationError::new(
                IterationErrorKind::Validation,
                format!("No transport is configured for {:?} mode.", mode),
            )));
        };
        tokio::select! {
            result = transport.execute(prepared) => Some(result.map_err(|err| {
                IterationError::new(IterationErrorKind::Transport, err.to_string())
            })),
            () = wait_for_abort(abort.clone()) => None,
        }
    }
}

async fn wait_for_abort(mut abort: AbortReceiver) {
    loop {
        if *abort.borrow_and_update() {
            return;
        }
        if abort.changed().await.is_err() {
            // Sender is gone; nothing can abort any more.
            std::future::pending::<()>().await;
        }
    }
}

fn script_source(source: Option<&str>) -> Option<&str> {
    source.filter(|source| !source.trim().is_empty())
}

fn script_failure(outcome: &ScriptOutcome) -> Option<IterationError> {
    if outcome.ok {
        return None;
    }
    let kind = if outcome.timed_out {
        IterationErrorKind::Timeout
    } else {
        IterationErrorKind::Script
    };
    let message = outcome
        .error
        .clone()
        .unwrap_or_else(|| "Script failed.".to_owned());
    Some(IterationError::new(kind, message))
}

fn request_data(name: &str, iteration: usize, prepared: &PreparedRequest) -> Value {
    let headers: serde_json::Map<String, Value> = prepared
        .headers
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();
    json!({
        "request": name,
        "iteration": iteration,
        "method": prepared.method.as_str(),
        "url": prepared.url,
        "headers": headers,
        "hasBody": prepared.body.is_some(),
    })
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
