use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use rhai::{AST, Dynamic, Engine, EvalAltResult};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::api::{self, Console, Pm};
use super::expect::{self, display};
use super::state::{SandboxState, Shared};
use super::{LogLevel, ScriptJob, ScriptOutcome};
use crate::error::ScriptError;

/// Extra time the caller waits for the sandbox thread beyond the script's
/// own deadline before giving up on it.
const SANDBOX_GRACE: Duration = Duration::from_millis(250);
const PROGRESS_CHECK_MASK: u64 = 0x3f;

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Runs one script on a dedicated sandbox thread and waits for its outcome.
///
/// Never fails: every problem, including the sandbox thread itself going
/// away, is reported through the returned [`ScriptOutcome`].
pub async fn run_script(job: ScriptJob) -> ScriptOutcome {
    let started = Instant::now();
    let timeout = job.timeout;
    let role = job.role;
    let (outcome_tx, outcome_rx) = oneshot::channel();

    let spawned = std::thread::Builder::new()
        .name("script-sandbox".to_owned())
        .spawn(move || {
            if outcome_tx.send(run_script_blocking(job)).is_err() {
                debug!("Script outcome dropped; caller stopped waiting.");
            }
        });
    if let Err(source) = spawned {
        return ScriptOutcome::failed(
            &ScriptError::SpawnSandbox { source },
            false,
            elapsed_ms(started),
        );
    }

    match tokio::time::timeout(timeout.saturating_add(SANDBOX_GRACE), outcome_rx).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(_closed)) => {
            ScriptOutcome::failed(&ScriptError::SandboxDisconnected, false, elapsed_ms(started))
        }
        Err(_elapsed) => {
            warn!("{} script did not report back within its deadline.", role);
            ScriptOutcome::failed(
                &ScriptError::Timeout {
                    timeout_ms: duration_ms(timeout),
                },
                true,
                elapsed_ms(started),
            )
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Runs one script on the current thread. The script, every test it
/// registers and every timer those tests wait on share one deadline.
#[must_use]
pub fn run_script_blocking(mut job: ScriptJob) -> ScriptOutcome {
    let started = Instant::now();
    let deadline = started.checked_add(job.timeout).unwrap_or(started);
    let timeout_ms = duration_ms(job.timeout);
    let role = job.role;
    let source = std::mem::take(&mut job.source);
    let state: Shared = Rc::new(RefCell::new(SandboxState::new(job)));

    let engine = build_engine(&state, deadline);
    let failure = match engine.compile(&source) {
        Ok(ast) => execute(&engine, &ast, &state, deadline, timeout_ms),
        Err(err) => Some(ScriptError::Compile {
            message: err.to_string(),
        }),
    };
    let timed_out = matches!(
        failure,
        Some(ScriptError::Timeout { .. } | ScriptError::PendingTests { .. })
    );

    let outcome = collect(&state, failure, timed_out, elapsed_ms(started));
    debug!(
        "{} script finished in {}ms (ok: {}, tests: {}, logs: {}).",
        role,
        outcome.duration_ms,
        outcome.ok,
        outcome.results.len(),
        outcome.logs.len()
    );
    outcome
}

fn build_engine(state: &Shared, deadline: Instant) -> Engine {
    let mut engine = Engine::new();
    engine.disable_symbol("eval");
    engine.on_progress(move |operations| {
        if operations & PROGRESS_CHECK_MASK == 0 && Instant::now() >= deadline {
            Some("script deadline reached".into())
        } else {
            None
        }
    });
    let shared = state.clone();
    engine.on_print(move |text| shared.borrow_mut().log(LogLevel::Print, text));
    let shared = state.clone();
    engine.on_debug(move |text, _source, _position| {
        shared.borrow_mut().log(LogLevel::Debug, text);
    });

    // Resolved on every lookup rather than kept in a scope, so closures
    // capture their own handle instead of sharing (and locking) one variable.
    let pm = Pm::new(state.clone());
    let console = Console::new(state.clone());
    #[expect(deprecated, reason = "on_var is flagged as a volatile rhai API")]
    engine.on_var(move |name, _index, _context| {
        Ok(match name {
            "pm" => Some(Dynamic::from(pm.clone())),
            "console" => Some(Dynamic::from(console.clone())),
            _ => None,
        })
    });

    expect::register(&mut engine);
    api::register(&mut engine, state);
    engine
}

fn execute(
    engine: &Engine,
    ast: &AST,
    state: &Shared,
    deadline: Instant,
    timeout_ms: u64,
) -> Option<ScriptError> {
    match engine.run_ast(ast) {
        Ok(()) => drain(engine, ast, state, deadline, timeout_ms),
        Err(err) if is_terminated(&err) => Some(ScriptError::Timeout { timeout_ms }),
        Err(err) => Some(ScriptError::Runtime {
            message: error_message(&err),
        }),
    }
}

/// Fires timers in due order until every registered test has settled.
fn drain(
    engine: &Engine,
    ast: &AST,
    state: &Shared,
    deadline: Instant,
    timeout_ms: u64,
) -> Option<ScriptError> {
    loop {
        let next = {
            let mut state = state.borrow_mut();
            if state.pending.is_empty() {
                return None;
            }
            state.pop_timer()
        };
        let Some(timer) = next else {
            let count = state.borrow().pending.len();
            return Some(ScriptError::PendingTests { count });
        };
        if timer.due > deadline {
            return Some(ScriptError::Timeout { timeout_ms });
        }
        std::thread::sleep(timer.due.saturating_duration_since(Instant::now()));

        if let Err(err) = timer.callback.call::<Dynamic>(engine, ast, ()) {
            if is_terminated(&err) {
                return Some(ScriptError::Timeout { timeout_ms });
            }
            return Some(ScriptError::Runtime {
                message: error_message(&err),
            });
        }
    }
}

fn collect(
    state: &Shared,
    failure: Option<ScriptError>,
    timed_out: bool,
    duration_ms: u64,
) -> ScriptOutcome {
    let mut state = state.borrow_mut();
    let request_override = std::mem::take(&mut state.request_override);
    ScriptOutcome {
        ok: failure.is_none(),
        timed_out,
        error: failure.map(|err| err.to_string()),
        results: std::mem::take(&mut state.results),
        logs: std::mem::take(&mut state.logs),
        environment_delta: std::mem::take(&mut state.delta),
        request_override: (!request_override.is_empty()).then_some(request_override),
        duration_ms,
    }
}

pub(super) fn root_error(err: &EvalAltResult) -> &EvalAltResult {
    match err {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => root_error(inner),
        other => other,
    }
}

pub(super) fn is_terminated(err: &EvalAltResult) -> bool {
    matches!(root_error(err), EvalAltResult::ErrorTerminated(..))
}

/// The message a script author would recognize: thrown values as written,
/// engine errors by their description.
pub(super) fn error_message(err: &EvalAltResult) -> String {
    match root_error(err) {
        EvalAltResult::ErrorRuntime(value, _) => display(value),
        other => other.to_string(),
    }
}
