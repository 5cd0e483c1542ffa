use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Instant;

use rhai::FnPtr;
use serde_json::Value;

use super::{LogLevel, RequestSnapshot, ScriptInfo, ScriptLog, ScriptResponse, ScriptRole};
use crate::domain::{EnvironmentDelta, RequestOverride, RowVars, TestResult, TestSource};

pub(super) type Shared = Rc<RefCell<SandboxState>>;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum PromiseState {
    Pending,
    Resolved,
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Waiting {
    Done,
    Promise(u64),
}

#[derive(Debug, Clone)]
pub(super) struct PendingTest {
    pub name: String,
    pub started: Instant,
    pub waiting: Waiting,
}

#[derive(Clone)]
pub(super) struct Timer {
    pub id: u64,
    pub due: Instant,
    pub callback: FnPtr,
}

/// Per-run mutable state shared by every API object handed to the script.
/// Lives and dies on the sandbox thread.
pub(super) struct SandboxState {
    pub role: ScriptRole,
    pub info: ScriptInfo,
    pub request: RequestSnapshot,
    pub request_override: RequestOverride,
    pub response: Option<ScriptResponse>,
    pub response_json: Option<Result<Value, String>>,
    pub environment: BTreeMap<String, String>,
    pub delta: EnvironmentDelta,
    pub row: RowVars,
    pub results: Vec<TestResult>,
    pub pending: BTreeMap<u64, PendingTest>,
    pub promises: HashMap<u64, PromiseState>,
    pub timers: Vec<Timer>,
    pub logs: Vec<ScriptLog>,
    next_id: u64,
}

impl SandboxState {
    pub fn new(job: super::ScriptJob) -> Self {
        Self {
            role: job.role,
            info: job.info,
            request: job.request,
            request_override: RequestOverride::default(),
            response: job.response,
            response_json: None,
            environment: job.environment,
            delta: EnvironmentDelta::new(),
            row: job.row,
            results: Vec::new(),
            pending: BTreeMap::new(),
            promises: HashMap::new(),
            timers: Vec::new(),
            logs: Vec::new(),
            next_id: 0,
        }
    }

    pub fn next_id(&mut self) -> u64 {
        self.next_id = self.next_id.saturating_add(1);
        self.next_id
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.logs.push(ScriptLog::new(level, message));
    }

    /// Environment read as the script sees it: its own writes first.
    pub fn env_get(&self, key: &str) -> Option<String> {
        match self.delta.get(key) {
            Some(change) => change.map(str::to_owned),
            None => self.environment.get(key).cloned(),
        }
    }

    pub fn env_view(&self) -> BTreeMap<String, String> {
        let mut view = self.environment.clone();
        for (key, change) in self.delta.iter() {
            match change {
                Some(value) => {
                    view.insert(key.to_owned(), value.to_owned());
                }
                None => {
                    view.remove(key);
                }
            }
        }
        view
    }

    pub fn record(&mut self, name: String, started: Instant, pass: bool, message: String) {
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.results.push(TestResult {
            name,
            pass,
            message,
            source: TestSource::Script,
            duration_ms: Some(duration_ms),
        });
    }

    /// Settles a pending test once. Later settlements are ignored.
    pub fn finish_test(&mut self, id: u64, pass: bool, message: String) {
        if let Some(test) = self.pending.remove(&id) {
            self.record(test.name, test.started, pass, message);
        }
    }

    pub fn settle_promise(&mut self, id: u64, outcome: PromiseState) {
        if let Some(state) = self.promises.get_mut(&id)
            && *state == PromiseState::Pending
        {
            *state = outcome;
        }
        self.settle_waiting();
    }

    /// Finishes every test whose promise has settled.
    pub fn settle_waiting(&mut self) {
        let ready: Vec<(u64, bool, String)> = self
            .pending
            .iter()
            .filter_map(|(test_id, test)| match test.waiting {
                Waiting::Promise(promise_id) => match self.promises.get(&promise_id) {
                    Some(PromiseState::Resolved) => Some((*test_id, true, String::new())),
                    Some(PromiseState::Rejected(message)) => {
                        Some((*test_id, false, message.clone()))
                    }
                    Some(PromiseState::Pending) | None => None,
                },
                Waiting::Done => None,
            })
            .collect();
        for (test_id, pass, message) in ready {
            self.finish_test(test_id, pass, message);
        }
    }

    /// Removes and returns the earliest due timer.
    pub fn pop_timer(&mut self) -> Option<Timer> {
        let (index, _) = self
            .timers
            .iter()
            .enumerate()
            .min_by_key(|(_, timer)| (timer.due, timer.id))?;
        Some(self.timers.remove(index))
    }
}
