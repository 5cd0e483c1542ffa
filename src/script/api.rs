use std::time::{Duration, Instant};

use rhai::{Dynamic, Engine, EvalAltResult, FnPtr, INT, Map, NativeCallContext};
use serde_json::Value;

use super::expect::{Assert, Expectation, display, from_json, is_truthy, to_json};
use super::sandbox::{error_message, is_terminated, root_error};
use super::state::{PendingTest, PromiseState, Shared, Timer, Waiting};
use super::{LogLevel, ScriptRole};
use crate::assertions::{json_loose_eq, lookup_path};
use crate::domain::HttpMethod;
use crate::template::{lookup_var, resolve_str};

type FnResult<T> = Result<T, Box<EvalAltResult>>;

const SETTLE_FN: &str = "pm_settle";
const DONE_FN: &str = "pm_done";
const MAX_TIMER_MS: INT = 86_400_000;

/// The `pm` object.
#[derive(Clone)]
pub(super) struct Pm {
    state: Shared,
}

impl Pm {
    pub fn new(state: Shared) -> Self {
        Self { state }
    }
}

#[derive(Clone)]
struct EnvApi {
    state: Shared,
}

#[derive(Clone)]
struct VariablesApi {
    state: Shared,
}

#[derive(Clone)]
struct IterationDataApi {
    state: Shared,
}

#[derive(Clone)]
struct RequestApi {
    state: Shared,
}

#[derive(Clone)]
struct ResponseApi {
    state: Shared,
}

#[derive(Clone)]
struct ResponseAssert {
    state: Shared,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum HeaderSource {
    Request,
    Response,
}

#[derive(Clone)]
struct HeadersApi {
    state: Shared,
    source: HeaderSource,
}

impl HeadersApi {
    fn values(&self, name: &str) -> Vec<String> {
        let state = self.state.borrow();
        let headers = match self.source {
            HeaderSource::Request => &state.request.headers,
            HeaderSource::Response => match state.response.as_ref() {
                Some(response) => &response.response.headers,
                None => return Vec::new(),
            },
        };
        headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name.trim()))
            .map(|(_, value)| value.clone())
            .collect()
    }

    fn get(&self, name: &str) -> Option<String> {
        let values = self.values(name);
        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }

    fn to_map(&self) -> Map {
        let state = self.state.borrow();
        let headers = match self.source {
            HeaderSource::Request => state.request.headers.as_slice(),
            HeaderSource::Response => state
                .response
                .as_ref()
                .map_or(&[][..], |response| response.response.headers.as_slice()),
        };
        let mut map = Map::new();
        for (key, value) in headers {
            let joined = match map.get(key.as_str()) {
                Some(existing) => format!("{}, {}", existing, value),
                None => value.clone(),
            };
            map.insert(key.as_str().into(), joined.into());
        }
        map
    }
}

/// `console.log/info/warn/error`.
#[derive(Clone)]
pub(super) struct Console {
    state: Shared,
}

impl Console {
    pub fn new(state: Shared) -> Self {
        Self { state }
    }

    fn write(&self, level: LogLevel, parts: &[Dynamic]) {
        let message = parts.iter().map(display).collect::<Vec<_>>().join(" ");
        self.state.borrow_mut().log(level, message);
    }
}

/// Returned by `Promise(...)`; a test that returns one waits for it.
#[derive(Debug, Clone, Copy)]
pub(super) struct PromiseHandle {
    id: u64,
}

fn to_int(value: u64) -> INT {
    INT::try_from(value).unwrap_or(INT::MAX)
}

fn from_int(value: INT) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn optional(value: Option<String>) -> Dynamic {
    value.map_or(Dynamic::UNIT, Dynamic::from)
}

fn curried(name: &str, args: Vec<Dynamic>) -> FnResult<FnPtr> {
    let mut pointer = FnPtr::new(name)?;
    for arg in args {
        pointer.add_curry(arg);
    }
    Ok(pointer)
}

/// A zero-argument call that failed because the callback itself wants more
/// arguments, i.e. the legacy `|done|` convention. A missing function called
/// from inside the callback does not count.
fn wants_done(error: &EvalAltResult, callback: &FnPtr) -> bool {
    let EvalAltResult::ErrorFunctionNotFound(signature, _) = root_error(error) else {
        return false;
    };
    let Some(args) = signature
        .strip_prefix(callback.fn_name())
        .and_then(|rest| rest.strip_prefix(" ("))
        .and_then(|rest| rest.strip_suffix(')'))
    else {
        return false;
    };
    let passed = if args.trim().is_empty() {
        0
    } else {
        args.split(',').count()
    };
    passed == callback.curry().len()
}

fn read_only(state: &Shared) -> FnResult<()> {
    if state.borrow().role == ScriptRole::PostResponse {
        return Err("pm.request cannot be modified in a post-response script".into());
    }
    Ok(())
}

pub(super) fn register(engine: &mut Engine, state: &Shared) {
    engine.register_type_with_name::<Pm>("Pm");
    engine.register_type_with_name::<EnvApi>("Environment");
    engine.register_type_with_name::<VariablesApi>("Variables");
    engine.register_type_with_name::<IterationDataApi>("IterationData");
    engine.register_type_with_name::<RequestApi>("Request");
    engine.register_type_with_name::<ResponseApi>("Response");
    engine.register_type_with_name::<ResponseAssert>("ResponseAssertion");
    engine.register_type_with_name::<HeadersApi>("Headers");
    engine.register_type_with_name::<Console>("Console");
    engine.register_type_with_name::<PromiseHandle>("Promise");

    register_tests(engine);
    register_async(engine, state);
    register_pm_views(engine);
    register_environment(engine);
    register_variables(engine);
    register_request(engine);
    register_response(engine);
    register_console(engine);
}

fn register_tests(engine: &mut Engine) {
    engine.register_fn(
        "test",
        |ctx: NativeCallContext, pm: &mut Pm, name: &str, callback: FnPtr| -> FnResult<()> {
            let started = Instant::now();
            match callback.call_within_context::<Dynamic>(&ctx, ()) {
                Ok(value) => match value.try_cast::<PromiseHandle>() {
                    Some(handle) => {
                        let mut state = pm.state.borrow_mut();
                        let id = state.next_id();
                        state.pending.insert(
                            id,
                            PendingTest {
                                name: name.to_owned(),
                                started,
                                waiting: Waiting::Promise(handle.id),
                            },
                        );
                        state.settle_waiting();
                    }
                    None => {
                        pm.state
                            .borrow_mut()
                            .record(name.to_owned(), started, true, String::new());
                    }
                },
                Err(error) if is_terminated(&error) => return Err(error),
                Err(error) if wants_done(&error, &callback) => {
                    let id = {
                        let mut state = pm.state.borrow_mut();
                        let id = state.next_id();
                        state.pending.insert(
                            id,
                            PendingTest {
                                name: name.to_owned(),
                                started,
                                waiting: Waiting::Done,
                            },
                        );
                        id
                    };
                    let done = curried(DONE_FN, vec![Dynamic::from(to_int(id))])?;
                    match callback.call_within_context::<Dynamic>(&ctx, (done,)) {
                        Ok(_) => {}
                        Err(error) if is_terminated(&error) => return Err(error),
                        Err(error) => {
                            pm.state
                                .borrow_mut()
                                .finish_test(id, false, error_message(&error));
                        }
                    }
                }
                Err(error) => {
                    pm.state
                        .borrow_mut()
                        .record(name.to_owned(), started, false, error_message(&error));
                }
            }
            Ok(())
        },
    );
    engine.register_fn("expect", |_: &mut Pm, actual: Dynamic| Expectation::new(actual));
    engine.register_get("assert", |_: &mut Pm| Assert);
}

fn register_async(engine: &mut Engine, state: &Shared) {
    let shared = state.clone();
    engine.register_fn(DONE_FN, move |id: INT| {
        shared
            .borrow_mut()
            .finish_test(from_int(id), true, String::new());
    });
    let shared = state.clone();
    engine.register_fn(DONE_FN, move |id: INT, error: Dynamic| {
        let failed = is_truthy(&error);
        shared
            .borrow_mut()
            .finish_test(from_int(id), !failed, if failed { display(&error) } else { String::new() });
    });

    let shared = state.clone();
    engine.register_fn(SETTLE_FN, move |id: INT, resolved: bool| {
        let outcome = if resolved {
            PromiseState::Resolved
        } else {
            PromiseState::Rejected("Promise rejected".to_owned())
        };
        shared.borrow_mut().settle_promise(from_int(id), outcome);
    });
    let shared = state.clone();
    engine.register_fn(SETTLE_FN, move |id: INT, resolved: bool, value: Dynamic| {
        let outcome = if resolved {
            PromiseState::Resolved
        } else {
            PromiseState::Rejected(display(&value))
        };
        shared.borrow_mut().settle_promise(from_int(id), outcome);
    });

    let shared = state.clone();
    engine.register_fn(
        "Promise",
        move |ctx: NativeCallContext, executor: FnPtr| -> FnResult<PromiseHandle> {
            let id = {
                let mut state = shared.borrow_mut();
                let id = state.next_id();
                state.promises.insert(id, PromiseState::Pending);
                id
            };
            let resolve = curried(SETTLE_FN, vec![Dynamic::from(to_int(id)), Dynamic::TRUE])?;
            let reject = curried(SETTLE_FN, vec![Dynamic::from(to_int(id)), Dynamic::FALSE])?;
            match executor.call_within_context::<Dynamic>(&ctx, (resolve, reject)) {
                Ok(_) => {}
                Err(error) if is_terminated(&error) => return Err(error),
                Err(error) => shared
                    .borrow_mut()
                    .settle_promise(id, PromiseState::Rejected(error_message(&error))),
            }
            Ok(PromiseHandle { id })
        },
    );

    let shared = state.clone();
    engine.register_fn("setTimeout", move |callback: FnPtr, delay_ms: INT| {
        schedule(&shared, callback, delay_ms)
    });
    let shared = state.clone();
    engine.register_fn("setTimeout", move |callback: FnPtr| {
        schedule(&shared, callback, 0)
    });
    let shared = state.clone();
    engine.register_fn("clearTimeout", move |id: INT| {
        let id = from_int(id);
        shared.borrow_mut().timers.retain(|timer| timer.id != id);
    });
}

fn schedule(state: &Shared, callback: FnPtr, delay_ms: INT) -> INT {
    let delay = Duration::from_millis(from_int(delay_ms.clamp(0, MAX_TIMER_MS)));
    let now = Instant::now();
    let mut state = state.borrow_mut();
    let id = state.next_id();
    state.timers.push(Timer {
        id,
        due: now.checked_add(delay).unwrap_or(now),
        callback,
    });
    to_int(id)
}

fn register_pm_views(engine: &mut Engine) {
    for name in ["environment", "env", "globals"] {
        engine.register_get(name, |pm: &mut Pm| EnvApi {
            state: pm.state.clone(),
        });
    }
    engine.register_get("variables", |pm: &mut Pm| VariablesApi {
        state: pm.state.clone(),
    });
    engine.register_get("iterationData", |pm: &mut Pm| IterationDataApi {
        state: pm.state.clone(),
    });
    engine.register_get("request", |pm: &mut Pm| RequestApi {
        state: pm.state.clone(),
    });
    engine.register_get("response", |pm: &mut Pm| -> Dynamic {
        if pm.state.borrow().response.is_some() {
            Dynamic::from(ResponseApi {
                state: pm.state.clone(),
            })
        } else {
            Dynamic::UNIT
        }
    });
    engine.register_get("info", |pm: &mut Pm| {
        let state = pm.state.borrow();
        let mut info = Map::new();
        info.insert(
            "iteration".into(),
            Dynamic::from(INT::try_from(state.info.iteration).unwrap_or(INT::MAX)),
        );
        info.insert(
            "requestName".into(),
            Dynamic::from(state.info.request_name.clone()),
        );
        let event = match state.role {
            ScriptRole::PreRequest => "prerequest",
            ScriptRole::PostResponse => "test",
        };
        info.insert("eventName".into(), Dynamic::from(event));
        info
    });
}

fn register_environment(engine: &mut Engine) {
    engine.register_fn("get", |env: &mut EnvApi, key: &str| {
        optional(env.state.borrow().env_get(key))
    });
    engine.register_fn("has", |env: &mut EnvApi, key: &str| {
        env.state.borrow().env_get(key).is_some()
    });
    engine.register_fn("set", |env: &mut EnvApi, key: &str, value: Dynamic| {
        let mut state = env.state.borrow_mut();
        // Setting unit removes the variable.
        if value.is_unit() {
            state.delta.unset(key);
        } else {
            state.delta.set(key, display(&value));
        }
    });
    engine.register_fn("unset", |env: &mut EnvApi, key: &str| {
        env.state.borrow_mut().delta.unset(key);
    });
    engine.register_fn("toObject", |env: &mut EnvApi| {
        env.state
            .borrow()
            .env_view()
            .into_iter()
            .map(|(key, value)| (key.into(), Dynamic::from(value)))
            .collect::<Map>()
    });
}

fn merged_vars(state: &Shared) -> serde_json::Map<String, Value> {
    let state = state.borrow();
    let mut merged: serde_json::Map<String, Value> = state
        .env_view()
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    for (key, value) in &state.row {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

fn json_map(map: serde_json::Map<String, Value>) -> Map {
    map.into_iter()
        .map(|(key, value)| (key.into(), from_json(&value)))
        .collect()
}

fn register_variables(engine: &mut Engine) {
    engine.register_fn("get", |vars: &mut VariablesApi, key: &str| {
        let merged = merged_vars(&vars.state);
        lookup_var(&merged, key).map_or(Dynamic::UNIT, from_json)
    });
    engine.register_fn("has", |vars: &mut VariablesApi, key: &str| {
        lookup_var(&merged_vars(&vars.state), key).is_some()
    });
    engine.register_fn("toObject", |vars: &mut VariablesApi| {
        json_map(merged_vars(&vars.state))
    });
    engine.register_fn("replaceIn", |vars: &mut VariablesApi, text: &str| {
        resolve_str(text, &merged_vars(&vars.state), None)
    });

    engine.register_fn("get", |data: &mut IterationDataApi, key: &str| {
        lookup_var(&data.state.borrow().row, key).map_or(Dynamic::UNIT, from_json)
    });
    engine.register_fn("has", |data: &mut IterationDataApi, key: &str| {
        lookup_var(&data.state.borrow().row, key).is_some()
    });
    engine.register_fn("toObject", |data: &mut IterationDataApi| {
        json_map(data.state.borrow().row.clone())
    });
}

fn register_request(engine: &mut Engine) {
    engine.register_get("url", |request: &mut RequestApi| {
        request.state.borrow().request.url.clone()
    });
    engine.register_get("method", |request: &mut RequestApi| {
        request.state.borrow().request.method.clone()
    });
    engine.register_get("body", |request: &mut RequestApi| {
        optional(request.state.borrow().request.body.clone())
    });
    engine.register_get("headers", |request: &mut RequestApi| HeadersApi {
        state: request.state.clone(),
        source: HeaderSource::Request,
    });

    engine.register_fn("setUrl", |request: &mut RequestApi, url: &str| -> FnResult<()> {
        read_only(&request.state)?;
        let mut state = request.state.borrow_mut();
        state.request.url = url.to_owned();
        state.request_override.url = Some(url.to_owned());
        Ok(())
    });
    engine.register_fn("setMethod", |request: &mut RequestApi, method: &str| -> FnResult<()> {
        read_only(&request.state)?;
        let parsed: HttpMethod = method
            .parse()
            .map_err(|err: crate::error::ValidationError| err.to_string())?;
        let mut state = request.state.borrow_mut();
        state.request.method = parsed.as_str().to_owned();
        state.request_override.method = Some(parsed.as_str().to_owned());
        Ok(())
    });
    engine.register_fn(
        "setHeader",
        |request: &mut RequestApi, name: &str, value: Dynamic| -> FnResult<()> {
            read_only(&request.state)?;
            let value = display(&value);
            let mut state = request.state.borrow_mut();
            state
                .request
                .headers
                .retain(|(key, _)| !key.eq_ignore_ascii_case(name));
            state.request.headers.push((name.to_owned(), value.clone()));
            state
                .request_override
                .removed_headers
                .retain(|key| !key.eq_ignore_ascii_case(name));
            state
                .request_override
                .headers
                .retain(|(key, _)| !key.eq_ignore_ascii_case(name));
            state.request_override.headers.push((name.to_owned(), value));
            Ok(())
        },
    );
    engine.register_fn("removeHeader", |request: &mut RequestApi, name: &str| -> FnResult<()> {
        read_only(&request.state)?;
        let mut state = request.state.borrow_mut();
        state
            .request
            .headers
            .retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        state
            .request_override
            .headers
            .retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        state.request_override.removed_headers.push(name.to_owned());
        Ok(())
    });
    engine.register_fn(
        "addQueryParam",
        |request: &mut RequestApi, key: &str, value: Dynamic| -> FnResult<()> {
            read_only(&request.state)?;
            let value = display(&value);
            let mut state = request.state.borrow_mut();
            let pair = url::form_urlencoded::Serializer::new(String::new())
                .append_pair(key, &value)
                .finish();
            let separator = if state.request.url.contains('?') { '&' } else { '?' };
            state.request.url.push(separator);
            state.request.url.push_str(&pair);
            state.request_override.query.push((key.to_owned(), value));
            Ok(())
        },
    );
    engine.register_fn("setBody", |request: &mut RequestApi, body: Dynamic| -> FnResult<()> {
        read_only(&request.state)?;
        let body = display(&body);
        let mut state = request.state.borrow_mut();
        state.request.body = Some(body.clone());
        state.request_override.body = Some(body);
        Ok(())
    });

    engine.register_fn("get", |headers: &mut HeadersApi, name: &str| optional(headers.get(name)));
    engine.register_fn("has", |headers: &mut HeadersApi, name: &str| {
        !headers.values(name).is_empty()
    });
    engine.register_fn("toObject", |headers: &mut HeadersApi| headers.to_map());
}

fn response_field<T>(state: &Shared, read: impl FnOnce(&super::ScriptResponse) -> T) -> FnResult<T> {
    let state = state.borrow();
    let response = state
        .response
        .as_ref()
        .ok_or_else(|| Box::<EvalAltResult>::from("no response is available"))?;
    Ok(read(response))
}

fn response_json(state: &Shared) -> FnResult<Value> {
    let mut guard = state.borrow_mut();
    let state = &mut *guard;
    let parsed = state.response_json.get_or_insert_with(|| match state.response.as_ref() {
        Some(response) => {
            serde_json::from_str(&response.response.raw_text).map_err(|err| err.to_string())
        }
        None => Err("no response is available".to_owned()),
    });
    match parsed {
        Ok(value) => Ok(value.clone()),
        Err(message) => Err(format!("response body is not valid JSON: {}", message).into()),
    }
}

fn register_response(engine: &mut Engine) {
    engine.register_get("code", |response: &mut ResponseApi| {
        response_field(&response.state, |data| INT::from(data.response.status))
    });
    engine.register_get("status", |response: &mut ResponseApi| {
        response_field(&response.state, |data| data.response.status_text.clone())
    });
    engine.register_get("responseTime", |response: &mut ResponseApi| {
        response_field(&response.state, |data| to_int(data.elapsed_ms))
    });
    engine.register_get("headers", |response: &mut ResponseApi| HeadersApi {
        state: response.state.clone(),
        source: HeaderSource::Response,
    });
    engine.register_fn("text", |response: &mut ResponseApi| {
        response_field(&response.state, |data| data.response.raw_text.clone())
    });
    engine.register_fn("json", |response: &mut ResponseApi| -> FnResult<Dynamic> {
        Ok(from_json(&response_json(&response.state)?))
    });

    engine.register_get("to", |response: &mut ResponseApi| ResponseAssert {
        state: response.state.clone(),
    });
    for link in ["have", "be", "and"] {
        engine.register_get(link, |assert: &mut ResponseAssert| assert.clone());
    }
    engine.register_fn("status", |assert: &mut ResponseAssert, expected: INT| -> FnResult<()> {
        let actual = response_field(&assert.state, |data| INT::from(data.response.status))?;
        if actual != expected {
            return Err(format!("expected response to have status {} but got {}", expected, actual).into());
        }
        Ok(())
    });
    engine.register_fn("header", |assert: &mut ResponseAssert, name: &str| -> FnResult<()> {
        let headers = HeadersApi {
            state: assert.state.clone(),
            source: HeaderSource::Response,
        };
        if headers.get(name).is_none() {
            return Err(format!("expected response to have header {}", name).into());
        }
        Ok(())
    });
    engine.register_fn(
        "header",
        |assert: &mut ResponseAssert, name: &str, expected: Dynamic| -> FnResult<()> {
            let headers = HeadersApi {
                state: assert.state.clone(),
                source: HeaderSource::Response,
            };
            let expected = display(&expected);
            match headers.get(name) {
                Some(actual) if actual == expected => Ok(()),
                Some(actual) => Err(format!(
                    "expected header {} to be '{}' but got '{}'",
                    name, expected, actual
                )
                .into()),
                None => Err(format!("expected response to have header {}", name).into()),
            }
        },
    );
    engine.register_fn("jsonPath", |assert: &mut ResponseAssert, path: &str| -> FnResult<()> {
        let json = response_json(&assert.state)?;
        if lookup_path(&json, path).is_none() {
            return Err(format!("expected response to have JSON path '{}'", path).into());
        }
        Ok(())
    });
    engine.register_fn(
        "jsonPath",
        |assert: &mut ResponseAssert, path: &str, expected: Dynamic| -> FnResult<()> {
            let json = response_json(&assert.state)?;
            let expected = to_json(&expected);
            match lookup_path(&json, path) {
                Some(actual) if json_loose_eq(actual, &expected) => Ok(()),
                Some(actual) => Err(format!(
                    "expected JSON path '{}' to be {} but got {}",
                    path, expected, actual
                )
                .into()),
                None => Err(format!("expected response to have JSON path '{}'", path).into()),
            }
        },
    );
}

fn register_console(engine: &mut Engine) {
    for (name, level) in [
        ("log", LogLevel::Log),
        ("info", LogLevel::Info),
        ("warn", LogLevel::Warn),
        ("error", LogLevel::Error),
    ] {
        engine.register_fn(name, move |console: &mut Console| console.write(level, &[]));
        engine.register_fn(name, move |console: &mut Console, a: Dynamic| {
            console.write(level, &[a]);
        });
        engine.register_fn(name, move |console: &mut Console, a: Dynamic, b: Dynamic| {
            console.write(level, &[a, b]);
        });
        engine.register_fn(
            name,
            move |console: &mut Console, a: Dynamic, b: Dynamic, c: Dynamic| {
                console.write(level, &[a, b, c]);
            },
        );
        engine.register_fn(
            name,
            move |console: &mut Console, a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| {
                console.write(level, &[a, b, c, d]);
            },
        );
    }
}
