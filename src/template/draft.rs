use serde_json::Value;

use super::render::{ResolveMeta, resolve_str};
use crate::domain::{Auth, Check, KeyValue, RequestBody, RequestDraft, TestDefinition, VarMap};

struct Resolver<'vars, 'meta> {
    vars: &'vars VarMap,
    meta: Option<&'meta mut ResolveMeta>,
}

impl Resolver<'_, '_> {
    fn text(&mut self, input: &str) -> String {
        resolve_str(input, self.vars, self.meta.as_deref_mut())
    }

    fn opt_text(&mut self, input: Option<&String>) -> Option<String> {
        input.map(|value| self.text(value))
    }

    fn pairs(&mut self, pairs: &[KeyValue]) -> Vec<KeyValue> {
        pairs
            .iter()
            .map(|pair| KeyValue {
                key: self.text(&pair.key),
                value: self.text(&pair.value),
                enabled: pair.enabled,
            })
            .collect()
    }

    fn json(&mut self, value: &Value) -> Value {
        match value {
            Value::String(text) => Value::String(self.text(text)),
            Value::Array(items) => Value::Array(items.iter().map(|item| self.json(item)).collect()),
            Value::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, item)| (self.text(key), self.json(item)))
                    .collect(),
            ),
            Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
        }
    }

    fn body(&mut self, body: &RequestBody) -> RequestBody {
        match body {
            RequestBody::None => RequestBody::None,
            RequestBody::Raw {
                content,
                content_type,
            } => RequestBody::Raw {
                content: self.text(content),
                content_type: self.opt_text(content_type.as_ref()),
            },
            RequestBody::Json { json } => RequestBody::Json {
                json: self.json(json),
            },
            RequestBody::Form { fields } => RequestBody::Form {
                fields: self.pairs(fields),
            },
        }
    }

    fn auth(&mut self, auth: &Auth) -> Auth {
        match auth {
            Auth::None => Auth::None,
            Auth::Bearer { token } => Auth::Bearer {
                token: self.text(token),
            },
            Auth::Basic { username, password } => Auth::Basic {
                username: self.text(username),
                password: self.text(password),
            },
            Auth::ApiKey {
                key,
                value,
                placement,
            } => Auth::ApiKey {
                key: self.text(key),
                value: self.text(value),
                placement: *placement,
            },
        }
    }

    fn test(&mut self, test: &TestDefinition) -> TestDefinition {
        TestDefinition {
            enabled: test.enabled,
            name: self.opt_text(test.name.as_ref()),
            check: self.check(&test.check),
        }
    }

    fn check(&mut self, check: &Check) -> Check {
        match check {
            Check::StatusEquals { .. }
            | Check::StatusOneOf { .. }
            | Check::ResponseTimeBelow { .. }
            | Check::Unknown { .. } => check.clone(),
            Check::StatusRange { expected } => Check::StatusRange {
                expected: self.text(expected),
            },
            Check::HeaderExists { header } => Check::HeaderExists {
                header: self.text(header),
            },
            Check::HeaderEquals { header, expected } => Check::HeaderEquals {
                header: self.text(header),
                expected: self.text(expected),
            },
            Check::HeaderContains { header, expected } => Check::HeaderContains {
                header: self.text(header),
                expected: self.text(expected),
            },
            Check::JsonExists { path } => Check::JsonExists {
                path: self.text(path),
            },
            Check::JsonEquals { path, expected } => Check::JsonEquals {
                path: self.text(path),
                expected: self.json(expected),
            },
            Check::JsonContains { path, expected } => Check::JsonContains {
                path: self.text(path),
                expected: self.json(expected),
            },
            Check::JsonType { path, expected } => Check::JsonType {
                path: self.text(path),
                expected: *expected,
            },
            Check::JsonNotEmpty { path } => Check::JsonNotEmpty {
                path: self.text(path),
            },
            Check::RequiredFields { fields } => Check::RequiredFields {
                fields: fields.iter().map(|field| self.text(field)).collect(),
            },
            Check::BodyContains { expected } => Check::BodyContains {
                expected: self.text(expected),
            },
        }
    }
}

/// Resolves every string (and every JSON object key) reachable from the
/// draft: url, params, headers, body, auth, scripts and test definitions.
/// The request name and its data rows are left as they are.
#[must_use]
pub fn resolve_draft(
    draft: &RequestDraft,
    vars: &VarMap,
    meta: Option<&mut ResolveMeta>,
) -> RequestDraft {
    let mut resolver = Resolver { vars, meta };
    RequestDraft {
        name: draft.name.clone(),
        method: draft.method,
        url: resolver.text(&draft.url),
        params: resolver.pairs(&draft.params),
        headers: resolver.pairs(&draft.headers),
        body: resolver.body(&draft.body),
        auth: resolver.auth(&draft.auth),
        tests: draft.tests.iter().map(|test| resolver.test(test)).collect(),
        pre_request_script: resolver.opt_text(draft.pre_request_script.as_ref()),
        post_response_script: resolver.opt_text(draft.post_response_script.as_ref()),
        mode: draft.mode,
        data: draft.data.clone(),
    }
}
