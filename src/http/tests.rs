use super::agent::decode_agent_reply;
use super::proxy::{ProxyReply, header_pairs};
use super::*;
use crate::domain::{
    ApiKeyPlacement, Auth, ExecutionMode, HttpMethod, KeyValue, RequestBody, RequestDraft,
};
use crate::error::{TransportError, ValidationError};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

#[test]
fn prepare_appends_enabled_params_and_auth() -> Result<(), String> {
    let mut draft = RequestDraft::new("list", HttpMethod::Get, "http://localhost:9000/users?x=1");
    draft.params.push(KeyValue::new("page", "2"));
    draft.params.push(KeyValue {
        enabled: false,
        ..KeyValue::new("skip", "me")
    });
    draft.params.push(KeyValue::new("q", "a b"));
    draft.headers.push(KeyValue::new("Accept", "application/json"));
    draft.auth = Auth::ApiKey {
        key: "api_key".to_owned(),
        value: "k1".to_owned(),
        placement: ApiKeyPlacement::Query,
    };
    draft.body = RequestBody::Raw {
        content: "ignored".to_owned(),
        content_type: None,
    };

    let prepared = prepare_request(&draft).map_err(|err| format!("{}", err))?;
    if prepared.url != "http://localhost:9000/users?x=1&page=2&q=a+b&api_key=k1" {
        return Err(format!("Unexpected url {}", prepared.url));
    }
    if prepared.body.is_some() {
        return Err("GET must not carry a body".to_owned());
    }
    if prepared.header("accept") != Some("application/json") {
        return Err(format!("Unexpected headers {:?}", prepared.headers));
    }
    Ok(())
}

#[test]
fn prepare_encodes_basic_and_bearer_auth() -> Result<(), String> {
    let mut draft = RequestDraft::new("me", HttpMethod::Get, "http://localhost/me");
    draft.auth = Auth::Basic {
        username: "ada".to_owned(),
        password: "pw".to_owned(),
    };
    let prepared = prepare_request(&draft).map_err(|err| format!("{}", err))?;
    if prepared.header("Authorization") != Some("Basic YWRhOnB3") {
        return Err(format!("Unexpected basic header {:?}", prepared.headers));
    }

    draft.auth = Auth::Bearer {
        token: "t0k".to_owned(),
    };
    draft
        .headers
        .push(KeyValue::new("authorization", "Custom explicit"));
    let prepared = prepare_request(&draft).map_err(|err| format!("{}", err))?;
    if prepared.header("Authorization") != Some("Custom explicit") || prepared.headers.len() != 1 {
        return Err(format!("Explicit header should win: {:?}", prepared.headers));
    }
    Ok(())
}

#[test]
fn prepare_encodes_bodies_by_kind() -> Result<(), String> {
    let mut draft = RequestDraft::new("create", HttpMethod::Post, "http://localhost/items");
    draft.body = RequestBody::Json {
        json: json!({"name": "ada"}),
    };
    let prepared = prepare_request(&draft).map_err(|err| format!("{}", err))?;
    if prepared.body.as_deref() != Some("{\"name\":\"ada\"}")
        || prepared.header("content-type") != Some("application/json")
    {
        return Err(format!("Unexpected json request {:?}", prepared));
    }

    draft.body = RequestBody::Form {
        fields: vec![KeyValue::new("a", "1 2"), KeyValue::new("b", "&")],
    };
    let prepared = prepare_request(&draft).map_err(|err| format!("{}", err))?;
    if prepared.body.as_deref() != Some("a=1+2&b=%26") {
        return Err(format!("Unexpected form body {:?}", prepared.body));
    }

    draft.body = RequestBody::Json {
        json: Value::String("{\"id\": {{id}}}".to_owned()),
    };
    match prepare_request(&draft) {
        Err(ValidationError::InvalidJsonBody { .. }) => Ok(()),
        other => Err(format!("Expected unresolved JSON text to fail, got {:?}", other)),
    }
}

#[test]
fn prepare_rejects_bad_urls() -> Result<(), String> {
    let draft = RequestDraft::new("bad", HttpMethod::Get, "{{base}}/users");
    match prepare_request(&draft) {
        Err(ValidationError::InvalidUrl { url, .. }) if url == "{{base}}/users" => {}
        other => return Err(format!("Unexpected result {:?}", other)),
    }
    let draft = RequestDraft::new("empty", HttpMethod::Get, "");
    match prepare_request(&draft) {
        Err(ValidationError::EmptyUrl { .. }) => Ok(()),
        other => Err(format!("Unexpected result {:?}", other)),
    }
}

#[test]
fn relay_headers_accept_objects_and_pairs() -> Result<(), String> {
    let mut from_object = header_pairs(&json!({"X-A": "1", "Set-Cookie": ["a", "b"]}));
    from_object.sort();
    let expected = vec![
        ("Set-Cookie".to_owned(), "a, b".to_owned()),
        ("X-A".to_owned(), "1".to_owned()),
    ];
    if from_object != expected {
        return Err(format!("Unexpected headers {:?}", from_object));
    }
    let from_pairs = header_pairs(&json!([["X-A", "1"], ["bad"], ["X-B", 2]]));
    let expected = vec![
        ("X-A".to_owned(), "1".to_owned()),
        ("X-B".to_owned(), "2".to_owned()),
    ];
    if from_pairs != expected {
        return Err(format!("Unexpected headers {:?}", from_pairs));
    }
    Ok(())
}

#[test]
fn proxy_reply_normalizes() -> Result<(), String> {
    let reply: ProxyReply = serde_json::from_value(json!({
        "status": 404,
        "headers": {"content-type": "application/json"},
        "body": {"error": "missing"}
    }))
    .map_err(|err| format!("{}", err))?;
    let response = HttpResponse::from(reply);
    if response.status != 404
        || response.status_text != "Not Found"
        || response.raw_text != "{\"error\":\"missing\"}"
    {
        return Err(format!("Unexpected response {:?}", response));
    }
    Ok(())
}

#[test]
fn agent_reply_decodes_base64_and_failures() -> Result<(), String> {
    let response = decode_agent_reply(
        r#"{"ok": true, "result": {"status": 201, "statusText": "Created", "headers": {"x": "y"}, "body": "aGVsbG8=", "isBase64": true}}"#,
    )
    .map_err(|err| format!("{}", err))?;
    if response.raw_text != "hello" || response.status != 201 || response.status_text != "Created"
    {
        return Err(format!("Unexpected response {:?}", response));
    }

    match decode_agent_reply(r#"{"ok": false, "error": {"message": "agent offline"}}"#) {
        Err(TransportError::RelayFailed { message }) if message == "agent offline" => {}
        other => return Err(format!("Unexpected result {:?}", other)),
    }
    match decode_agent_reply("not json") {
        Err(TransportError::RelayPayload { .. }) => Ok(()),
        other => Err(format!("Unexpected result {:?}", other)),
    }
}

struct FixedTransport(u16);

#[async_trait]
impl Transport for FixedTransport {
    async fn execute(&self, _request: &PreparedRequest) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse::new(self.0, ""))
    }
}

#[test]
fn transport_set_selects_by_mode() -> Result<(), String> {
    run_async_test(async {
        let set = TransportSet::new(Arc::new(FixedTransport(200)))
            .with_agent(Arc::new(FixedTransport(202)));
        if set.for_mode(ExecutionMode::Proxy).is_some() {
            return Err("Proxy was never configured".to_owned());
        }
        let request = prepare_request(&RequestDraft::new("a", HttpMethod::Get, "http://x"))
            .map_err(|err| format!("{}", err))?;
        let agent = set
            .for_mode(ExecutionMode::Agent)
            .ok_or_else(|| "Missing agent transport".to_owned())?;
        let response = agent
            .execute(&request)
            .await
            .map_err(|err| format!("{}", err))?;
        if response.status != 202 {
            return Err(format!("Unexpected status {}", response.status));
        }
        Ok(())
    })
}

#[test]
fn direct_transport_reads_status_headers_and_body() -> Result<(), String> {
    run_async_test(async {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|err| format!("Failed to bind: {}", err))?;
        let addr = listener
            .local_addr()
            .map_err(|err| format!("Failed to read addr: {}", err))?;
        let server = tokio::spawn(async move {
            let (mut stream, _) = tokio::time::timeout(TEST_TIMEOUT, listener.accept())
                .await
                .map_err(|_err| "accept timed out".to_owned())?
                .map_err(|err| format!("accept failed: {}", err))?;
            let mut buf = vec![0_u8; 4096];
            let mut seen = Vec::new();
            while !seen.windows(4).any(|window| window == b"\r\n\r\n") {
                let read = stream
                    .read(&mut buf)
                    .await
                    .map_err(|err| format!("read failed: {}", err))?;
                if read == 0 {
                    break;
                }
                seen.extend_from_slice(buf.get(..read).unwrap_or_default());
            }
            let body = "{\"ok\":true}";
            let reply = format!(
                "HTTP/1.1 418 I'm a teapot\r\nContent-Type: application/json\r\nX-Seen: yes\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream
                .write_all(reply.as_bytes())
                .await
                .map_err(|err| format!("write failed: {}", err))?;
            Ok::<String, String>(String::from_utf8_lossy(&seen).into_owned())
        });

        let transport =
            DirectTransport::new(TEST_TIMEOUT).map_err(|err| format!("{}", err))?;
        let mut draft = RequestDraft::new("probe", HttpMethod::Get, format!("http://{}/probe", addr));
        draft.headers.push(KeyValue::new("X-Probe", "1"));
        let request = prepare_request(&draft).map_err(|err| format!("{}", err))?;
        let response = transport
            .execute(&request)
            .await
            .map_err(|err| format!("{}", err))?;
        let seen = server
            .await
            .map_err(|err| format!("server task failed: {}", err))??;

        if response.status != 418 || response.raw_text != "{\"ok\":true}" {
            return Err(format!("Unexpected response {:?}", response));
        }
        if !response
            .headers
            .iter()
            .any(|(name, value)| name == "x-seen" && value == "yes")
        {
            return Err(format!("Unexpected headers {:?}", response.headers));
        }
        if !seen.to_ascii_lowercase().contains("x-probe: 1") {
            return Err(format!("Server did not see probe header: {}", seen));
        }
        Ok(())
    })
}
