mod common;
use common::{hostvars, hostvars_with, http_executor, recording_executor, RecordingTransport};

use httpmock::prelude::*;
use platform_tasks::errors::{ToolError, ToolErrorKind};
use platform_tasks::services::executor::RequestSpec;
use platform_tasks::services::host::{AuthType, ConnectionDescriptor};
use platform_tasks::services::transport::HttpMethod;
use std::time::Duration;

#[tokio::test]
async fn health_request_logs_in_and_passes_token_as_query_param() {
    let server = MockServer::start();
    let login = server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(200).body("tok-123");
    });
    let health = server.mock(|when, then| {
        when.method(GET)
            .path("/health/system")
            .query_param("token", "tok-123")
            .header("accept", "application/json");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(serde_json::json!({"status": "running"}));
    });

    let descriptor = ConnectionDescriptor::resolve(&hostvars(server.port())).expect("descriptor");
    let result = http_executor()
        .execute(&descriptor, RequestSpec::get("/health/system"))
        .await
        .expect("health result");

    assert!(!result.changed);
    assert_eq!(result.status_code, 200);
    assert_eq!(result.body, Some(serde_json::json!({"status": "running"})));
    let value = result.to_value();
    assert_eq!(value["changed"], false);
    assert_eq!(value["json"]["status"], "running");
    assert!(value["elapsed_time"].as_f64().unwrap_or(-1.0) >= 0.0);
    login.assert();
    health.assert();
}

#[tokio::test]
async fn caller_supplied_token_skips_login() {
    let server = MockServer::start();
    let login = server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(200).body("unused");
    });
    let jobs = server.mock(|when, then| {
        when.method(GET)
            .path("/operations-manager/jobs")
            .query_param("token", "mine");
        then.status(200)
            .header("content-type", "application/json; charset=utf-8")
            .body("[]");
    });

    let descriptor = ConnectionDescriptor::resolve(&hostvars(server.port())).expect("descriptor");
    let result = http_executor()
        .execute(
            &descriptor,
            RequestSpec::get("/operations-manager/jobs").with_query("token", "mine"),
        )
        .await
        .expect("jobs");

    assert_eq!(result.body, Some(serde_json::json!([])));
    assert_eq!(login.calls(), 0);
    jobs.assert();
}

#[tokio::test]
async fn non_success_status_is_an_api_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(200).body("tok");
    });
    server.mock(|when, then| {
        when.method(GET).path("/adapters");
        then.status(404)
            .header("content-type", "application/json")
            .body("{\"message\":\"not found\"}");
    });

    let descriptor = ConnectionDescriptor::resolve(&hostvars(server.port())).expect("descriptor");
    let err = http_executor()
        .execute(&descriptor, RequestSpec::get("/adapters"))
        .await
        .expect_err("404");

    assert_eq!(err.kind, ToolErrorKind::Api);
    assert_eq!(err.status, Some(404));
    assert!(err.message.contains("404"));
    assert!(err.message.contains("not found"));
    assert!(err.message.contains("Method: GET"));
}

#[tokio::test]
async fn base_path_prefixes_request_but_not_login() {
    let server = MockServer::start();
    let login = server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(200).body("tok");
    });
    let prefixed = server.mock(|when, then| {
        when.method(GET).path("/api/v2/health/server");
        then.status(200)
            .header("content-type", "application/json")
            .body("{}");
    });

    let vars = hostvars_with(
        server.port(),
        serde_json::json!({"platform_http_base_path": "/api/v2"}),
    );
    let descriptor = ConnectionDescriptor::resolve(&vars).expect("descriptor");
    http_executor()
        .execute(&descriptor, RequestSpec::get("health/server"))
        .await
        .expect("prefixed request");

    login.assert();
    prefixed.assert();
}

#[tokio::test]
async fn json_body_round_trips_to_the_server() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(200).body("tok");
    });
    let echo = server.mock(|when, then| {
        when.method(PUT)
            .path("/adapters/net/loglevel")
            .json_body(serde_json::json!({"properties": {"transport": "file", "level": "debug"}}));
        then.status(200)
            .header("content-type", "application/json")
            .body("{\"status\":\"OK\"}");
    });

    let descriptor = ConnectionDescriptor::resolve(&hostvars(server.port())).expect("descriptor");
    let spec = RequestSpec::put("/adapters/net/loglevel").with_body(serde_json::json!({
        "properties": {"transport": "file", "level": "debug"}
    }));
    let result = http_executor().execute(&descriptor, spec).await.expect("put");
    assert_eq!(result.body, Some(serde_json::json!({"status": "OK"})));
    echo.assert();
}

#[tokio::test]
async fn invalid_method_fails_before_network() {
    let err = RequestSpec::parse("INVALID", "/health/system").expect_err("invalid method");
    assert_eq!(err.kind, ToolErrorKind::Validation);
    assert!(err.message.contains("Invalid HTTP method"));
}

#[tokio::test]
async fn empty_body_is_rejected() {
    let transport = RecordingTransport::new();
    transport.push_token("tok");
    transport.push_text(200, "application/json", "  ");
    let descriptor = ConnectionDescriptor::new("h").with_credentials("admin", "secret");

    let err = recording_executor(transport.clone())
        .execute(&descriptor, RequestSpec::get("/health/system"))
        .await
        .expect_err("empty body");
    assert_eq!(err.kind, ToolErrorKind::EmptyResponse);
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn non_json_content_type_is_rejected() {
    let transport = RecordingTransport::new();
    transport.push_token("tok");
    transport.push_text(200, "text/html", "<html>login</html>");
    let descriptor = ConnectionDescriptor::new("h").with_credentials("admin", "secret");

    let err = recording_executor(transport)
        .execute(&descriptor, RequestSpec::get("/health/system"))
        .await
        .expect_err("html body");
    assert_eq!(err.kind, ToolErrorKind::Decode);
    assert_eq!(err.code, "UNSUPPORTED_CONTENT_TYPE");
    assert!(err.message.contains("text/html"));
}

#[tokio::test]
async fn malformed_json_is_a_decode_error() {
    let transport = RecordingTransport::new();
    transport.push_token("tok");
    transport.push_text(200, "application/json", "{not json");
    let descriptor = ConnectionDescriptor::new("h").with_credentials("admin", "secret");

    let err = recording_executor(transport)
        .execute(&descriptor, RequestSpec::get("/health/system"))
        .await
        .expect_err("bad json");
    assert_eq!(err.kind, ToolErrorKind::Decode);
    assert_eq!(err.code, "DECODE_ERROR");
    assert_eq!(err.body.as_deref(), Some("{not json"));
}

#[tokio::test]
async fn login_failure_stops_the_request() {
    let transport = RecordingTransport::new();
    transport.push_text(401, "text/plain", "denied");
    let descriptor = ConnectionDescriptor::new("h").with_credentials("admin", "wrong");

    let err = recording_executor(transport.clone())
        .execute(&descriptor, RequestSpec::get("/health/system"))
        .await
        .expect_err("login rejected");
    assert_eq!(err.kind, ToolErrorKind::Authentication);
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn transport_failure_names_method_and_url() {
    let transport = RecordingTransport::new();
    transport.push_token("tok");
    transport.push_error(ToolError::transport("connection reset"));
    let descriptor = ConnectionDescriptor::new("h").with_credentials("admin", "secret");

    let err = recording_executor(transport)
        .execute(&descriptor, RequestSpec::post("/workflow_engine/activate"))
        .await
        .expect_err("transport failure");
    assert_eq!(err.kind, ToolErrorKind::Transport);
    assert!(err.retryable);
    assert!(err.message.contains("connection reset"));
    assert!(err.message.contains("Method: POST"));
    assert!(err.message.contains("http://h/workflow_engine/activate"));
}

#[tokio::test]
async fn basic_auth_sends_authorization_header_without_login() {
    let transport = RecordingTransport::new();
    transport.push_json(200, serde_json::json!({"ok": true}));
    let descriptor = ConnectionDescriptor::new("h")
        .with_credentials("admin", "secret")
        .with_auth_type(AuthType::Basic);

    recording_executor(transport.clone())
        .execute(&descriptor, RequestSpec::get("/health/status"))
        .await
        .expect("basic auth request");

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].headers.get("authorization").map(String::as_str),
        Some("Basic YWRtaW46c2VjcmV0")
    );
    assert!(!requests[0].query.contains_key("token"));
}

#[tokio::test]
async fn headers_merge_with_request_overrides() {
    let transport = RecordingTransport::new();
    transport.push_token("tok");
    transport.push_json(200, serde_json::json!({}));
    let descriptor = ConnectionDescriptor::new("h")
        .with_credentials("admin", "secret")
        .with_header("X-Tenant", "acme")
        .with_header("X-Trace", "host");

    let spec = RequestSpec::get("/health/system").with_header("X-Trace", "request");
    recording_executor(transport.clone())
        .execute(&descriptor, spec)
        .await
        .expect("request");

    let requests = transport.requests();
    let sent = &requests[1];
    assert_eq!(sent.method, HttpMethod::Get);
    assert_eq!(sent.headers.get("x-tenant").map(String::as_str), Some("acme"));
    assert_eq!(sent.headers.get("x-trace").map(String::as_str), Some("request"));
    assert_eq!(sent.query.get("token").map(String::as_str), Some("tok"));
}

#[tokio::test]
async fn env_default_timeout_applies_and_request_timeout_wins() {
    let _guard = common::ENV_LOCK.lock().await;
    std::env::set_var("PLATFORM_REQUEST_TIMEOUT_MS", "1500");
    let transport = RecordingTransport::new();
    let executor =
        platform_tasks::services::executor::RequestExecutor::new(common::quiet_logger(), transport.clone());
    std::env::remove_var("PLATFORM_REQUEST_TIMEOUT_MS");

    assert_eq!(executor.default_timeout(), Some(Duration::from_millis(1500)));
    let descriptor = ConnectionDescriptor::new("h").with_credentials("admin", "secret");

    transport.push_token("tok");
    transport.push_json(200, serde_json::json!({}));
    executor
        .execute(&descriptor, RequestSpec::get("/health/system"))
        .await
        .expect("env default");

    transport.push_token("tok");
    transport.push_json(200, serde_json::json!({}));
    executor
        .execute(
            &descriptor,
            RequestSpec::get("/health/system").with_timeout(Some(Duration::from_secs(7))),
        )
        .await
        .expect("request timeout");

    let timeouts: Vec<Option<Duration>> =
        transport.requests().iter().map(|r| r.timeout).collect();
    assert_eq!(
        timeouts,
        vec![
            Some(Duration::from_millis(1500)),
            Some(Duration::from_millis(1500)),
            Some(Duration::from_secs(7)),
            Some(Duration::from_secs(7)),
        ]
    );
}

#[tokio::test]
async fn unset_env_timeout_means_no_timeout() {
    let _guard = common::ENV_LOCK.lock().await;
    std::env::remove_var("PLATFORM_REQUEST_TIMEOUT_MS");
    let executor = platform_tasks::services::executor::RequestExecutor::new(
        common::quiet_logger(),
        RecordingTransport::new(),
    );
    assert_eq!(executor.default_timeout(), None);
}

#[tokio::test]
async fn tls_flags_reach_login_and_request() {
    let transport = RecordingTransport::new();
    transport.push_token("tok");
    transport.push_json(200, serde_json::json!({}));
    let vars = hostvars_with(
        443,
        serde_json::json!({
            "platform_https": true,
            "platform_http_verify": false,
            "platform_http_disable_warnings": true,
        }),
    );
    let descriptor = ConnectionDescriptor::resolve(&vars).expect("descriptor");

    recording_executor(transport.clone())
        .execute(&descriptor, RequestSpec::get("/health/system"))
        .await
        .expect("request");

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert!(!request.verify);
        assert!(request.disable_warnings);
        assert!(request.url.starts_with("https://127.0.0.1:443/"));
    }
}
