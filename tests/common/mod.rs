#![allow(dead_code)]

use async_trait::async_trait;
use once_cell::sync::Lazy;
use platform_tasks::errors::ToolError;
use platform_tasks::services::executor::RequestExecutor;
use platform_tasks::services::logger::{LogLevel, Logger};
use platform_tasks::services::transport::{
    HttpTransport, ReqwestTransport, TransportRequest, TransportResponse,
};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

pub static ENV_LOCK: Lazy<AsyncMutex<()>> = Lazy::new(|| AsyncMutex::new(()));

pub fn quiet_logger() -> Logger {
    Logger::with_level("test", LogLevel::Error)
}

/// Host variables pointing at a local mock server with login credentials.
pub fn hostvars(port: u16) -> Map<String, Value> {
    let value = serde_json::json!({
        "ansible_host": "127.0.0.1",
        "platform_port": port,
        "platform_username": "admin",
        "platform_password": "secret",
    });
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

pub fn hostvars_with(port: u16, extra: Value) -> Map<String, Value> {
    let mut vars = hostvars(port);
    if let Value::Object(extra) = extra {
        vars.extend(extra);
    }
    vars
}

pub fn http_executor() -> RequestExecutor {
    let logger = quiet_logger();
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(logger.clone()));
    RequestExecutor::new(logger, transport).with_default_timeout(None)
}

/// Transport that records every request and replays canned responses in
/// order. An exhausted queue answers `200 {}`.
#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<TransportRequest>>,
    responses: Mutex<VecDeque<Result<TransportResponse, ToolError>>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_text(&self, status: u16, content_type: &str, body: &str) {
        let mut headers = BTreeMap::new();
        if !content_type.is_empty() {
            headers.insert("content-type".to_string(), content_type.to_string());
        }
        self.responses.lock().unwrap().push_back(Ok(TransportResponse {
            status,
            headers,
            body: body.to_string(),
        }));
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push_text(status, "application/json", &body.to_string());
    }

    /// Login reply: the token is the raw response text.
    pub fn push_token(&self, token: &str) {
        self.push_text(200, "text/plain", token);
    }

    pub fn push_error(&self, err: ToolError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, ToolError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                let mut headers = BTreeMap::new();
                headers.insert("content-type".to_string(), "application/json".to_string());
                Ok(TransportResponse {
                    status: 200,
                    headers,
                    body: "{}".to_string(),
                })
            })
    }
}

pub fn recording_executor(transport: Arc<RecordingTransport>) -> RequestExecutor {
    RequestExecutor::new(quiet_logger(), transport).with_default_timeout(None)
}
