use crate::errors::ToolError;
use crate::services::logger::Logger;
use crate::utils::redact::redact_text;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    fn to_reqwest(self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

impl FromStr for HttpMethod {
    type Err = ToolError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_uppercase();
        HttpMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == normalized)
            .ok_or_else(|| {
                let allowed: Vec<&str> = HttpMethod::ALL.iter().map(|m| m.as_str()).collect();
                ToolError::validation(format!(
                    "Invalid HTTP method '{}'. Allowed values: {}",
                    raw,
                    allowed.join(", ")
                ))
            })
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fully-built outbound call.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
    pub verify: bool,
    pub disable_warnings: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    pub status: u16,
    /// Header names are lowercase.
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl TransportResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, ToolError>;
}

pub struct ReqwestTransport {
    logger: Logger,
    clients: Mutex<HashMap<bool, Client>>,
}

impl ReqwestTransport {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger: logger.child("transport"),
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn get_client(&self, verify: bool) -> Result<Client, ToolError> {
        let mut guard = self
            .clients
            .lock()
            .map_err(|_| ToolError::internal("Failed to access HTTP client cache"))?;
        if let Some(existing) = guard.get(&verify) {
            return Ok(existing.clone());
        }
        let mut builder = Client::builder();
        if !verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder
            .build()
            .map_err(|err| ToolError::internal(format!("Failed to build HTTP client: {}", err)))?;
        guard.insert(verify, client.clone());
        Ok(client)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, ToolError> {
        if !request.verify && !request.disable_warnings && request.url.starts_with("https:") {
            self.logger.warn(
                "Unverified HTTPS request is being made; certificate verification is disabled",
                Some(&serde_json::json!({"url": request.url})),
            );
        }

        let client = self.get_client(request.verify)?;
        let mut req = client
            .request(request.method.to_reqwest(), request.url.as_str())
            .headers(headers_to_headermap(&request.headers)?);
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        if let Some(body) = request.body {
            req = req.body(body);
        }
        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        let response = req.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let mut headers = BTreeMap::new();
        for (key, value) in response.headers() {
            if let Ok(text) = value.to_str() {
                headers.insert(key.as_str().to_lowercase(), text.to_string());
            }
        }
        let body = response.text().await.map_err(map_reqwest_error)?;
        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ToolError {
    let message = redact_text(&err.to_string(), usize::MAX);
    if err.is_timeout() {
        return ToolError::timeout(format!("Request timed out: {}", message));
    }
    ToolError::transport(message)
}

fn headers_to_headermap(headers: &BTreeMap<String, String>) -> Result<HeaderMap, ToolError> {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| ToolError::validation(format!("Invalid header name: {}", key)))?;
        let val = HeaderValue::from_str(value)
            .map_err(|_| ToolError::validation(format!("Invalid value for header {}", key)))?;
        map.insert(name, val);
    }
    Ok(map)
}
