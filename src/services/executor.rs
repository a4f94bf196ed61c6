//! Builds, sends and normalizes one authenticated platform request.

use crate::constants::content::JSON;
use crate::constants::limits::{ERROR_BODY_LENGTH, LOG_BODY_LENGTH};
use crate::constants::network::{REQUEST_TIMEOUT_ENV, SUCCESS_STATUS, TOKEN_PARAM};
use crate::errors::ToolError;
use crate::services::auth::Authenticator;
use crate::services::host::{AuthType, ConnectionDescriptor};
use crate::services::logger::Logger;
use crate::services::transport::{HttpMethod, HttpTransport, TransportRequest, TransportResponse};
use crate::utils::redact::{redact_object, redact_text};
use crate::utils::text::body_fragment;
use crate::utils::url::request_url;
use base64::Engine;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub path: String,
    pub query_params: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub headers: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl RequestSpec {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query_params: BTreeMap::new(),
            body: None,
            headers: BTreeMap::new(),
            timeout: None,
        }
    }

    /// Parses a free-form method name; unsupported verbs are rejected here,
    /// before anything touches the network.
    pub fn parse(method: &str, path: impl Into<String>) -> Result<Self, ToolError> {
        Ok(Self::new(method.parse()?, path))
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    pub fn with_query_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.query_params.extend(params);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_serialized_body<T: Serialize>(self, body: &T) -> Result<Self, ToolError> {
        let value = serde_json::to_value(body).map_err(|err| {
            ToolError::validation(format!("'data' must be JSON-serializable: {}", err))
        })?;
        Ok(self.with_body(value))
    }

    pub fn with_header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.insert(key.to_lowercase(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        for (key, value) in headers {
            self.headers.insert(key.to_lowercase(), value);
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestResult {
    pub changed: bool,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed_time: Duration,
    #[serde(rename = "json", skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    pub status_code: u16,
}

impl RequestResult {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn serialize_secs<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

#[derive(Clone)]
pub struct RequestExecutor {
    logger: Logger,
    authenticator: Authenticator,
    transport: Arc<dyn HttpTransport>,
    default_timeout: Option<Duration>,
}

impl RequestExecutor {
    pub fn new(logger: Logger, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            authenticator: Authenticator::new(logger.clone(), transport.clone()),
            logger: logger.child("executor"),
            transport,
            default_timeout: default_timeout_from_env(),
        }
    }

    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub async fn execute(
        &self,
        descriptor: &ConnectionDescriptor,
        spec: RequestSpec,
    ) -> Result<RequestResult, ToolError> {
        if spec.path.trim().is_empty() {
            return Err(ToolError::validation("'path' must be provided."));
        }
        if spec.query_params.keys().any(|key| key.trim().is_empty()) {
            return Err(ToolError::validation("query parameter names must not be empty"));
        }
        let body = spec
            .body
            .as_ref()
            .filter(|body| !body.is_null())
            .map(serde_json::to_string)
            .transpose()
            .map_err(|err| {
                ToolError::validation(format!("'data' must be JSON-serializable: {}", err))
            })?;
        let url = request_url(descriptor, &spec.path)?;
        let method = spec.method;
        let timeout = spec.timeout.or(self.default_timeout);

        let mut query = spec.query_params;
        let mut headers = descriptor.headers.clone();
        headers.insert("content-type".to_string(), JSON.to_string());
        headers.insert("accept".to_string(), JSON.to_string());

        if !query.contains_key(TOKEN_PARAM) {
            if descriptor.auth_type == Some(AuthType::Basic) {
                headers.insert("authorization".to_string(), basic_auth_header(descriptor)?);
            } else {
                let token = self
                    .authenticator
                    .authenticate_with_timeout(descriptor, timeout)
                    .await?;
                query.insert(TOKEN_PARAM.to_string(), token);
            }
        }

        for (key, value) in spec.headers {
            headers.insert(key.to_lowercase(), value);
        }

        self.logger.trace(
            "API Request",
            Some(&redact_object(
                &serde_json::json!({
                    "method": method.as_str(),
                    "url": url,
                    "headers": headers,
                    "params": query,
                    "data": body,
                }),
                LOG_BODY_LENGTH,
            )),
        );

        let started = Instant::now();
        let response = self
            .transport
            .send(TransportRequest {
                method,
                url: url.clone(),
                headers,
                query,
                body,
                timeout,
                verify: descriptor.verify,
                disable_warnings: descriptor.disable_warnings,
            })
            .await
            .map_err(|mut err| {
                err.message = format!(
                    "HTTP request failed: {} | Method: {} | URL: {}",
                    err.message, method, url
                );
                err
            })?;
        let elapsed_time = started.elapsed();

        self.logger.trace(
            "API Response",
            Some(&serde_json::json!({
                "status_code": response.status,
                "headers": response.headers,
                "body": redact_text(&response.body, LOG_BODY_LENGTH),
            })),
        );

        let parsed = normalize_response(method, &url, &response)?;
        self.logger.debug(
            "Request completed",
            Some(&serde_json::json!({
                "method": method.as_str(),
                "url": url,
                "status_code": response.status,
                "elapsed_ms": elapsed_time.as_millis() as u64,
            })),
        );

        Ok(RequestResult {
            changed: false,
            elapsed_time,
            body: Some(parsed),
            status_code: response.status,
        })
    }
}

fn normalize_response(
    method: HttpMethod,
    url: &str,
    response: &TransportResponse,
) -> Result<Value, ToolError> {
    let fragment = || body_fragment(&redact_text(&response.body, usize::MAX), ERROR_BODY_LENGTH);

    if response.status != SUCCESS_STATUS {
        return Err(ToolError::api(
            response.status,
            response.body.clone(),
            format!(
                "HTTP request failed: {} {} | Method: {} | URL: {}",
                response.status,
                fragment(),
                method,
                url
            ),
        ));
    }

    if response.body.trim().is_empty() {
        return Err(ToolError::empty_response(format!(
            "Empty response body | Method: {} | URL: {}",
            method, url
        ))
        .with_status(response.status));
    }

    let content_type = response.content_type().unwrap_or("").trim();
    if !content_type.to_lowercase().starts_with(JSON) {
        let shown = if content_type.is_empty() {
            "none"
        } else {
            content_type
        };
        return Err(ToolError::unsupported_content_type(
            response.body.clone(),
            format!("Unexpected content type: {} | Response: {}", shown, fragment()),
        )
        .with_status(response.status));
    }

    serde_json::from_str::<Value>(&response.body).map_err(|_| {
        ToolError::decode(
            response.body.clone(),
            format!("Failed to parse JSON response: {}", fragment()),
        )
        .with_status(response.status)
    })
}

fn basic_auth_header(descriptor: &ConnectionDescriptor) -> Result<String, ToolError> {
    let (Some(username), Some(password)) =
        (descriptor.username.as_ref(), descriptor.password.as_ref())
    else {
        return Err(ToolError::authentication(
            "missing required property: username or password",
        ));
    };
    let encoded = base64::engine::general_purpose::STANDARD
        .encode(format!("{}:{}", username, password).as_bytes());
    Ok(format!("Basic {}", encoded))
}

fn default_timeout_from_env() -> Option<Duration> {
    std::env::var(REQUEST_TIMEOUT_ENV)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}
