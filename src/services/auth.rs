use crate::constants::content::JSON;
use crate::constants::limits::LOG_BODY_LENGTH;
use crate::constants::network::SUCCESS_STATUS;
use crate::errors::ToolError;
use crate::services::host::ConnectionDescriptor;
use crate::services::logger::Logger;
use crate::services::transport::{HttpMethod, HttpTransport, TransportRequest};
use crate::utils::redact::redact_text;
use crate::utils::url::login_url;
use std::sync::Arc;
use std::time::Duration;

/// Obtains the token that authorizes platform requests.
#[derive(Clone)]
pub struct Authenticator {
    logger: Logger,
    transport: Arc<dyn HttpTransport>,
}

impl Authenticator {
    pub fn new(logger: Logger, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            logger: logger.child("auth"),
            transport,
        }
    }

    pub async fn authenticate(&self, descriptor: &ConnectionDescriptor) -> Result<String, ToolError> {
        self.authenticate_with_timeout(descriptor, None).await
    }

    /// Same as `authenticate`, with the login round trip bounded by `timeout`.
    pub async fn authenticate_with_timeout(
        &self,
        descriptor: &ConnectionDescriptor,
        timeout: Option<Duration>,
    ) -> Result<String, ToolError> {
        if let Some(token) = descriptor.static_auth_token.as_ref() {
            self.logger.debug("Using configured platform_auth_token", None);
            return Ok(token.clone());
        }

        let (Some(username), Some(password)) =
            (descriptor.username.as_ref(), descriptor.password.as_ref())
        else {
            return Err(ToolError::authentication(
                "missing required property: username or password",
            ));
        };

        let url = login_url(descriptor)?;
        let body = serde_json::json!({
            "user": {
                "username": username,
                "password": password,
            }
        });

        let mut headers = descriptor.headers.clone();
        headers.insert("content-type".to_string(), JSON.to_string());
        headers.insert("accept".to_string(), JSON.to_string());

        self.logger.debug(
            "Login request",
            Some(&serde_json::json!({"url": url, "username": username})),
        );

        let response = self
            .transport
            .send(TransportRequest {
                method: HttpMethod::Post,
                url: url.clone(),
                headers,
                query: Default::default(),
                body: Some(body.to_string()),
                timeout,
                verify: descriptor.verify,
                disable_warnings: descriptor.disable_warnings,
            })
            .await
            .map_err(|err| {
                ToolError::authentication(format!("HTTP request failed: {}", err.message))
            })?;

        if response.status != SUCCESS_STATUS {
            self.logger.warn(
                "Login rejected",
                Some(&serde_json::json!({"url": url, "status": response.status})),
            );
            return Err(ToolError::authentication(format!(
                "Unexpected HTTP status code in response: {} {}",
                response.status,
                redact_text(&response.body, LOG_BODY_LENGTH)
            ))
            .with_status(response.status)
            .with_body(response.body));
        }

        Ok(response.body)
    }
}
