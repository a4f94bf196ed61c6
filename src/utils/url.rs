use crate::constants::network::LOGIN_PATH;
use crate::constants::protocols::ALLOWED_HTTP;
use crate::errors::ToolError;
use crate::services::host::ConnectionDescriptor;
use url::Url;

/// Absolute request URL: origin, optional base path, then the request path.
pub fn request_url(descriptor: &ConnectionDescriptor, path: &str) -> Result<String, ToolError> {
    let joined = join_path(descriptor.base_path.as_deref(), path);
    let raw = format!("{}{}", descriptor.origin(), joined);
    validate_url(&raw)?;
    Ok(raw)
}

/// Login never takes the base path into account.
pub fn login_url(descriptor: &ConnectionDescriptor) -> Result<String, ToolError> {
    let raw = format!("{}{}", descriptor.origin(), LOGIN_PATH);
    validate_url(&raw)?;
    Ok(raw)
}

pub fn join_path(base_path: Option<&str>, path: &str) -> String {
    let mut out = String::new();
    if let Some(base) = base_path.map(str::trim).filter(|b| !b.is_empty()) {
        let base = base.trim_end_matches('/');
        if !base.starts_with('/') {
            out.push('/');
        }
        out.push_str(base);
    }
    let path = path.trim();
    if !path.starts_with('/') {
        out.push('/');
    }
    out.push_str(path);
    out
}

pub fn validate_url(raw: &str) -> Result<Url, ToolError> {
    if raw.chars().any(char::is_whitespace) {
        return Err(ToolError::validation(format!(
            "Invalid URL '{}': must not contain whitespace",
            raw
        )));
    }
    let parsed = Url::parse(raw)
        .map_err(|err| ToolError::validation(format!("Invalid URL '{}': {}", raw, err)))?;
    if !scheme_allowed(parsed.scheme()) {
        return Err(ToolError::validation(format!(
            "Invalid URL '{}': only http/https URLs are supported",
            raw
        )));
    }
    if parsed.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(ToolError::validation(format!(
            "Invalid URL '{}': missing host",
            raw
        )));
    }
    Ok(parsed)
}

fn scheme_allowed(scheme: &str) -> bool {
    ALLOWED_HTTP.iter().any(|allowed| *allowed == scheme)
}
