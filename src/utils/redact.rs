use crate::utils::text::truncate_utf8_prefix;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

const DEFAULT_REDACTION: &str = "[REDACTED]";

static SENSITIVE_KEYS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "password",
        "passphrase",
        "secret",
        "token",
        "api_key",
        "auth_token",
        "platform_auth_token",
        "authorization",
        "proxy-authorization",
        "cookie",
        "x-auth-token",
    ]
    .into_iter()
    .collect()
});

static INLINE_REDACTION_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"([?&]token=)[^&\s#)]+").expect("inline redaction regex"),
            "${1}***REDACTED***",
        ),
        (
            Regex::new(r"\b(Bearer|Basic)\s+([A-Za-z0-9._~+/=-]{6,})").expect("inline redaction regex"),
            "$1 ***REDACTED***",
        ),
        (
            Regex::new(r#""password"\s*:\s*"[^"]*""#).expect("inline redaction regex"),
            r#""password":"***REDACTED***""#,
        ),
    ]
});

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = normalize_key(key);
    if normalized.is_empty() {
        return false;
    }
    SENSITIVE_KEYS.contains(normalized.as_str())
        || normalized.contains("secret")
        || normalized.contains("token")
        || normalized.contains("password")
}

fn truncate_string(value: &str, max_length: usize) -> String {
    if max_length == usize::MAX || value.len() <= max_length {
        return value.to_string();
    }
    format!("{}...", truncate_utf8_prefix(value, max_length))
}

pub fn redact_text(value: &str, max_string: usize) -> String {
    let mut out = value.to_string();
    for (re, replacement) in INLINE_REDACTION_PATTERNS.iter() {
        if re.is_match(&out) {
            out = re.replace_all(&out, *replacement).to_string();
        }
    }
    truncate_string(&out, max_string)
}

pub fn redact_object(value: &Value, max_string: usize) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(text) => Value::String(redact_text(text, max_string)),
        Value::Bool(_) | Value::Number(_) => value.clone(),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| redact_object(item, max_string))
                .collect(),
        ),
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (key, entry) in map.iter() {
                if is_sensitive_key(key) {
                    out.insert(key.clone(), Value::String(DEFAULT_REDACTION.to_string()));
                    continue;
                }
                out.insert(key.clone(), redact_object(entry, max_string));
            }
            Value::Object(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{redact_object, redact_text};
    use serde_json::json;

    #[test]
    fn redact_text_hides_token_query_param() {
        let text = "error sending request for url (http://h:3000/jobs?include=name&token=abc123)";
        let out = redact_text(text, usize::MAX);
        assert!(!out.contains("abc123"));
        assert!(out.contains("include=name"));
        assert!(out.contains("token=***REDACTED***"));
    }

    #[test]
    fn redact_object_hides_sensitive_keys() {
        let input = json!({
            "params": {"token": "abc", "equals[status]": "running"},
            "headers": {"Authorization": "Basic Zm9vOmJhcg==", "accept": "application/json"},
        });
        let out = redact_object(&input, usize::MAX);
        assert_eq!(out["params"]["token"], "[REDACTED]");
        assert_eq!(out["params"]["equals[status]"], "running");
        assert_eq!(out["headers"]["Authorization"], "[REDACTED]");
        assert_eq!(out["headers"]["accept"], "application/json");
    }

    #[test]
    fn redact_text_truncates_long_values() {
        let out = redact_text("abcdefgh", 4);
        assert_eq!(out, "abcd...");
    }
}
