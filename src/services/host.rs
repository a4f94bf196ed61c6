//! Resolution of per-host variables into a typed connection descriptor.
//!
//! Every logical field lists the variable names it may be supplied under.
//! Names are tried in declared order and the first present, non-null value
//! wins. Variables that no field claims are ignored.

use crate::constants::limits::{MAX_PORT, MIN_PORT};
use crate::errors::ToolError;
use crate::services::validation::json_type_name;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    Int,
    Bool,
    Dict,
    List,
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
    pub choices: Vec<String>,
    pub vars: Vec<String>,
}

impl FieldSpec {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            default: None,
            choices: Vec::new(),
            vars: Vec::new(),
        }
    }

    pub fn vars(mut self, vars: &[&str]) -> Self {
        self.vars = vars.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| c.to_string()).collect();
        self
    }

    fn lookup<'s, 'a>(&'s self, hostvars: &'a Map<String, Value>) -> Option<(&'s str, &'a Value)> {
        self.vars.iter().find_map(|var| {
            hostvars
                .get(var.as_str())
                .filter(|value| !value.is_null())
                .map(|value| (var.as_str(), value))
        })
    }

    fn coerce(&self, source: &str, value: &Value) -> Result<Value, ToolError> {
        let coerced = match self.kind {
            FieldKind::Str => coerce_str(value),
            FieldKind::Int => coerce_int(value),
            FieldKind::Bool => coerce_bool(value),
            FieldKind::Dict => coerce_dict(value),
            FieldKind::List => coerce_list(value),
        }
        .ok_or_else(|| {
            ToolError::configuration(format!(
                "host variable '{}' for '{}' must be of type {}, got {}",
                source,
                self.name,
                kind_label(self.kind),
                json_type_name(value)
            ))
        })?;

        if !self.choices.is_empty() {
            let text = coerced.as_str().unwrap_or_default();
            if !self.choices.iter().any(|choice| choice == text) {
                return Err(ToolError::configuration(format!(
                    "value of '{}' must be one of: {}, got: {}",
                    self.name,
                    self.choices.join(", "),
                    text
                )));
            }
        }
        Ok(coerced)
    }
}

fn kind_label(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Str => "str",
        FieldKind::Int => "int",
        FieldKind::Bool => "bool",
        FieldKind::Dict => "dict",
        FieldKind::List => "list",
    }
}

fn coerce_str(value: &Value) -> Option<Value> {
    match value {
        Value::String(_) => Some(value.clone()),
        Value::Number(_) | Value::Bool(_) => Some(Value::String(value.to_string())),
        _ => None,
    }
}

fn coerce_int(value: &Value) -> Option<Value> {
    match value {
        Value::Number(num) => num.as_i64().map(Value::from),
        Value::String(text) => text.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    }
}

fn coerce_bool(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(_) => Some(value.clone()),
        Value::Number(num) => match num.as_i64() {
            Some(1) => Some(Value::Bool(true)),
            Some(0) => Some(Value::Bool(false)),
            _ => None,
        },
        Value::String(text) => match text.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "y" | "1" | "t" => Some(Value::Bool(true)),
            "false" | "no" | "off" | "n" | "0" | "f" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_dict(value: &Value) -> Option<Value> {
    match value {
        Value::Object(_) => Some(value.clone()),
        Value::String(text) => serde_json::from_str::<Value>(text)
            .ok()
            .filter(|parsed| parsed.is_object()),
        _ => None,
    }
}

fn coerce_list(value: &Value) -> Option<Value> {
    match value {
        Value::Array(_) => Some(value.clone()),
        Value::String(text) => Some(Value::Array(
            text.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
        )),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct HostSchema {
    fields: Vec<FieldSpec>,
}

impl HostSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn resolve(&self, hostvars: &Map<String, Value>) -> Result<ResolvedHost, ToolError> {
        let mut values = BTreeMap::new();
        for field in &self.fields {
            match field.lookup(hostvars) {
                Some((source, raw)) => {
                    values.insert(field.name.clone(), field.coerce(source, raw)?);
                }
                None if field.required => {
                    return Err(ToolError::configuration(format!(
                        "missing required property: {}",
                        field.name
                    ))
                    .with_hint(format!("Set one of: {}", field.vars.join(", "))));
                }
                None => {
                    if let Some(default) = &field.default {
                        values.insert(field.name.clone(), default.clone());
                    }
                }
            }
        }
        Ok(ResolvedHost { values })
    }
}

/// Coerced field values keyed by logical field name.
#[derive(Debug, Clone, Default)]
pub struct ResolvedHost {
    values: BTreeMap<String, Value>,
}

impl ResolvedHost {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<String> {
        self.get(name).and_then(Value::as_str).map(str::to_string)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn string_map(&self, name: &str) -> Result<BTreeMap<String, String>, ToolError> {
        let mut out = BTreeMap::new();
        let Some(Value::Object(map)) = self.get(name) else {
            return Ok(out);
        };
        for (key, value) in map {
            let rendered = match value {
                Value::Null => continue,
                Value::String(text) => text.clone(),
                Value::Bool(_) | Value::Number(_) => value.to_string(),
                _ => {
                    return Err(ToolError::configuration(format!(
                        "'{}.{}' must be a scalar value",
                        name, key
                    )))
                }
            };
            out.insert(key.to_lowercase(), rendered);
        }
        Ok(out)
    }
}

static PLATFORM_HOST_SCHEMA: Lazy<HostSchema> = Lazy::new(|| {
    HostSchema::new(vec![
        FieldSpec::new("host", FieldKind::Str)
            .required()
            .vars(&["ansible_host"]),
        FieldSpec::new("port", FieldKind::Int).vars(&[
            "platform_port",
            "platform_http_port",
            "platform_https_port",
            "itential_port",
        ]),
        FieldSpec::new("username", FieldKind::Str).vars(&[
            "itential_http_user",
            "itential_user",
            "platform_username",
            "platform_user",
        ]),
        FieldSpec::new("password", FieldKind::Str).vars(&[
            "itential_http_password",
            "itential_password",
            "platform_password",
            "platform_pass",
        ]),
        FieldSpec::new("platform_auth_token", FieldKind::Str).vars(&["platform_auth_token"]),
        FieldSpec::new("use_tls", FieldKind::Bool)
            .default_value(Value::Bool(false))
            .vars(&["platform_https", "itential_http_use_tls"]),
        FieldSpec::new("headers", FieldKind::Dict).vars(&["platform_http_headers"]),
        FieldSpec::new("base_path", FieldKind::Str).vars(&["platform_http_base_path"]),
        FieldSpec::new("auth_type", FieldKind::Str)
            .choices(&["basic", "token"])
            .vars(&["platform_http_auth_type"]),
        FieldSpec::new("verify", FieldKind::Bool)
            .default_value(Value::Bool(true))
            .vars(&["platform_http_verify", "itential_http_verify"]),
        FieldSpec::new("disable_warnings", FieldKind::Bool)
            .default_value(Value::Bool(false))
            .vars(&["platform_http_disable_warnings"]),
    ])
});

pub fn platform_host_schema() -> &'static HostSchema {
    &PLATFORM_HOST_SCHEMA
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    Basic,
    Token,
}

impl AuthType {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "basic" => Some(AuthType::Basic),
            "token" => Some(AuthType::Token),
            _ => None,
        }
    }
}

/// Validated connection parameters for one target host.
#[derive(Clone)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub static_auth_token: Option<String>,
    pub use_tls: bool,
    pub headers: BTreeMap<String, String>,
    pub base_path: Option<String>,
    pub auth_type: Option<AuthType>,
    pub verify: bool,
    pub disable_warnings: bool,
}

impl ConnectionDescriptor {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            username: None,
            password: None,
            static_auth_token: None,
            use_tls: false,
            headers: BTreeMap::new(),
            base_path: None,
            auth_type: None,
            verify: true,
            disable_warnings: false,
        }
    }

    /// Resolves host variables against the default platform schema.
    pub fn resolve(hostvars: &Map<String, Value>) -> Result<Self, ToolError> {
        Self::resolve_with(platform_host_schema(), hostvars)
    }

    pub fn resolve_with(
        schema: &HostSchema,
        hostvars: &Map<String, Value>,
    ) -> Result<Self, ToolError> {
        Self::from_resolved(&schema.resolve(hostvars)?)
    }

    pub fn from_resolved(resolved: &ResolvedHost) -> Result<Self, ToolError> {
        let host = resolved
            .str("host")
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ToolError::configuration("missing required property: host"))?;

        let port = match resolved.int("port") {
            None => None,
            Some(port) if port >= MIN_PORT as i64 && port <= MAX_PORT as i64 => Some(port as u16),
            Some(port) => {
                return Err(ToolError::configuration(format!(
                    "port must be an integer between {} and {}, got {}",
                    MIN_PORT, MAX_PORT, port
                )))
            }
        };

        let auth_type = match resolved.str("auth_type") {
            None => None,
            Some(raw) => Some(AuthType::parse(&raw).ok_or_else(|| {
                ToolError::configuration(format!("unsupported auth_type: {}", raw))
            })?),
        };

        Ok(Self {
            host,
            port,
            username: non_empty(resolved.str("username")),
            password: non_empty(resolved.str("password")),
            static_auth_token: non_empty(resolved.str("platform_auth_token")),
            use_tls: resolved.bool("use_tls").unwrap_or(false),
            headers: resolved.string_map("headers")?,
            base_path: non_empty(resolved.str("base_path")),
            auth_type,
            verify: resolved.bool("verify").unwrap_or(true),
            disable_warnings: resolved.bool("disable_warnings").unwrap_or(false),
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    pub fn with_static_token(mut self, token: &str) -> Self {
        self.static_auth_token = Some(token.to_string());
        self
    }

    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = Some(base_path.to_string());
        self
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_lowercase(), value.to_string());
        self
    }

    pub fn with_auth_type(mut self, auth_type: AuthType) -> Self {
        self.auth_type = Some(auth_type);
        self
    }

    pub fn scheme(&self) -> &'static str {
        if self.use_tls {
            "https"
        } else {
            "http"
        }
    }

    /// `scheme://host[:port]`
    pub fn origin(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}", self.scheme(), self.host, port),
            None => format!("{}://{}", self.scheme(), self.host),
        }
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("static_auth_token", &redact(&self.static_auth_token))
            .field("use_tls", &self.use_tls)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("base_path", &self.base_path)
            .field("auth_type", &self.auth_type)
            .field("verify", &self.verify)
            .field("disable_warnings", &self.disable_warnings)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
