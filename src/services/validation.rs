use crate::errors::ToolError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// A task argument that accepts either one name or a list of names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameList {
    Single(String),
    Many(Vec<String>),
}

impl NameList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            NameList::Single(name) => vec![name],
            NameList::Many(names) => names,
        }
    }
}

impl From<&str> for NameList {
    fn from(value: &str) -> Self {
        NameList::Single(value.to_string())
    }
}

impl From<Vec<String>> for NameList {
    fn from(value: Vec<String>) -> Self {
        NameList::Many(value)
    }
}

#[derive(Clone)]
pub struct Validation;

impl Validation {
    pub fn new() -> Self {
        Self
    }

    pub fn ensure_string(
        &self,
        value: &Value,
        label: &str,
        trim: bool,
    ) -> Result<String, ToolError> {
        let text = value.as_str().ok_or_else(|| {
            ToolError::validation(format!("'{}' must be a non-empty string", label))
        })?;
        let normalized = text.trim();
        if normalized.is_empty() {
            return Err(ToolError::validation(format!(
                "'{}' must be a non-empty string",
                label
            )));
        }
        Ok(if trim {
            normalized.to_string()
        } else {
            text.to_string()
        })
    }

    pub fn ensure_optional_string(
        &self,
        value: Option<&Value>,
        label: &str,
        trim: bool,
    ) -> Result<Option<String>, ToolError> {
        match value {
            None => Ok(None),
            Some(val) if val.is_null() => Ok(None),
            Some(val) => self.ensure_string(val, label, trim).map(Some),
        }
    }

    pub fn ensure_required_string(
        &self,
        value: Option<&Value>,
        label: &str,
    ) -> Result<String, ToolError> {
        self.ensure_optional_string(value, label, true)?
            .ok_or_else(|| ToolError::validation(format!("'{}' must be provided.", label)))
    }

    /// Flat string-keyed mapping with scalar values. Scalars other than
    /// strings are rendered with their JSON text.
    pub fn ensure_string_map(
        &self,
        value: Option<&Value>,
        label: &str,
    ) -> Result<BTreeMap<String, String>, ToolError> {
        let Some(value) = value else {
            return Ok(BTreeMap::new());
        };
        if value.is_null() {
            return Ok(BTreeMap::new());
        }
        let obj = value.as_object().ok_or_else(|| {
            ToolError::validation(format!(
                "'{}' must be a dictionary, got {}",
                label,
                json_type_name(value)
            ))
        })?;
        let mut out = BTreeMap::new();
        for (key, val) in obj.iter() {
            if key.trim().is_empty() {
                return Err(ToolError::validation(format!(
                    "'{}' must not contain empty keys",
                    label
                )));
            }
            let rendered = match val {
                Value::Null => continue,
                Value::String(text) => text.clone(),
                Value::Bool(_) | Value::Number(_) => val.to_string(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(ToolError::validation(format!(
                        "'{}.{}' must be a scalar value, got {}",
                        label,
                        key,
                        json_type_name(val)
                    )))
                }
            };
            out.insert(key.clone(), rendered);
        }
        Ok(out)
    }

    pub fn ensure_name_list(&self, value: Option<&Value>, label: &str) -> Result<NameList, ToolError> {
        let missing = || ToolError::validation(format!("'{}' must be provided.", label));
        let wrong_shape = || {
            ToolError::validation(format!(
                "'{}' must be a string or a list of strings.",
                label
            ))
        };
        let value = value.filter(|v| !v.is_null()).ok_or_else(missing)?;
        match value {
            Value::String(name) => {
                if name.trim().is_empty() {
                    return Err(missing());
                }
                Ok(NameList::Single(name.trim().to_string()))
            }
            Value::Array(items) => {
                if items.is_empty() {
                    return Err(missing());
                }
                let mut names = Vec::with_capacity(items.len());
                for item in items {
                    let name = item.as_str().ok_or_else(wrong_shape)?.trim();
                    if name.is_empty() {
                        return Err(wrong_shape());
                    }
                    names.push(name.to_string());
                }
                Ok(NameList::Many(names))
            }
            _ => Err(wrong_shape()),
        }
    }

    /// Timeout in seconds, integer or fractional.
    pub fn ensure_timeout(&self, value: Option<&Value>) -> Result<Option<Duration>, ToolError> {
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Ok(None);
        };
        let invalid = || ToolError::validation("'timeout' must be a positive number of seconds");
        let seconds = value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
            .filter(|s| s.is_finite() && *s > 0.0)
            .ok_or_else(invalid)?;
        Duration::try_from_secs_f64(seconds)
            .map(Some)
            .map_err(|_| invalid())
    }
}

impl Default for Validation {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
