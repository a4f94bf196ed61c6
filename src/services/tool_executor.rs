use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::constants::tasks::NAMESPACE;
use crate::errors::ToolError;
use crate::services::logger::Logger;
use crate::utils::redact::redact_object;
use crate::utils::suggest::suggest;

use serde_json::Value;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, args: Value) -> Result<Value, ToolError>;
}

struct Registration {
    handler: Arc<dyn ToolHandler>,
    actions: &'static [&'static str],
}

/// Routes task names to handlers. A task is addressed either by handler
/// name (with `action` in the args), as `<namespace>.<action>`, or by the
/// bare action name.
#[derive(Clone)]
pub struct ToolExecutor {
    logger: Logger,
    handlers: Arc<HashMap<String, Registration>>,
}

impl ToolExecutor {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger: logger.child("tasks"),
            handlers: Arc::new(HashMap::new()),
        }
    }

    pub fn register(
        mut self,
        name: &str,
        handler: Arc<dyn ToolHandler>,
        actions: &'static [&'static str],
    ) -> Self {
        let mut handlers = match Arc::try_unwrap(self.handlers) {
            Ok(map) => map,
            Err(shared) => shared
                .iter()
                .map(|(key, reg)| {
                    (
                        key.clone(),
                        Registration {
                            handler: reg.handler.clone(),
                            actions: reg.actions,
                        },
                    )
                })
                .collect(),
        };
        handlers.insert(name.to_string(), Registration { handler, actions });
        self.handlers = Arc::new(handlers);
        self
    }

    fn resolve(&self, task: &str) -> Option<(&Registration, Option<&'static str>)> {
        let short = task
            .strip_prefix(NAMESPACE)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(task);
        if let Some(reg) = self.handlers.get(short) {
            return Some((reg, None));
        }
        self.handlers.values().find_map(|reg| {
            reg.actions
                .iter()
                .copied()
                .find(|action| *action == short)
                .map(|action| (reg, Some(action)))
        })
    }

    fn known_tasks(&self) -> Vec<&'static str> {
        let mut tasks: Vec<&'static str> = self
            .handlers
            .values()
            .flat_map(|reg| reg.actions.iter().copied())
            .collect();
        tasks.sort_unstable();
        tasks
    }

    pub async fn execute(&self, task: &str, args: Value) -> Result<Value, ToolError> {
        let Some((registration, action)) = self.resolve(task) else {
            let known = self.known_tasks();
            let suggestions = suggest(task, &known, 6);
            let hint = if suggestions.is_empty() {
                format!("Known tasks: {}", known.join(", "))
            } else {
                format!("Did you mean: {}", suggestions.join(", "))
            };
            return Err(ToolError::validation(format!("Unknown task: {}", task)).with_hint(hint));
        };

        let mut args = match args {
            Value::Object(map) => Value::Object(map),
            Value::Null => Value::Object(Default::default()),
            other => {
                return Err(ToolError::validation(format!(
                    "task arguments must be an object, got {}",
                    crate::services::validation::json_type_name(&other)
                )))
            }
        };
        if let (Some(action), Value::Object(map)) = (action, &mut args) {
            map.insert("action".to_string(), Value::String(action.to_string()));
        }

        let trace_id = uuid::Uuid::new_v4().to_string();
        let started = std::time::Instant::now();
        self.logger.debug(
            "Task started",
            Some(&serde_json::json!({
                "task": task,
                "trace_id": trace_id,
                "args": redact_object(&args, 256),
            })),
        );

        let result = registration.handler.handle(args).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => self.logger.info(
                "Task finished",
                Some(&serde_json::json!({
                    "task": task,
                    "trace_id": trace_id,
                    "duration_ms": duration_ms,
                })),
            ),
            Err(err) => self.logger.error(
                "Task failed",
                Some(&serde_json::json!({
                    "task": task,
                    "trace_id": trace_id,
                    "duration_ms": duration_ms,
                    "error": err.to_value(),
                })),
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::{ToolExecutor, ToolHandler};
    use crate::errors::{ToolError, ToolErrorKind};
    use crate::services::logger::{LogLevel, Logger};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        async fn handle(&self, args: Value) -> Result<Value, ToolError> {
            Ok(args)
        }
    }

    fn executor() -> ToolExecutor {
        ToolExecutor::new(Logger::with_level("test", LogLevel::Error)).register(
            "platform",
            Arc::new(Echo),
            &["get_jobs", "auth_token"],
        )
    }

    #[tokio::test]
    async fn namespaced_task_sets_action() {
        let out = executor()
            .execute("itential.platform.get_jobs", serde_json::json!({"status": "running"}))
            .await
            .unwrap();
        assert_eq!(out["action"], "get_jobs");
        assert_eq!(out["status"], "running");
    }

    #[tokio::test]
    async fn handler_name_keeps_explicit_action() {
        let out = executor()
            .execute("platform", serde_json::json!({"action": "auth_token"}))
            .await
            .unwrap();
        assert_eq!(out["action"], "auth_token");
    }

    #[tokio::test]
    async fn unknown_task_suggests_nearby_names() {
        let err = executor()
            .execute("get_job", Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Validation);
        assert!(err.hint.unwrap_or_default().contains("get_jobs"));
    }
}
