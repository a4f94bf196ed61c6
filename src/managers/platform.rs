use crate::constants::{endpoints, filters as fields, tasks};
use crate::errors::ToolError;
use crate::services::executor::{RequestExecutor, RequestResult, RequestSpec};
use crate::services::host::ConnectionDescriptor;
use crate::services::logger::Logger;
use crate::services::transport::HttpMethod;
use crate::services::validation::{NameList, Validation};
use crate::utils::tool_errors::unknown_action_error;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

const PLATFORM_ACTIONS: &[&str] = &[
    "auth_token",
    "generic_request",
    "get_jobs",
    "get_tasks",
    "get_canceled_jobs",
    "get_errored_jobs",
    "get_system_health",
    "get_worker_status",
    "activate_job_worker",
    "deactivate_job_worker",
    "activate_task_worker",
    "deactivate_task_worker",
    "restart_adapter",
    "restart_adapters",
    "restart_application",
    "restart_applications",
    "set_adapter_log_level",
];

/// Invocation keys that are never task arguments.
const RESERVED_KEYS: &[&str] = &["action", "hostvars", "task_vars", "inventory_hostname"];

const GENERIC_METHODS: &[HttpMethod] = &[
    HttpMethod::Get,
    HttpMethod::Put,
    HttpMethod::Post,
    HttpMethod::Delete,
];

/// Arguments of the passthrough `generic_request` task.
#[derive(Debug, Clone, Default)]
pub struct GenericRequest {
    pub method: Option<String>,
    pub endpoint: String,
    pub params: BTreeMap<String, String>,
    pub data: Option<Value>,
    pub headers: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

#[derive(Clone)]
pub struct PlatformManager {
    logger: Logger,
    validation: Validation,
    executor: RequestExecutor,
}

impl PlatformManager {
    pub fn new(logger: Logger, validation: Validation, executor: RequestExecutor) -> Self {
        Self {
            logger: logger.child("platform"),
            validation,
            executor,
        }
    }

    pub fn actions() -> &'static [&'static str] {
        PLATFORM_ACTIONS
    }

    pub async fn handle_action(&self, args: Value) -> Result<Value, ToolError> {
        let action = args.get("action");
        let action_name = action.and_then(|v| v.as_str()).unwrap_or("");
        if !PLATFORM_ACTIONS.contains(&action_name) {
            return Err(unknown_action_error("platform", action, PLATFORM_ACTIONS));
        }

        let hostvars = extract_hostvars(&args)?;
        if let Some(connection) = hostvars.get(tasks::CONNECTION_VAR).and_then(|v| v.as_str()) {
            if connection != tasks::HTTP_CONNECTION {
                self.logger.info(
                    "Skipping task: host does not use the http connection",
                    Some(&serde_json::json!({"action": action_name, "connection": connection})),
                );
                return Ok(serde_json::json!({"changed": false, "skipped": true}));
            }
        }

        let descriptor = ConnectionDescriptor::resolve(&hostvars)?;
        let task_args = task_arguments(&args);
        self.logger.debug(
            &format!("running task {}.{}", tasks::NAMESPACE, action_name),
            Some(&serde_json::json!({"host": descriptor.host})),
        );

        match action_name {
            "auth_token" => {
                let token = self.auth_token(&descriptor).await?;
                Ok(serde_json::json!({"auth_token": token}))
            }
            "generic_request" => {
                let request = GenericRequest {
                    method: self.validation.ensure_optional_string(
                        task_args.get("method"),
                        "method",
                        true,
                    )?,
                    endpoint: self
                        .validation
                        .ensure_required_string(task_args.get("endpoint"), "endpoint")?,
                    params: self
                        .validation
                        .ensure_string_map(task_args.get("params"), "params")?,
                    data: task_args.get("data").cloned().filter(|v| !v.is_null()),
                    headers: self
                        .validation
                        .ensure_string_map(task_args.get("headers"), "headers")?,
                    timeout: self.validation.ensure_timeout(task_args.get("timeout"))?,
                };
                Ok(self.generic_request(&descriptor, request).await?.to_value())
            }
            "get_jobs" => {
                let filters = self.filter_arguments(&task_args)?;
                Ok(self.get_jobs(&descriptor, &filters).await?.to_value())
            }
            "get_tasks" => {
                let filters = self.filter_arguments(&task_args)?;
                Ok(self.get_tasks(&descriptor, &filters).await?.to_value())
            }
            "get_canceled_jobs" => Ok(self.get_canceled_jobs(&descriptor).await?.to_value()),
            "get_errored_jobs" => Ok(self.get_errored_jobs(&descriptor).await?.to_value()),
            "get_system_health" => Ok(self.get_system_health(&descriptor).await?.to_value()),
            "get_worker_status" => Ok(self.get_worker_status(&descriptor).await?.to_value()),
            "activate_job_worker" => Ok(self.activate_job_worker(&descriptor).await?.to_value()),
            "deactivate_job_worker" => {
                Ok(self.deactivate_job_worker(&descriptor).await?.to_value())
            }
            "activate_task_worker" => Ok(self.activate_task_worker(&descriptor).await?.to_value()),
            "deactivate_task_worker" => {
                Ok(self.deactivate_task_worker(&descriptor).await?.to_value())
            }
            "restart_adapter" => {
                let name = self
                    .validation
                    .ensure_required_string(task_args.get("adapter_name"), "adapter_name")?;
                Ok(self.restart_adapter(&descriptor, &name).await?.to_value())
            }
            "restart_adapters" => {
                let names = self
                    .validation
                    .ensure_name_list(task_args.get("adapter_names"), "adapter_names")?;
                let results = self.restart_adapters(&descriptor, names).await?;
                Ok(results_value(&results))
            }
            "restart_application" => {
                let name = self.validation.ensure_required_string(
                    task_args.get("application_name"),
                    "application_name",
                )?;
                Ok(self.restart_application(&descriptor, &name).await?.to_value())
            }
            "restart_applications" => {
                let names = self.validation.ensure_name_list(
                    task_args.get("application_names"),
                    "application_names",
                )?;
                let results = self.restart_applications(&descriptor, names).await?;
                Ok(results_value(&results))
            }
            "set_adapter_log_level" => {
                let required = |key: &str| task_args.get(key).filter(|v| !v.is_null());
                if required("adapter_name").is_none()
                    || required("log_level").is_none()
                    || required("transport").is_none()
                {
                    return Err(ToolError::validation(
                        "adapter_name, log_level, and transport must be provided.",
                    ));
                }
                let adapter_name = self
                    .validation
                    .ensure_required_string(task_args.get("adapter_name"), "adapter_name")?;
                let log_level = self
                    .validation
                    .ensure_required_string(task_args.get("log_level"), "log_level")?;
                let transport = self
                    .validation
                    .ensure_required_string(task_args.get("transport"), "transport")?;
                Ok(self
                    .set_adapter_log_level(&descriptor, &adapter_name, &transport, &log_level)
                    .await?
                    .to_value())
            }
            _ => Err(unknown_action_error("platform", action, PLATFORM_ACTIONS)),
        }
    }

    fn filter_arguments(&self, task_args: &Map<String, Value>) -> Result<BTreeMap<String, String>, ToolError> {
        self.validation
            .ensure_string_map(Some(&Value::Object(task_args.clone())), "filters")
    }

    pub async fn auth_token(&self, descriptor: &ConnectionDescriptor) -> Result<String, ToolError> {
        self.executor
            .authenticator()
            .authenticate_with_timeout(descriptor, self.executor.default_timeout())
            .await
    }

    pub async fn generic_request(
        &self,
        descriptor: &ConnectionDescriptor,
        request: GenericRequest,
    ) -> Result<RequestResult, ToolError> {
        let method_name = request.method.as_deref().unwrap_or("GET");
        let method: HttpMethod = method_name
            .parse()
            .ok()
            .filter(|method| GENERIC_METHODS.contains(method))
            .ok_or_else(|| {
                let allowed: Vec<&str> = GENERIC_METHODS.iter().map(|m| m.as_str()).collect();
                ToolError::validation(format!(
                    "Invalid HTTP method '{}'. Allowed values: {}",
                    method_name,
                    allowed.join(", ")
                ))
            })?;
        if request.endpoint.trim().is_empty() {
            return Err(ToolError::validation("'endpoint' must be provided."));
        }

        let mut spec = RequestSpec::new(method, request.endpoint)
            .with_query_params(request.params)
            .with_headers(request.headers)
            .with_timeout(request.timeout);
        if let Some(data) = request.data {
            spec = spec.with_body(data);
        }
        self.executor.execute(descriptor, spec).await
    }

    pub async fn get_jobs(
        &self,
        descriptor: &ConnectionDescriptor,
        filters: &BTreeMap<String, String>,
    ) -> Result<RequestResult, ToolError> {
        let spec = RequestSpec::get(endpoints::JOBS)
            .with_query_params(filter_params(filters, fields::JOB_FIELDS));
        self.executor.execute(descriptor, spec).await
    }

    pub async fn get_tasks(
        &self,
        descriptor: &ConnectionDescriptor,
        filters: &BTreeMap<String, String>,
    ) -> Result<RequestResult, ToolError> {
        let spec = RequestSpec::get(endpoints::TASKS)
            .with_query_params(filter_params(filters, fields::TASK_FIELDS));
        self.executor.execute(descriptor, spec).await
    }

    pub async fn get_canceled_jobs(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<RequestResult, ToolError> {
        self.jobs_with_status(descriptor, fields::CANCELED).await
    }

    pub async fn get_errored_jobs(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<RequestResult, ToolError> {
        self.jobs_with_status(descriptor, fields::ERROR).await
    }

    async fn jobs_with_status(
        &self,
        descriptor: &ConnectionDescriptor,
        status: &str,
    ) -> Result<RequestResult, ToolError> {
        let filters = BTreeMap::from([(fields::STATUS_KEY.to_string(), status.to_string())]);
        self.get_jobs(descriptor, &filters).await
    }

    pub async fn get_system_health(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<RequestResult, ToolError> {
        self.executor
            .execute(descriptor, RequestSpec::get(endpoints::SYSTEM_HEALTH))
            .await
    }

    pub async fn get_worker_status(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<RequestResult, ToolError> {
        self.executor
            .execute(descriptor, RequestSpec::get(endpoints::WORKER_STATUS))
            .await
    }

    pub async fn activate_job_worker(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<RequestResult, ToolError> {
        self.executor
            .execute(descriptor, RequestSpec::post(endpoints::JOB_WORKER_ACTIVATE))
            .await
    }

    pub async fn deactivate_job_worker(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<RequestResult, ToolError> {
        self.executor
            .execute(descriptor, RequestSpec::post(endpoints::JOB_WORKER_DEACTIVATE))
            .await
    }

    pub async fn activate_task_worker(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<RequestResult, ToolError> {
        self.executor
            .execute(descriptor, RequestSpec::post(endpoints::TASK_WORKER_ACTIVATE))
            .await
    }

    pub async fn deactivate_task_worker(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<RequestResult, ToolError> {
        self.executor
            .execute(descriptor, RequestSpec::post(endpoints::TASK_WORKER_DEACTIVATE))
            .await
    }

    pub async fn restart_adapter(
        &self,
        descriptor: &ConnectionDescriptor,
        adapter_name: &str,
    ) -> Result<RequestResult, ToolError> {
        let path = format!("/adapters/{}/restart", path_segment(adapter_name, "adapter_name")?);
        self.executor.execute(descriptor, RequestSpec::put(path)).await
    }

    /// One request per adapter, in order. The first failure ends the run.
    pub async fn restart_adapters(
        &self,
        descriptor: &ConnectionDescriptor,
        adapter_names: NameList,
    ) -> Result<Vec<RequestResult>, ToolError> {
        let mut results = Vec::new();
        for name in adapter_names.into_vec() {
            results.push(self.restart_adapter(descriptor, &name).await?);
        }
        Ok(results)
    }

    pub async fn restart_application(
        &self,
        descriptor: &ConnectionDescriptor,
        application_name: &str,
    ) -> Result<RequestResult, ToolError> {
        let path = format!(
            "/applications/{}/restart",
            path_segment(application_name, "application_name")?
        );
        self.executor.execute(descriptor, RequestSpec::put(path)).await
    }

    pub async fn restart_applications(
        &self,
        descriptor: &ConnectionDescriptor,
        application_names: NameList,
    ) -> Result<Vec<RequestResult>, ToolError> {
        let mut results = Vec::new();
        for name in application_names.into_vec() {
            results.push(self.restart_application(descriptor, &name).await?);
        }
        Ok(results)
    }

    pub async fn set_adapter_log_level(
        &self,
        descriptor: &ConnectionDescriptor,
        adapter_name: &str,
        transport: &str,
        log_level: &str,
    ) -> Result<RequestResult, ToolError> {
        let path = format!("/adapters/{}/loglevel", path_segment(adapter_name, "adapter_name")?);
        let body = serde_json::json!({
            "properties": {
                "transport": transport,
                "level": log_level,
            }
        });
        self.executor
            .execute(descriptor, RequestSpec::put(path).with_body(body))
            .await
    }
}

/// `{key: value}` filters become `equals[key]=value`, plus the fixed
/// `include` field selection.
pub fn filter_params(filters: &BTreeMap<String, String>, include: &str) -> BTreeMap<String, String> {
    let mut params: BTreeMap<String, String> = filters
        .iter()
        .map(|(key, value)| (format!("equals[{}]", key), value.clone()))
        .collect();
    params.insert(fields::INCLUDE_PARAM.to_string(), include.to_string());
    params
}

fn path_segment<'a>(name: &'a str, label: &str) -> Result<&'a str, ToolError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ToolError::validation(format!("'{}' must be provided.", label)));
    }
    if trimmed.contains('/') || trimmed.contains('?') || trimmed.contains('#') {
        return Err(ToolError::validation(format!(
            "'{}' must not contain '/', '?' or '#': {}",
            label, trimmed
        )));
    }
    Ok(trimmed)
}

fn results_value(results: &[RequestResult]) -> Value {
    serde_json::json!({
        "results": results.iter().map(RequestResult::to_value).collect::<Vec<_>>(),
    })
}

/// Host variables either inline (`hostvars`) or as the runtime provides
/// them (`task_vars.hostvars[task_vars.inventory_hostname]`).
fn extract_hostvars(args: &Value) -> Result<Map<String, Value>, ToolError> {
    if let Some(hostvars) = args.get("hostvars") {
        return hostvars
            .as_object()
            .cloned()
            .ok_or_else(|| ToolError::configuration("'hostvars' must be a dictionary"));
    }
    let task_vars = args
        .get("task_vars")
        .ok_or_else(|| ToolError::configuration("'hostvars' or 'task_vars' must be provided"))?;
    let inventory_hostname = task_vars
        .get("inventory_hostname")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::configuration("task_vars.inventory_hostname is required"))?;
    task_vars
        .get("hostvars")
        .and_then(|v| v.get(inventory_hostname))
        .and_then(|v| v.as_object())
        .cloned()
        .ok_or_else(|| {
            ToolError::configuration(format!(
                "no host variables found for inventory host '{}'",
                inventory_hostname
            ))
        })
}

fn task_arguments(args: &Value) -> Map<String, Value> {
    let mut out = args.as_object().cloned().unwrap_or_default();
    for key in RESERVED_KEYS {
        out.remove(*key);
    }
    out
}

#[async_trait::async_trait]
impl crate::services::tool_executor::ToolHandler for PlatformManager {
    async fn handle(&self, args: Value) -> Result<Value, ToolError> {
        self.handle_action(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::{extract_hostvars, filter_params, path_segment, task_arguments};
    use std::collections::BTreeMap;

    #[test]
    fn filter_params_wrap_keys_and_append_include() {
        let filters = BTreeMap::from([
            ("status".to_string(), "running".to_string()),
            ("name".to_string(), "greg".to_string()),
        ]);
        let params = filter_params(&filters, "name,status");
        let expected = BTreeMap::from([
            ("equals[status]".to_string(), "running".to_string()),
            ("equals[name]".to_string(), "greg".to_string()),
            ("include".to_string(), "name,status".to_string()),
        ]);
        assert_eq!(params, expected);
    }

    #[test]
    fn hostvars_are_read_from_task_vars() {
        let args = serde_json::json!({
            "task_vars": {
                "inventory_hostname": "platform",
                "hostvars": {"platform": {"ansible_host": "example.com"}},
            }
        });
        let hostvars = extract_hostvars(&args).unwrap();
        assert_eq!(hostvars["ansible_host"], "example.com");
    }

    #[test]
    fn reserved_keys_are_not_task_arguments() {
        let args = serde_json::json!({"action": "get_jobs", "hostvars": {}, "status": "running"});
        let task_args = task_arguments(&args);
        assert_eq!(task_args.len(), 1);
        assert_eq!(task_args["status"], "running");
    }

    #[test]
    fn path_segments_reject_separators() {
        assert_eq!(path_segment(" net ", "adapter_name").unwrap(), "net");
        assert!(path_segment("a/b", "adapter_name").is_err());
        assert!(path_segment("", "adapter_name").is_err());
    }
}
