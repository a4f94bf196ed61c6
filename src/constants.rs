pub mod network {
    pub const LOGIN_PATH: &str = "/login";
    pub const TOKEN_PARAM: &str = "token";
    pub const REQUEST_TIMEOUT_ENV: &str = "PLATFORM_REQUEST_TIMEOUT_MS";
    pub const SUCCESS_STATUS: u16 = 200;
}

pub mod limits {
    pub const MAX_PORT: u16 = 65_535;
    pub const MIN_PORT: u16 = 1;
    pub const LOG_BODY_LENGTH: usize = 2_048;
    pub const ERROR_BODY_LENGTH: usize = 512;
}

pub mod content {
    pub const JSON: &str = "application/json";
}

pub mod protocols {
    pub const ALLOWED_HTTP: &[&str] = &["http", "https"];
}

pub mod endpoints {
    pub const SYSTEM_HEALTH: &str = "/health/system";
    pub const TASK_WORKER_ACTIVATE: &str = "/workflow_engine/activate";
    pub const TASK_WORKER_DEACTIVATE: &str = "/workflow_engine/deactivate";
    pub const JOB_WORKER_ACTIVATE: &str = "/workflow_engine/jobWorker/activate";
    pub const JOB_WORKER_DEACTIVATE: &str = "/workflow_engine/jobWorker/deactivate";
    pub const WORKER_STATUS: &str = "/workflow_engine/workers/status";
    pub const JOBS: &str = "/operations-manager/jobs";
    pub const TASKS: &str = "/operations-manager/tasks";
}

pub mod filters {
    pub const INCLUDE_PARAM: &str = "include";
    pub const JOB_FIELDS: &str = "name,status";
    pub const TASK_FIELDS: &str = "name,status,type";
    pub const STATUS_KEY: &str = "status";
    pub const CANCELED: &str = "canceled";
    pub const ERROR: &str = "error";
}

pub mod tasks {
    pub const NAMESPACE: &str = "itential.platform";
    pub const CONNECTION_VAR: &str = "itential_connection";
    pub const HTTP_CONNECTION: &str = "http";
}
