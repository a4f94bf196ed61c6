pub mod auth;
pub mod executor;
pub mod host;
pub mod logger;
pub mod tool_executor;
pub mod transport;
pub mod validation;
