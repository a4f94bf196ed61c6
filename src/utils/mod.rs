pub mod redact;
pub mod suggest;
pub mod text;
pub mod tool_errors;
pub mod url;
