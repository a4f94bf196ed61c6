pub mod app;
pub mod constants;
pub mod errors;
pub mod managers;
pub mod services;
pub mod utils;

pub use app::App;
pub use errors::{ToolError, ToolErrorKind};
