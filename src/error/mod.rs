mod app;
mod config;
mod http;
mod script;
mod validation;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use http::TransportError;
pub use script::ScriptError;
pub use validation::ValidationError;
