//! Structured (declarative) response assertions.
mod evaluate;
mod json_path;
mod response;
mod status;

#[cfg(test)]
mod tests;

pub use evaluate::{evaluate, json_deep_eq, json_loose_eq};
pub use json_path::lookup_path;
pub use response::ResponseView;
pub use status::StatusSpec;
