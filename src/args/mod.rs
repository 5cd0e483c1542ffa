//! CLI argument types and parsing helpers.
mod cli;
pub(crate) mod parsers;


pub use cli::{OutputFormat, RunnerArgs};
pub use parsers::{parse_duration_arg, parse_header};
