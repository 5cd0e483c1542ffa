//! Core library for the `reqpilot` CLI.
//!
//! A collection of templated HTTP requests is run against one environment:
//! each request is resolved, optionally reshaped by a sandboxed pre-request
//! script, sent through a direct or relayed transport, and judged by
//! structured tests and a post-response script. Every data row is one
//! iteration; every iteration leaves correlated trace events behind.
pub mod args;
pub mod assertions;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod runner;
pub mod script;
pub mod shutdown;
pub mod template;
pub mod trace;

mod app;
mod entry;
mod logger;
mod shutdown_handlers;

#[cfg(feature = "fuzzing")]
pub mod fuzzing;

pub use entry::run;
