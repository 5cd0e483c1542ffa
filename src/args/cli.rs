use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use super::parsers::{parse_duration_arg, parse_header};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per iteration plus a summary
    #[default]
    Text,
    /// The full batch report as JSON
    Json,
}

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Scriptable HTTP request runner - templated requests, sandboxed pre/post scripts, structured assertions, and data-driven iterations."
)]
pub struct RunnerArgs {
    /// Collection file (.toml or .json); defaults to reqpilot.toml or reqpilot.json
    #[arg(long = "config", short = 'c', env = "REQPILOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Environment to run against (defaults to settings.default_environment)
    #[arg(long = "env", short = 'e', env = "REQPILOT_ENV")]
    pub env: Option<String>,

    /// Only run requests with this name (repeatable)
    #[arg(long = "request", short = 'r')]
    pub requests: Vec<String>,

    /// JSON array of data rows applied to every selected request
    #[arg(long = "data", short = 'd')]
    pub data: Option<PathBuf>,

    /// Extra header sent with every request, e.g. 'X-Trace: on' (repeatable)
    #[arg(long = "header", short = 'H', value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Per-script timeout (supports ms/s/m/h)
    #[arg(long = "script-timeout", value_parser = parse_duration_arg)]
    pub script_timeout: Option<Duration>,

    /// Per-request network timeout (supports ms/s/m/h)
    #[arg(long = "request-timeout", value_parser = parse_duration_arg)]
    pub request_timeout: Option<Duration>,

    /// Output format for results on stdout
    #[arg(long = "output", short = 'o', value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Write trace events as JSON lines to this path
    #[arg(long = "trace-out")]
    pub trace_out: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long = "verbose", short = 'v')]
    pub verbose: bool,

    /// Exit with status 0 even when iterations or tests fail
    #[arg(long = "no-fail")]
    pub no_fail: bool,
}
