use thiserror::Error;

/// Failures at the sandbox boundary. These are always folded into a
/// `ScriptOutcome` before they reach the runner.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Script failed to compile: {message}")]
    Compile { message: String },
    #[error("{message}")]
    Runtime { message: String },
    #[error("Script timed out after {timeout_ms}ms.")]
    Timeout { timeout_ms: u64 },
    #[error("{count} test(s) never completed.")]
    PendingTests { count: usize },
    #[error("Failed to spawn script sandbox: {source}")]
    SpawnSandbox {
        #[source]
        source: std::io::Error,
    },
    #[error("Script sandbox exited without reporting an outcome.")]
    SandboxDisconnected,
}
