//! Custom error types for autobrowse
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for autobrowse operations
#[derive(Error, Debug)]
pub enum AutobrowseError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors raised by the external browser agent
    #[error("Browser agent error: {0}")]
    Agent(String),

    /// Required API credential is missing
    #[error("OPENAI_API_KEY is not set in environment variables or .env file")]
    MissingApiKey,

    /// agent-browser not installed
    #[error("agent-browser not found. Install with: npm install -g agent-browser && agent-browser install")]
    AgentBrowserNotFound,

    /// Run exceeded the wall-clock deadline
    #[error("Agent execution timed out after {0} seconds")]
    Timeout(u64),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for autobrowse operations
pub type Result<T> = std::result::Result<T, AutobrowseError>;

impl AutobrowseError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a browser agent error
    pub fn agent(msg: impl Into<String>) -> Self {
        Self::Agent(msg.into())
    }

    /// Render this error and its source chain as a multi-line trace,
    /// suitable for the `stack_trace` field of a failure report.
    pub fn chain_description(&self) -> String {
        render_error_chain(self)
    }
}

/// Render an error and all its sources, one level per line.
pub fn render_error_chain(err: &(dyn std::error::Error)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(&format!("\ncaused by: {}", cause));
        source = cause.source();
    }
    out
}
