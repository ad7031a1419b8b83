//! Shared types used across autobrowse modules
//!
//! Contains the normalized run outcome and the artifact records attached
//! to completed runs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fallback text when the agent produced nothing extractable.
pub const NO_RESULTS_SENTINEL: &str = "No results found in history";

/// Terminal result of one supervised run.
///
/// Exactly one variant holds; expected failure modes (timeout, downstream
/// exception) are carried as variants rather than errors so the reporter can
/// always emit a single terminal event.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The agent finished and returned a result
    Completed {
        /// Final textual result, never empty (falls back to [`NO_RESULTS_SENTINEL`])
        text: String,
        /// Short summary supplied by the agent, if any
        summary: Option<String>,
        /// Last URL reported by the agent
        url: Option<String>,
        /// Rendered HTML of the final page, if the agent captured it
        html: Option<String>,
        /// Base64-encoded PNG screenshots in capture order
        screenshots: Vec<String>,
        /// Base64-encoded session GIF, if requested and produced
        gif: Option<String>,
    },
    /// The run exceeded the wall-clock deadline and was abandoned
    TimedOut {
        /// The deadline that elapsed
        elapsed: Duration,
    },
    /// The run raised an error
    Failed {
        /// Human-readable error message
        message: String,
        /// Rendered error chain for diagnostics
        stack_trace: String,
    },
}

impl RunOutcome {
    /// Create a completed outcome carrying only text.
    pub fn text(text: impl Into<String>) -> Self {
        let text: String = text.into();
        Self::Completed {
            text: if text.trim().is_empty() {
                NO_RESULTS_SENTINEL.to_string()
            } else {
                text
            },
            summary: None,
            url: None,
            html: None,
            screenshots: Vec::new(),
            gif: None,
        }
    }

    /// Whether this outcome maps to a `completed` terminal status.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// A named, MIME-typed binary payload attached to a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Kind of artifact ("screenshot" or "gif")
    #[serde(rename = "type")]
    pub kind: String,
    /// File name for the orchestrator to store the payload under
    pub name: String,
    /// MIME type of the content
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Base64-encoded payload
    pub content: String,
}

impl Artifact {
    /// Create a screenshot artifact; `index` is 1-based capture order.
    pub fn screenshot(index: usize, content: impl Into<String>) -> Self {
        Self {
            kind: "screenshot".to_string(),
            name: format!("screenshot_{}.png", index),
            mime_type: "image/png".to_string(),
            content: content.into(),
        }
    }

    /// Create a session GIF artifact.
    pub fn gif(content: impl Into<String>) -> Self {
        Self {
            kind: "gif".to_string(),
            name: "browsing_session.gif".to_string(),
            mime_type: "image/gif".to_string(),
            content: content.into(),
        }
    }
}
