//! Structured report events
//!
//! One [`ReportEvent`] is one line of JSON on the reporting stream. Events are
//! append-only and never mutated after emission.

use serde::{Deserialize, Serialize};

use crate::core::Artifact;

/// Run status carried on every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Progress event; the run is still going
    Running,
    /// Terminal success
    Completed,
    /// Terminal failure (including timeout)
    Failed,
    /// Invocation-level error emitted before a run could start
    Error,
}

/// Severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Error,
}

/// Normalized result payload attached to a `completed` terminal event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResultPayload {
    /// Short summary of the run
    pub summary: String,
    /// Final textual output
    #[serde(rename = "outputText")]
    pub output_text: String,
    /// Final URL, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Rendered HTML of the final page, if captured
    #[serde(rename = "htmlResult", skip_serializing_if = "Option::is_none")]
    pub html_result: Option<String>,
    /// First screenshot, duplicated here for convenient access
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    /// All media artifacts; omitted entirely when there are none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<Artifact>>,
}

/// One line of structured output for the external orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEvent {
    /// Run status
    pub status: Status,
    /// Human-readable message
    pub message: String,
    /// Severity
    pub level: Level,
    /// ISO-8601 emission time
    pub timestamp: String,
    /// Current step number, when relevant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<u32>,
    /// Free-form event details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Last known URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Last known screenshot (base64 PNG)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    /// Normalized result (terminal `completed` only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RunResultPayload>,
    /// Error message (terminal `failed` only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Rendered error chain (terminal `failed` only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

impl ReportEvent {
    /// Create an event stamped with the current time.
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            level: Level::Info,
            timestamp: chrono::Utc::now().to_rfc3339(),
            step: None,
            details: None,
            url: None,
            screenshot: None,
            result: None,
            error: None,
            stack_trace: None,
        }
    }

    /// Set the severity.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Attach a step number.
    pub fn with_step(mut self, step: u32) -> Self {
        self.step = Some(step);
        self
    }

    /// Attach free-form details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
