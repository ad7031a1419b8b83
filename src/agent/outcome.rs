//! Result decoding at the external agent boundary
//!
//! The external agent returns heterogeneous shapes: a plain string, a
//! structured object, or nothing at all. All of that ambiguity is resolved
//! here, once, into the tagged [`RunOutcome`]; the rest of the crate only ever
//! sees the typed value.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::types::{RunOutcome, NO_RESULTS_SENTINEL};

/// Raw result as emitted by the external agent, prior to normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRunResult {
    /// Structured result object
    Structured(StructuredResult),
    /// Bare final text
    Text(String),
}

/// Structured result object shape.
///
/// All fields are optional; agent versions differ in which they populate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredResult {
    /// Short summary of the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Final textual result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Final URL; older agent versions use `current_url` or `final_url`
    #[serde(alias = "current_url", alias = "final_url")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Rendered HTML of the final page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Base64-encoded screenshots in capture order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub screenshots: Vec<String>,
    /// Base64-encoded session GIF
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_gif: Option<String>,
    /// Step-by-step history of the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryStep>>,
}

/// One step of the agent's run history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryStep {
    /// Results produced during this step
    #[serde(default)]
    pub result: Vec<StepResult>,
}

/// One result entry within a history step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepResult {
    /// Whether the agent declared the task done with this result
    #[serde(default)]
    pub is_done: bool,
    /// Content extracted for this result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_content: Option<String>,
}

/// Normalize a raw agent result into a completed [`RunOutcome`].
///
/// Completion semantics: if the history tail carries explicit `is_done`
/// signalling, prefer it; otherwise any textual output counts as success;
/// with nothing extractable the text falls back to [`NO_RESULTS_SENTINEL`].
pub fn normalize(raw: Option<RawRunResult>) -> RunOutcome {
    match raw {
        None => {
            warn!("Agent returned no result; using default message");
            RunOutcome::text("")
        }
        Some(RawRunResult::Text(text)) => {
            info!("Agent returned a plain text result");
            RunOutcome::text(text)
        }
        Some(RawRunResult::Structured(result)) => {
            let text = extract_text(&result);
            RunOutcome::Completed {
                text,
                summary: result.summary,
                url: result.url,
                html: result.html,
                screenshots: result.screenshots,
                gif: result.history_gif,
            }
        }
    }
}

/// Pull the final text out of a structured result.
fn extract_text(result: &StructuredResult) -> String {
    if let Some(last) = result
        .history
        .as_ref()
        .and_then(|steps| steps.last())
        .and_then(|step| step.result.last())
    {
        if last.is_done {
            info!("Agent completed task successfully");
            return last
                .extracted_content
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| NO_RESULTS_SENTINEL.to_string());
        }
        warn!("Agent did not complete the task (is_done is false)");
        return "Task was not completed successfully".to_string();
    }

    match &result.result {
        Some(text) if !text.trim().is_empty() => text.clone(),
        _ => {
            warn!("No results found in history, returning default message");
            NO_RESULTS_SENTINEL.to_string()
        }
    }
}
