//! autobrowse - supervised runner for an LLM-driven browser agent
//!
//! Drives an external browser-automation agent (the `agent-browser` CLI) for
//! one instruction at a time and reports progress and results as structured
//! JSON lines for a parent orchestrator.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **Agent**: Driver seam to the external CLI, outcome decoding, and the
//!   run supervisor (deadline, cleanup, history persistence)
//! - **Report**: JSON-line event stream with de-duplicated progress events
//!   and a single terminal event per run
//! - **CLI**: Positional-argument process contract for spawned runs
//!
//! # Usage
//!
//! ```rust,no_run
//! use autobrowse::{browse_website, RunConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let run = RunConfig::new("Find the three latest blog posts and summarize them")
//!         .with_initial_url("https://example.com");
//!     let result = browse_website(run).await.unwrap();
//!     println!("{}", result);
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod report;

// Re-export commonly used items
pub use crate::core::{AutobrowseError, BrowserSize, Config, Result, RunConfig, RunOutcome};
pub use report::EventReporter;

use tracing::info;

/// Instructions shorter than this are treated as too vague to act on.
const MIN_INSTRUCTION_LEN: usize = 20;

/// Placeholder instructions some callers send while wiring up integrations.
const PLACEHOLDER_INSTRUCTIONS: [&str; 2] = ["test instruction for browsing", "test browsing"];

/// Convenience entry point: run one instruction and return the final text.
///
/// Applies the same instruction enhancement as the process entry, then runs
/// the full supervision pipeline with reporting discarded. A timed-out or
/// failed run surfaces as an error to the caller.
pub async fn browse_website(mut run: RunConfig) -> Result<String> {
    info!("browse_website called with instruction: {}", run.instruction);

    let config = Config::load();
    run.instruction = enhance_instruction(&run.instruction, run.initial_url.as_deref());

    let mut reporter = EventReporter::discard();
    let outcome = agent::supervise(&config, &run, "autobrowse", &mut reporter).await?;

    match outcome {
        RunOutcome::Completed { text, .. } => Ok(text),
        RunOutcome::TimedOut { elapsed } => Err(AutobrowseError::Timeout(elapsed.as_secs())),
        RunOutcome::Failed { message, .. } => Err(AutobrowseError::Other(message)),
    }
}

/// Rewrite an instruction so the agent always has something actionable.
///
/// When a starting URL is supplied and the instruction mentions no URL of its
/// own, a navigation step is prepended. Known placeholder instructions and
/// anything shorter than [`MIN_INSTRUCTION_LEN`] characters are replaced with
/// a fixed multi-point research task (kept for compatibility with existing
/// orchestrator callers).
pub fn enhance_instruction(instruction: &str, initial_url: Option<&str>) -> String {
    let mut instruction = instruction.to_string();

    if let Some(url) = initial_url {
        if !instruction.to_lowercase().contains("http") {
            instruction = format!("Go to {} and {}", url, instruction);
            info!("Enhanced instruction with URL: {}", instruction);
        }
    }

    let lowered = instruction.to_lowercase();
    if PLACEHOLDER_INSTRUCTIONS.contains(&lowered.as_str())
        || instruction.trim().len() < MIN_INSTRUCTION_LEN
    {
        let default_url = initial_url.unwrap_or("https://openai.com");
        instruction = research_template(default_url, "OpenAI");
        info!("Using detailed default instruction with specific research task");
    }

    instruction
}

/// The fixed research task substituted for vague instructions.
fn research_template(url: &str, company: &str) -> String {
    format!(
        "Go to {url} and find everything you can about the company called \"{company}\".\n\
         Then, create a detailed report with the following information:\n\
         1. What products or services they offer\n\
         2. When the company was founded\n\
         3. Key team members or leadership\n\
         4. Recent news or announcements\n\
         5. Summary of their mission and values\n\
         \n\
         Visit multiple pages on their website if needed, and provide a well-structured report."
    )
}
