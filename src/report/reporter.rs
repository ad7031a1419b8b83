//! Event reporter - the JSON-line stream consumed by the orchestrator
//!
//! Writes exactly one JSON object per line to an injected sink (stdout in
//! production), flushing after every event so the parent process observes
//! them in real time. This stream is the only communication channel with the
//! orchestrator; logging goes to stderr and the log file instead.

use std::io::Write;

use serde_json::json;
use tracing::{error, warn};

use crate::core::{Artifact, RunConfig, RunOutcome};
use crate::report::event::{Level, ReportEvent, RunResultPayload, Status};

/// Converts supervisor-observed sub-events into the report stream.
///
/// Holds the last observed URL, screenshot, and step purely to echo current
/// context on emitted events; none of it drives control decisions.
pub struct EventReporter {
    /// Output sink, one JSON object per line
    sink: Box<dyn Write + Send>,
    /// Last URL observed
    current_url: Option<String>,
    /// Last screenshot observed (base64 PNG)
    last_screenshot: Option<String>,
    /// Current step number
    current_step: u32,
    /// Whether the terminal event has been emitted
    terminal_sent: bool,
}

impl EventReporter {
    /// Create a reporter writing to the given sink.
    pub fn with_sink(sink: Box<dyn Write + Send>) -> Self {
        Self {
            sink,
            current_url: None,
            last_screenshot: None,
            current_step: 0,
            terminal_sent: false,
        }
    }

    /// Create a reporter writing to standard output.
    pub fn stdout() -> Self {
        Self::with_sink(Box::new(std::io::stdout()))
    }

    /// Create a reporter that discards all events.
    ///
    /// Used by the library entry point, where the caller consumes the result
    /// directly instead of parsing the stream.
    pub fn discard() -> Self {
        Self::with_sink(Box::new(std::io::sink()))
    }

    /// Write and flush one line. Write failures are logged, not raised:
    /// there is no secondary channel to report them on.
    fn write_line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.sink, "{}", line).and_then(|_| self.sink.flush()) {
            error!("Failed to write report event: {}", e);
        }
    }

    /// Serialize and flush one event, echoing the last known context.
    fn emit(&mut self, mut event: ReportEvent) {
        if event.url.is_none() {
            event.url = self.current_url.clone();
        }
        if event.screenshot.is_none() {
            event.screenshot = self.last_screenshot.clone();
        }
        match serde_json::to_string(&event) {
            Ok(line) => self.write_line(&line),
            Err(e) => error!("Failed to serialize report event: {}", e),
        }
    }

    /// Emit the initial event echoing the full run configuration.
    pub fn report_started(&mut self, run_id: &str, config: &RunConfig) {
        let details = json!({
            "event": "agent_start",
            "config": {
                "agent_id": run_id,
                "model": config.model,
                "headless": config.headless,
                "max_steps": config.max_steps,
                "use_vision": config.use_vision,
                "generate_gif": config.generate_gif,
                "browser_size": config.browser_size.to_string(),
                "instruction": config.instruction,
            }
        });
        self.emit(
            ReportEvent::new(Status::Running, "Agent started")
                .with_step(0)
                .with_details(details),
        );
    }

    /// Record a navigation; a repeated URL emits nothing.
    pub fn update_url(&mut self, url: &str) {
        if url.is_empty() || self.current_url.as_deref() == Some(url) {
            return;
        }
        self.current_url = Some(url.to_string());
        self.emit(
            ReportEvent::new(Status::Running, format!("Navigating to: {}", url))
                .with_details(json!({"event": "navigation", "url": url})),
        );
    }

    /// Record a step advance; an unchanged step number emits nothing.
    pub fn update_step(&mut self, step: u32) {
        if step == 0 || step == self.current_step {
            return;
        }
        self.current_step = step;
        self.emit(
            ReportEvent::new(Status::Running, format!("Step {}", step))
                .with_step(step)
                .with_details(json!({"event": "step"})),
        );
    }

    /// Record a captured screenshot.
    pub fn update_screenshot(&mut self, data: &str) {
        if data.is_empty() {
            return;
        }
        self.last_screenshot = Some(data.to_string());
        self.emit(
            ReportEvent::new(Status::Running, "Screenshot captured")
                .with_details(json!({"event": "screenshot"})),
        );
    }

    /// Emit a diagnostic error event (status stays `running`).
    pub fn report_error(&mut self, message: &str, stack_trace: Option<&str>) {
        let mut details = json!({"event": "error"});
        if let Some(trace) = stack_trace {
            details["stack_trace"] = json!(trace);
        }
        self.emit(
            ReportEvent::new(Status::Running, message)
                .with_level(Level::Error)
                .with_details(details),
        );
    }

    /// Emit an invocation-level error for a run that never started.
    ///
    /// This line keeps the exact three-field shape the orchestrator's
    /// argument-error parser expects: status, message, timestamp.
    pub fn report_usage_error(&mut self, message: &str) {
        let line = json!({
            "status": Status::Error,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        self.write_line(&line.to_string());
    }

    /// Emit the single terminal event for the run.
    ///
    /// Exactly one terminal event closes the stream; later calls are dropped
    /// with a warning.
    pub fn report_terminal(&mut self, outcome: &RunOutcome) {
        if self.terminal_sent {
            warn!("Terminal event already reported; dropping duplicate");
            return;
        }
        self.terminal_sent = true;

        let event = match outcome {
            RunOutcome::Completed {
                text,
                summary,
                url,
                html,
                screenshots,
                gif,
            } => {
                if let Some(url) = url {
                    self.current_url = Some(url.clone());
                }
                if let Some(first) = screenshots.first() {
                    self.last_screenshot = Some(first.clone());
                }

                let mut artifacts: Vec<Artifact> = screenshots
                    .iter()
                    .enumerate()
                    .map(|(i, content)| Artifact::screenshot(i + 1, content.clone()))
                    .collect();
                if let Some(gif) = gif {
                    artifacts.push(Artifact::gif(gif.clone()));
                }

                let result = RunResultPayload {
                    summary: summary.clone().unwrap_or_else(|| "Task completed".to_string()),
                    output_text: text.clone(),
                    url: url.clone(),
                    html_result: html.clone(),
                    screenshot: screenshots.first().cloned(),
                    artifacts: if artifacts.is_empty() {
                        None
                    } else {
                        Some(artifacts)
                    },
                };

                let mut event =
                    ReportEvent::new(Status::Completed, "Agent completed successfully");
                event.result = Some(result);
                event
            }
            RunOutcome::TimedOut { elapsed } => ReportEvent::new(
                Status::Failed,
                format!("Agent execution timed out after {} seconds", elapsed.as_secs()),
            )
            .with_level(Level::Error),
            RunOutcome::Failed {
                message,
                stack_trace,
            } => {
                let mut event = ReportEvent::new(Status::Failed, "Agent failed")
                    .with_level(Level::Error);
                event.error = Some(message.clone());
                event.stack_trace = Some(stack_trace.clone());
                event
            }
        };
        self.emit(event);
    }
}
