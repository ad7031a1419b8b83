//! Run supervisor
//!
//! Owns exactly one run's lifecycle: readiness probe, the deadline-bounded
//! agent run, outcome normalization, history persistence, and guaranteed
//! single cleanup of the browser resources.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::agent::driver::{BrowserDriver, CliDriver, ProgressEvent};
use crate::agent::outcome::{normalize, RawRunResult};
use crate::core::{Config, Result, RunConfig, RunOutcome};
use crate::report::EventReporter;

/// Hard wall-clock deadline for one agent run.
pub const RUN_TIMEOUT: Duration = Duration::from_secs(300);

/// Supervises a single agent run end-to-end.
///
/// `execute` consumes the supervisor, so cleanup runs exactly once on every
/// exit path. Expected failure modes (timeout, downstream error) are folded
/// into [`RunOutcome`] variants rather than raised.
pub struct RunSupervisor<D: BrowserDriver> {
    driver: D,
    probe_url: String,
    history_path: PathBuf,
    timeout: Duration,
}

impl<D: BrowserDriver> RunSupervisor<D> {
    /// Create a supervisor around an already-constructed driver.
    pub fn new(driver: D, config: &Config) -> Self {
        Self {
            driver,
            probe_url: config.agent.probe_url.clone(),
            history_path: config.agent.history_path.clone(),
            timeout: RUN_TIMEOUT,
        }
    }

    /// Override the run deadline. Used by tests; production keeps [`RUN_TIMEOUT`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Drive the run to its terminal outcome.
    pub async fn execute(mut self, run: &RunConfig, reporter: &mut EventReporter) -> RunOutcome {
        let outcome = self.drive(run, reporter).await;
        self.cleanup().await;
        outcome
    }

    async fn drive(&mut self, run: &RunConfig, reporter: &mut EventReporter) -> RunOutcome {
        info!("Starting agent run with instruction: {}", run.instruction);

        // Readiness probe: purely diagnostic, never aborts the run.
        info!("Performing browser readiness check...");
        match self.driver.goto(&self.probe_url).await {
            Ok(()) => info!("Browser readiness check passed"),
            Err(e) => warn!("Browser readiness check failed: {}. Continuing anyway...", e),
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let timeout = self.timeout;

        // Race the run against the deadline, forwarding progress as it
        // arrives. On timeout the run future is dropped and the underlying
        // agent is abandoned, not killed: the external CLI gives no
        // preemption guarantees, so best-effort abandonment is the accepted
        // behavior here.
        let result = {
            let deadline = tokio::time::sleep(timeout);
            tokio::pin!(deadline);
            let run_fut = self.driver.run(&run.instruction, tx);
            tokio::pin!(run_fut);

            loop {
                tokio::select! {
                    () = &mut deadline => break None,
                    Some(event) = rx.recv() => {
                        forward_progress(reporter, event);
                    }
                    result = &mut run_fut => break Some(result),
                }
            }
        };

        // Deliver progress that raced with the deadline or completion, so
        // the stream is consistent across outcomes.
        while let Ok(event) = rx.try_recv() {
            forward_progress(reporter, event);
        }

        let Some(result) = result else {
            error!(
                "Agent execution timed out after {} seconds",
                timeout.as_secs()
            );
            return RunOutcome::TimedOut { elapsed: timeout };
        };

        match result {
            Ok(raw) => {
                info!("Agent run completed");
                self.persist_history(&raw);
                normalize(raw)
            }
            Err(e) => {
                let stack_trace = e.chain_description();
                error!("Error running browser agent: {}", e);
                RunOutcome::Failed {
                    message: e.to_string(),
                    stack_trace,
                }
            }
        }
    }

    /// Persist the step-by-step history as a local artifact. Best effort.
    fn persist_history(&self, raw: &Option<RawRunResult>) {
        let Some(RawRunResult::Structured(result)) = raw else {
            return;
        };
        let Some(history) = &result.history else {
            warn!("Agent result has no history to save");
            return;
        };
        match serde_json::to_string_pretty(history) {
            Ok(json) => match fs::write(&self.history_path, json) {
                Ok(()) => info!("History saved to {}", self.history_path.display()),
                Err(e) => warn!("Failed to save history: {}", e),
            },
            Err(e) => warn!("Failed to serialize history: {}", e),
        }
    }

    /// Release browser resources, tolerating cleanup errors.
    async fn cleanup(&mut self) {
        info!("Cleaning up browser resources");
        match self.driver.close().await {
            Ok(()) => info!("Browser closed successfully"),
            Err(e) => error!("Error during cleanup: {}", e),
        }
    }
}

/// Hand one driver progress event to the reporter.
fn forward_progress(reporter: &mut EventReporter, event: ProgressEvent) {
    match event {
        ProgressEvent::Navigation { url } => reporter.update_url(&url),
        ProgressEvent::Step { step } => reporter.update_step(step),
        ProgressEvent::Screenshot { data } => reporter.update_screenshot(&data),
    }
}

/// Construct the production driver and supervise a run with it.
///
/// Only driver construction may fail here (missing credential); everything
/// past that point is folded into the returned [`RunOutcome`].
pub async fn supervise(
    config: &Config,
    run: &RunConfig,
    session: &str,
    reporter: &mut EventReporter,
) -> Result<RunOutcome> {
    if !CliDriver::is_available(&config.agent.command).await {
        warn!(
            "{} not found on PATH; the run will fail unless it is installed",
            config.agent.command
        );
    }
    let driver = CliDriver::new(config, run, session)?;
    Ok(RunSupervisor::new(driver, config).execute(run, reporter).await)
}
