//! Browser agent driver - wraps the agent-browser CLI
//!
//! The external agent is an opaque collaborator reached over a subprocess
//! boundary. The [`BrowserDriver`] trait is the seam the supervisor runs
//! against, so tests can substitute a scripted driver.

use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::agent::outcome::RawRunResult;
use crate::core::{AutobrowseError, Config, Result, RunConfig};

/// A progress side effect observed while the agent runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The agent navigated to a URL
    Navigation { url: String },
    /// The agent advanced to a new step
    Step { step: u32 },
    /// The agent captured a screenshot (base64 PNG)
    Screenshot { data: String },
}

/// Seam between the supervisor and the external automation agent.
#[async_trait]
pub trait BrowserDriver: Send {
    /// Navigate the browser to a URL (used by the readiness probe).
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Run the agent to completion, streaming progress through `progress`.
    ///
    /// Returns the raw final result, or `None` when the agent exited without
    /// emitting one.
    async fn run(
        &mut self,
        instruction: &str,
        progress: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<Option<RawRunResult>>;

    /// Release the browser resources. Called exactly once per run.
    async fn close(&mut self) -> Result<()>;
}

/// One NDJSON line on the agent CLI's stdout.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum StreamLine {
    Navigation { url: String },
    Step { step: u32 },
    Screenshot { data: String },
    Done { result: RawRunResult },
    Error { message: String },
}

/// Production driver that shells out to the agent-browser CLI.
pub struct CliDriver {
    /// Command used to invoke the CLI
    command: String,
    /// Session name for isolation (the run identifier)
    session_name: String,
    /// Run configuration translated into CLI flags
    run: RunConfig,
}

impl CliDriver {
    /// Create a new driver, verifying required credentials first.
    ///
    /// This is the only place a run can fail hard: a missing API key is a
    /// configuration error raised before any browser resource exists.
    pub fn new(config: &Config, run: &RunConfig, session_name: impl Into<String>) -> Result<Self> {
        if std::env::var("OPENAI_API_KEY").map(|v| v.is_empty()).unwrap_or(true) {
            return Err(AutobrowseError::MissingApiKey);
        }

        Ok(Self {
            command: config.agent.command.clone(),
            session_name: session_name.into(),
            run: run.clone(),
        })
    }

    /// Check if the agent CLI is installed.
    pub async fn is_available(command: &str) -> bool {
        Command::new(command)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Map a spawn failure to a driver error.
    fn spawn_error(&self, e: std::io::Error) -> AutobrowseError {
        if e.kind() == std::io::ErrorKind::NotFound {
            AutobrowseError::AgentBrowserNotFound
        } else {
            AutobrowseError::agent(format!("Failed to run {}: {}", self.command, e))
        }
    }

    /// Run a short-lived agent CLI command and return its stdout.
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.command);
        cmd.args(["--session", &self.session_name]);
        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output = cmd.output().await.map_err(|e| self.spawn_error(e))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(AutobrowseError::agent(format!(
                "{} command failed: {}",
                self.command, stderr
            )))
        }
    }

    /// Arguments for the long-running `run` invocation.
    fn run_args(&self, instruction: &str) -> Vec<String> {
        let (width, height) = self.run.window_dimensions();
        let mut args = vec![
            "--session".to_string(),
            self.session_name.clone(),
            "run".to_string(),
            instruction.to_string(),
            "--model".to_string(),
            self.run.model.clone(),
            "--max-steps".to_string(),
            self.run.max_steps.to_string(),
            "--window".to_string(),
            format!("{}x{}", width, height),
            "--json".to_string(),
        ];
        if self.run.headless {
            args.push("--headless".to_string());
        }
        if self.run.use_vision {
            args.push("--vision".to_string());
        }
        if self.run.generate_gif {
            args.push("--gif".to_string());
        }
        args
    }
}

#[async_trait]
impl BrowserDriver for CliDriver {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.run_command(&["open", url]).await?;
        Ok(())
    }

    async fn run(
        &mut self,
        instruction: &str,
        progress: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<Option<RawRunResult>> {
        info!(
            "Running agent: model={}, max_steps={}, browser_size={}",
            self.run.model, self.run.max_steps, self.run.browser_size
        );

        // stderr is dropped rather than piped: nothing drains it during the
        // run, and a full pipe buffer would stall the agent.
        let mut child = Command::new(&self.command)
            .args(self.run_args(instruction))
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AutobrowseError::agent("Failed to capture agent stdout"))?;

        let mut lines = BufReader::new(stdout).lines();
        let mut result = None;

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StreamLine>(&line) {
                Ok(StreamLine::Navigation { url }) => {
                    let _ = progress.send(ProgressEvent::Navigation { url });
                }
                Ok(StreamLine::Step { step }) => {
                    let _ = progress.send(ProgressEvent::Step { step });
                }
                Ok(StreamLine::Screenshot { data }) => {
                    let _ = progress.send(ProgressEvent::Screenshot { data });
                }
                Ok(StreamLine::Done { result: raw }) => {
                    result = Some(raw);
                }
                Ok(StreamLine::Error { message }) => {
                    return Err(AutobrowseError::agent(message));
                }
                Err(e) => {
                    debug!("Ignoring unrecognized agent output line: {} ({})", line, e);
                }
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(AutobrowseError::agent(format!(
                "{} exited with status {}",
                self.command, status
            )));
        }

        if result.is_none() {
            warn!("Agent exited without emitting a final result");
        }
        Ok(result)
    }

    async fn close(&mut self) -> Result<()> {
        self.run_command(&["close"]).await?;
        Ok(())
    }
}
