//! Run supervision integration tests
//!
//! Exercises the supervisor against a scripted driver and inspects the
//! JSON-line stream produced by the reporter.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use autobrowse::agent::{BrowserDriver, ProgressEvent, RawRunResult, RunSupervisor};
use autobrowse::core::{AutobrowseError, Config, Result, RunConfig};
use autobrowse::EventReporter;

/// Cloneable in-memory sink for inspecting the report stream.
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn events(buf: &SharedBuf) -> Vec<serde_json::Value> {
    let bytes = buf.0.lock().unwrap().clone();
    String::from_utf8(bytes)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).expect("every line is a JSON object"))
        .collect()
}

fn terminal_events(all: &[serde_json::Value]) -> Vec<&serde_json::Value> {
    all.iter()
        .filter(|e| e["status"] == "completed" || e["status"] == "failed")
        .collect()
}

/// What the scripted driver should do when its run is invoked.
enum RunScript {
    /// Return this raw result
    Complete(Option<RawRunResult>),
    /// Fail with this message
    Fail(String),
    /// Never return (for timeout tests)
    Hang,
}

/// Scripted driver with instrumented acquisition/release.
struct FakeDriver {
    script: RunScript,
    probe_fails: bool,
    progress: Vec<ProgressEvent>,
    goto_calls: Arc<AtomicUsize>,
    close_calls: Arc<AtomicUsize>,
}

impl FakeDriver {
    fn new(script: RunScript) -> Self {
        Self {
            script,
            probe_fails: false,
            progress: Vec::new(),
            goto_calls: Arc::new(AtomicUsize::new(0)),
            close_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn with_progress(mut self, progress: Vec<ProgressEvent>) -> Self {
        self.progress = progress;
        self
    }

    fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.close_calls)
    }

    fn goto_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.goto_calls)
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn goto(&mut self, _url: &str) -> Result<()> {
        self.goto_calls.fetch_add(1, Ordering::SeqCst);
        if self.probe_fails {
            return Err(AutobrowseError::agent("display not available"));
        }
        Ok(())
    }

    async fn run(
        &mut self,
        _instruction: &str,
        progress: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<Option<RawRunResult>> {
        for event in self.progress.drain(..) {
            let _ = progress.send(event);
        }
        match &self.script {
            RunScript::Complete(raw) => Ok(raw.clone()),
            RunScript::Fail(message) => Err(AutobrowseError::agent(message.clone())),
            RunScript::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn test_config(dir: &tempfile::TempDir) -> Config {
    let mut config = Config::default();
    config.agent.history_path = dir.path().join("agent_history.json");
    config
}

fn structured(json: serde_json::Value) -> Option<RawRunResult> {
    Some(serde_json::from_value(json).unwrap())
}

async fn supervise_with(
    driver: FakeDriver,
    config: &Config,
) -> (Vec<serde_json::Value>, autobrowse::RunOutcome) {
    let buf = SharedBuf::default();
    let mut reporter = EventReporter::with_sink(Box::new(buf.clone()));
    let run = RunConfig::new("Summarize the front page of example.com");

    let outcome = RunSupervisor::new(driver, config)
        .execute(&run, &mut reporter)
        .await;
    reporter.report_terminal(&outcome);

    (events(&buf), outcome)
}

#[tokio::test]
async fn successful_run_reports_progress_and_one_completed_event() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let driver = FakeDriver::new(RunScript::Complete(structured(serde_json::json!({
        "summary": "Front page summarized",
        "result": "The front page is a single illustrative example domain",
        "url": "https://example.com",
        "screenshots": ["c2hvdDE=", "c2hvdDI="]
    }))))
    .with_progress(vec![
        ProgressEvent::Navigation {
            url: "https://example.com".to_string(),
        },
        ProgressEvent::Step { step: 1 },
        ProgressEvent::Step { step: 1 },
        ProgressEvent::Screenshot {
            data: "c2hvdDE=".to_string(),
        },
        ProgressEvent::Step { step: 2 },
    ]);
    let closes = driver.close_counter();
    let gotos = driver.goto_counter();

    let (all, outcome) = supervise_with(driver, &config).await;

    assert!(outcome.is_completed());
    assert_eq!(gotos.load(Ordering::SeqCst), 1, "readiness probe ran once");
    assert_eq!(closes.load(Ordering::SeqCst), 1, "cleanup ran exactly once");

    // duplicate step 1 was de-duplicated: navigation, step 1, screenshot, step 2
    let running: Vec<_> = all.iter().filter(|e| e["status"] == "running").collect();
    assert_eq!(running.len(), 4);

    let terminals = terminal_events(&all);
    assert_eq!(terminals.len(), 1);
    let terminal = terminals[0];
    assert_eq!(terminal["status"], "completed");
    assert_eq!(terminal["result"]["summary"], "Front page summarized");
    let artifacts = terminal["result"]["artifacts"].as_array().unwrap();
    assert_eq!(artifacts.len(), 2);
    assert_eq!(artifacts[0]["name"], "screenshot_1.png");
    assert_eq!(artifacts[1]["name"], "screenshot_2.png");
    assert_eq!(terminal["result"]["screenshot"], "c2hvdDE=");
    assert_eq!(terminal["screenshot"], "c2hvdDE=");
}

#[tokio::test]
async fn run_without_screenshots_has_no_artifacts_key() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let driver = FakeDriver::new(RunScript::Complete(Some(RawRunResult::Text(
        "plain text answer".to_string(),
    ))));

    let (all, _) = supervise_with(driver, &config).await;
    let terminals = terminal_events(&all);
    assert_eq!(terminals.len(), 1);
    let result = terminals[0]["result"].as_object().unwrap();
    assert_eq!(result["outputText"], "plain text answer");
    assert!(!result.contains_key("artifacts"));
}

#[tokio::test(start_paused = true)]
async fn hung_run_times_out_with_single_failed_event() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let driver = FakeDriver::new(RunScript::Hang);
    let closes = driver.close_counter();

    let buf = SharedBuf::default();
    let mut reporter = EventReporter::with_sink(Box::new(buf.clone()));
    let run = RunConfig::new("Summarize the front page of example.com");

    let outcome = RunSupervisor::new(driver, &config)
        .with_timeout(Duration::from_secs(5))
        .execute(&run, &mut reporter)
        .await;
    reporter.report_terminal(&outcome);

    assert!(matches!(outcome, autobrowse::RunOutcome::TimedOut { .. }));
    assert_eq!(closes.load(Ordering::SeqCst), 1, "cleanup still ran once");

    let all = events(&buf);
    let terminals = terminal_events(&all);
    assert_eq!(terminals.len(), 1);
    assert_eq!(terminals[0]["status"], "failed");
    assert_eq!(
        terminals[0]["message"],
        "Agent execution timed out after 5 seconds"
    );
}

#[tokio::test(start_paused = true)]
async fn timed_out_run_still_reports_queued_progress() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let driver = FakeDriver::new(RunScript::Hang).with_progress(vec![
        ProgressEvent::Navigation {
            url: "https://example.com/checkout".to_string(),
        },
        ProgressEvent::Step { step: 1 },
    ]);

    let buf = SharedBuf::default();
    let mut reporter = EventReporter::with_sink(Box::new(buf.clone()));
    let run = RunConfig::new("Summarize the front page of example.com");

    let outcome = RunSupervisor::new(driver, &config)
        .with_timeout(Duration::from_secs(5))
        .execute(&run, &mut reporter)
        .await;
    reporter.report_terminal(&outcome);

    assert!(matches!(outcome, autobrowse::RunOutcome::TimedOut { .. }));

    // progress emitted before the deadline is in the stream, ahead of the
    // terminal event
    let all = events(&buf);
    let running: Vec<_> = all.iter().filter(|e| e["status"] == "running").collect();
    assert_eq!(running.len(), 2);
    assert_eq!(running[0]["url"], "https://example.com/checkout");
    assert_eq!(running[1]["step"], 1);

    let terminals = terminal_events(&all);
    assert_eq!(terminals.len(), 1);
    assert_eq!(terminals[0]["status"], "failed");
    assert_eq!(
        all.last().unwrap()["status"],
        "failed",
        "terminal event comes after all progress"
    );
}

#[tokio::test]
async fn failing_run_reports_error_and_trace() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let driver = FakeDriver::new(RunScript::Fail("tab crashed".to_string()));
    let closes = driver.close_counter();

    let (all, outcome) = supervise_with(driver, &config).await;

    assert!(matches!(outcome, autobrowse::RunOutcome::Failed { .. }));
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    let terminals = terminal_events(&all);
    assert_eq!(terminals.len(), 1);
    let terminal = terminals[0];
    assert_eq!(terminal["status"], "failed");
    assert!(!terminal["error"].as_str().unwrap().is_empty());
    assert!(!terminal["stack_trace"].as_str().unwrap().is_empty());
    assert!(terminal["error"].as_str().unwrap().contains("tab crashed"));
}

#[tokio::test]
async fn probe_failure_does_not_abort_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let mut driver = FakeDriver::new(RunScript::Complete(Some(RawRunResult::Text(
        "made it anyway".to_string(),
    ))));
    driver.probe_fails = true;
    let closes = driver.close_counter();

    let (all, outcome) = supervise_with(driver, &config).await;

    assert!(outcome.is_completed());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    let terminals = terminal_events(&all);
    assert_eq!(terminals[0]["result"]["outputText"], "made it anyway");
}

#[tokio::test]
async fn history_is_persisted_as_side_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let driver = FakeDriver::new(RunScript::Complete(structured(serde_json::json!({
        "history": [
            {"result": [{"is_done": false, "extracted_content": "step one"}]},
            {"result": [{"is_done": true, "extracted_content": "final"}]}
        ]
    }))));

    let (all, _) = supervise_with(driver, &config).await;

    let saved = std::fs::read_to_string(config.agent.history_path.clone()).unwrap();
    let history: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(history.as_array().unwrap().len(), 2);

    let terminals = terminal_events(&all);
    assert_eq!(terminals[0]["result"]["outputText"], "final");
}
