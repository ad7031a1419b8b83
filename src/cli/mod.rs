//! Command-line interface for the orchestrator process contract
//!
//! The binary is spawned by an external orchestrator with positional
//! arguments and reports back exclusively through JSON lines on stdout.
//! Arguments are declared optional so that arity is checked by hand: a short
//! invocation must produce a JSON error line, not a clap usage message.

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::{BrowserSize, Config, RunConfig, RunDefaults, RunOutcome};
use crate::report::EventReporter;
use crate::{agent, enhance_instruction};

/// Positional arguments supplied by the orchestrator, in contract order.
///
/// Every positional accepts leading hyphens and trailing extras are
/// swallowed: orchestrator input must never trip a clap usage error, because
/// that would exit without the promised JSON line on stdout.
#[derive(Parser, Debug, Default)]
#[command(name = "autobrowse")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Run identifier assigned by the orchestrator
    #[arg(allow_hyphen_values = true)]
    pub run_id: Option<String>,
    /// Instruction text for the agent
    #[arg(allow_hyphen_values = true)]
    pub instruction: Option<String>,
    /// Model identifier
    #[arg(allow_hyphen_values = true)]
    pub model: Option<String>,
    /// "true" to run the browser headless
    #[arg(allow_hyphen_values = true)]
    pub headless: Option<String>,
    /// Maximum number of agent steps
    #[arg(allow_hyphen_values = true)]
    pub max_steps: Option<String>,
    /// "true" to enable vision capabilities
    #[arg(allow_hyphen_values = true)]
    pub use_vision: Option<String>,
    /// "true" to generate a session GIF
    #[arg(allow_hyphen_values = true)]
    pub generate_gif: Option<String>,
    /// Browser window size: mobile, tablet, or pc
    #[arg(allow_hyphen_values = true)]
    pub browser_size: Option<String>,
    /// Extra arguments are accepted and ignored
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    pub extra: Vec<String>,
}

impl Args {
    /// Convert to a run configuration; `None` when any argument is missing.
    pub fn into_run(self) -> Option<(String, RunConfig)> {
        let run_id = self.run_id?;
        let instruction = self.instruction?;
        let model = self.model?;
        let headless = parse_flag(&self.headless?);
        let max_steps_arg = self.max_steps?;
        let use_vision = parse_flag(&self.use_vision?);
        let generate_gif = parse_flag(&self.generate_gif?);
        let browser_size = BrowserSize::parse_or_default(&self.browser_size?);

        let max_steps = max_steps_arg.parse().unwrap_or_else(|_| {
            let fallback = RunDefaults::default().max_steps;
            warn!(
                "Invalid max_steps value '{}'. Using default {}.",
                max_steps_arg, fallback
            );
            fallback
        });

        Some((
            run_id,
            RunConfig {
                instruction,
                model,
                headless,
                max_steps,
                use_vision,
                generate_gif,
                browser_size,
                initial_url: None,
            },
        ))
    }
}

/// Orchestrator flags are the literal string "true"; anything else is false.
fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

/// Install the logging stack: stderr always, plus a per-run log file.
///
/// Stdout is reserved for the report stream, so nothing here may write to it.
/// The log file is diagnostic only; failing to create it downgrades to
/// stderr-only logging.
fn init_logging(run_id: Option<&str>) {
    let file_layer = run_id.and_then(|id| {
        let path = format!("agent_{}.log", id);
        match std::fs::File::create(&path) {
            Ok(file) => Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            ),
            Err(e) => {
                eprintln!("Warning: could not create log file {}: {}", path, e);
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
}

/// Entry point for the spawned process.
pub async fn run() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    init_logging(args.run_id.as_deref());

    let mut reporter = EventReporter::stdout();
    let Some((run_id, mut run)) = args.into_run() else {
        error!("Not enough arguments provided.");
        reporter.report_usage_error("Not enough arguments provided");
        return Ok(());
    };

    let config = Config::load();
    info!("Starting agent {} with instruction: {}", run_id, run.instruction);
    info!("Using browser size: {}", run.browser_size);

    run.instruction = enhance_instruction(&run.instruction, run.initial_url.as_deref());
    reporter.report_started(&run_id, &run);

    match agent::supervise(&config, &run, &run_id, &mut reporter).await {
        Ok(outcome) => {
            if let RunOutcome::Failed {
                message,
                stack_trace,
            } = &outcome
            {
                reporter.report_error(message, Some(stack_trace));
            }
            reporter.report_terminal(&outcome);
        }
        Err(e) => {
            // Construction-time configuration failure; no resources acquired.
            let stack_trace = e.chain_description();
            error!("Error creating agent instance: {}", e);
            reporter.report_error(&e.to_string(), Some(&stack_trace));
            reporter.report_terminal(&RunOutcome::Failed {
                message: e.to_string(),
                stack_trace,
            });
        }
    }

    Ok(())
}
