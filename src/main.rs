//! autobrowse - supervised browser agent runner
//!
//! Spawned by an external orchestrator; all machine-readable output goes to
//! stdout as JSON lines, logging to stderr and the per-run log file.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    autobrowse::cli::run().await
}
