//! Agent module - supervision of the external browser agent
//!
//! Contains the driver seam to the external automation CLI, the boundary
//! result decoder, and the run supervisor.

pub mod driver;
pub mod outcome;
pub mod supervisor;

pub use driver::{BrowserDriver, CliDriver, ProgressEvent};
pub use outcome::{normalize, RawRunResult, StructuredResult};
pub use supervisor::{supervise, RunSupervisor, RUN_TIMEOUT};
