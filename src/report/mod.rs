//! Report module - structured JSON-line event stream
//!
//! Contains the event model and the reporter that emits one JSON object per
//! line to the external orchestrator.

pub mod event;
pub mod reporter;

pub use event::{Level, ReportEvent, RunResultPayload, Status};
pub use reporter::EventReporter;
