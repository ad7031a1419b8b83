//! Core module - shared infrastructure for autobrowse
//!
//! This module contains foundational types, configuration, and error handling
//! used throughout the application.

pub mod config;
pub mod error;
pub mod types;

pub use config::{BrowserSize, Config, RunConfig, RunDefaults};
pub use error::{AutobrowseError, Result};
pub use types::*;
