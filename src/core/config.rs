//! Configuration management for autobrowse
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/autobrowse/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

use crate::core::error::{AutobrowseError, Result};

/// Predefined browser window size classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrowserSize {
    /// 390x844
    #[default]
    Mobile,
    /// 810x1080
    Tablet,
    /// 1366x768
    Pc,
}

impl BrowserSize {
    /// Window dimensions as (width, height) in pixels.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            BrowserSize::Mobile => (390, 844),
            BrowserSize::Tablet => (810, 1080),
            BrowserSize::Pc => (1366, 768),
        }
    }

    /// Resolve a size name, falling back to `Mobile` on unrecognized input.
    ///
    /// Invalid values are recovered, never rejected: the orchestrator contract
    /// treats browser size as a hint.
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "mobile" => BrowserSize::Mobile,
            "tablet" => BrowserSize::Tablet,
            "pc" => BrowserSize::Pc,
            other => {
                warn!("Invalid browser_size '{}'. Using 'mobile' as default.", other);
                BrowserSize::Mobile
            }
        }
    }
}

impl std::fmt::Display for BrowserSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrowserSize::Mobile => write!(f, "mobile"),
            BrowserSize::Tablet => write!(f, "tablet"),
            BrowserSize::Pc => write!(f, "pc"),
        }
    }
}

/// Immutable input to a single supervised run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Instruction text for the agent
    pub instruction: String,
    /// Model identifier passed through to the agent
    pub model: String,
    /// Whether to run the browser headless
    pub headless: bool,
    /// Maximum number of agent steps
    pub max_steps: u32,
    /// Whether the agent should use vision capabilities
    pub use_vision: bool,
    /// Whether to generate a GIF of the browsing session
    pub generate_gif: bool,
    /// Browser window size class
    pub browser_size: BrowserSize,
    /// Optional starting URL for the browser
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_url: Option<String>,
}

impl RunConfig {
    /// Create a run configuration with environment-aware defaults.
    pub fn new(instruction: impl Into<String>) -> Self {
        let defaults = RunDefaults::default();
        Self {
            instruction: instruction.into(),
            model: defaults.model,
            headless: defaults.headless,
            max_steps: defaults.max_steps,
            use_vision: defaults.use_vision,
            generate_gif: defaults.generate_gif,
            browser_size: defaults.browser_size,
            initial_url: None,
        }
    }

    /// Set the starting URL, ignoring values that do not parse as URLs.
    pub fn with_initial_url(mut self, initial_url: impl Into<String>) -> Self {
        let initial_url: String = initial_url.into();
        match url::Url::parse(&initial_url) {
            Ok(_) => self.initial_url = Some(initial_url),
            Err(e) => warn!("Ignoring invalid initial_url '{}': {}", initial_url, e),
        }
        self
    }

    /// Window dimensions for the configured size class.
    pub fn window_dimensions(&self) -> (u32, u32) {
        self.browser_size.dimensions()
    }
}

/// Per-run defaults, overridable through the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunDefaults {
    /// Model identifier (default: gpt-4o)
    pub model: String,
    /// Headless default (env: DEFAULT_HEADLESS)
    pub headless: bool,
    /// Step limit default (env: DEFAULT_MAX_STEPS, default: 50)
    pub max_steps: u32,
    /// Vision default
    pub use_vision: bool,
    /// GIF generation default
    pub generate_gif: bool,
    /// Window size default
    pub browser_size: BrowserSize,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            model: env::var("DEFAULT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            headless: env::var("DEFAULT_HEADLESS")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(false),
            max_steps: env::var("DEFAULT_MAX_STEPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),
            use_vision: true,
            generate_gif: false,
            browser_size: BrowserSize::Mobile,
        }
    }
}

/// Settings for reaching the external browser agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Command used to invoke the agent CLI (env: AUTOBROWSE_AGENT_COMMAND)
    pub command: String,
    /// Neutral page used for the readiness probe
    pub probe_url: String,
    /// Local path the step-by-step history is persisted to
    pub history_path: PathBuf,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            command: env::var("AUTOBROWSE_AGENT_COMMAND")
                .unwrap_or_else(|_| "agent-browser".to_string()),
            probe_url: "https://example.com".to_string(),
            history_path: PathBuf::from("./agent_history.json"),
        }
    }
}

/// Application configuration for autobrowse
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External agent settings
    pub agent: AgentSettings,
    /// Per-run defaults
    pub defaults: RunDefaults,
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("autobrowse")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: env vars > config file > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        // Try to load from config file
        if let Ok(config) = Self::load_from_file() {
            return config;
        }

        // Fall back to defaults (which respect env vars)
        Self::default()
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(AutobrowseError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| AutobrowseError::config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| AutobrowseError::config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_size_dimensions() {
        assert_eq!(BrowserSize::Mobile.dimensions(), (390, 844));
        assert_eq!(BrowserSize::Tablet.dimensions(), (810, 1080));
        assert_eq!(BrowserSize::Pc.dimensions(), (1366, 768));
    }

    #[test]
    fn test_browser_size_resolution() {
        assert_eq!(BrowserSize::parse_or_default("mobile"), BrowserSize::Mobile);
        assert_eq!(BrowserSize::parse_or_default("tablet"), BrowserSize::Tablet);
        assert_eq!(BrowserSize::parse_or_default("pc"), BrowserSize::Pc);
    }

    #[test]
    fn test_invalid_browser_size_falls_back_to_mobile() {
        let size = BrowserSize::parse_or_default("widescreen");
        assert_eq!(size, BrowserSize::Mobile);
        assert_eq!(size.dimensions(), (390, 844));
    }

    #[test]
    fn test_run_config_defaults() {
        let run = RunConfig::new("find the pricing page");
        assert_eq!(run.model, "gpt-4o");
        assert_eq!(run.max_steps, 50);
        assert!(run.use_vision);
        assert!(!run.generate_gif);
        assert_eq!(run.browser_size, BrowserSize::Mobile);
        assert!(run.initial_url.is_none());
    }

    #[test]
    fn test_invalid_initial_url_is_ignored() {
        let run = RunConfig::new("task").with_initial_url("not a url");
        assert!(run.initial_url.is_none());

        let run = RunConfig::new("task").with_initial_url("https://example.org");
        assert_eq!(run.initial_url.as_deref(), Some("https://example.org"));
    }

    #[test]
    fn test_config_roundtrips_through_toml() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.agent.probe_url, "https://example.com");
        assert_eq!(parsed.defaults.model, config.defaults.model);
    }

    #[test]
    fn test_config_dir() {
        let dir = Config::config_dir();
        assert!(dir.to_string_lossy().contains("autobrowse"));
    }
}
