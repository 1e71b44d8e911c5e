//! Configuration management for chaser-probe

use crate::{Error, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Bounded wait budgets, all in milliseconds
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Timeouts {
    /// Page-load-critical waits (results, detail title, load state)
    pub page_load_ms: u64,

    /// Collection-presence probes
    pub probe_ms: u64,

    /// Actionability budget for click/fill/select
    pub action_ms: u64,

    /// Ceiling for a whole scenario
    pub scenario_ms: u64,

    /// Interval between polls of the live document
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            page_load_ms: 15_000,
            probe_ms: 10_000,
            action_ms: 15_000,
            scenario_ms: 90_000,
            poll_interval_ms: 100,
        }
    }
}

impl Timeouts {
    pub fn page_load(&self) -> Duration {
        Duration::from_millis(self.page_load_ms)
    }

    pub fn probe(&self) -> Duration {
        Duration::from_millis(self.probe_ms)
    }

    pub fn action(&self) -> Duration {
        Duration::from_millis(self.action_ms)
    }

    pub fn scenario(&self) -> Duration {
        Duration::from_millis(self.scenario_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Harness configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Origin every scenario navigates relative to
    pub base_url: String,

    /// Chrome remote debugging endpoint
    pub cdp_endpoint: String,

    /// Viewport width
    pub viewport_width: u32,

    /// Viewport height
    pub viewport_height: u32,

    /// Delay inserted before each interaction, in milliseconds
    pub slow_mo_ms: u64,

    /// Wait budgets
    pub timeouts: Timeouts,

    /// Maximum scenarios running at once
    pub workers: usize,

    /// Where reports and failure screenshots are written
    pub artifacts_dir: PathBuf,

    /// Where filter fixture files live
    pub data_dir: PathBuf,

    /// Capture a screenshot when a scenario fails
    pub screenshot_on_failure: bool,

    /// Log level
    pub log_level: String,

    /// Log output format
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://www.trademe.co.nz".to_string(),
            cdp_endpoint: "http://localhost:9222".to_string(),
            viewport_width: 1280,
            viewport_height: 720,
            slow_mo_ms: 0,
            timeouts: Timeouts::default(),
            workers: 2,
            artifacts_dir: PathBuf::from("artifacts"),
            data_dir: PathBuf::from("data"),
            screenshot_on_failure: true,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| Error::configuration(format!("Invalid {}", name))),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay `CHASER_*` environment variables onto this configuration
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(base_url) = env::var("CHASER_BASE_URL") {
            self.base_url = base_url;
        }

        if let Ok(endpoint) = env::var("CHASER_CDP_ENDPOINT") {
            self.cdp_endpoint = endpoint;
        }

        if let Some(width) = parse_var("CHASER_VIEWPORT_WIDTH")? {
            self.viewport_width = width;
        }

        if let Some(height) = parse_var("CHASER_VIEWPORT_HEIGHT")? {
            self.viewport_height = height;
        }

        if let Some(slow_mo) = parse_var("CHASER_SLOW_MO")? {
            self.slow_mo_ms = slow_mo;
        }

        if let Some(workers) = parse_var("CHASER_WORKERS")? {
            self.workers = workers;
        }

        if let Some(scenario_ms) = parse_var("CHASER_SCENARIO_TIMEOUT")? {
            self.timeouts.scenario_ms = scenario_ms;
        }

        if let Ok(dir) = env::var("CHASER_ARTIFACTS_DIR") {
            self.artifacts_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = env::var("CHASER_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(screenshots) = parse_var("CHASER_SCREENSHOT_ON_FAILURE")? {
            self.screenshot_on_failure = screenshots;
        }

        if let Ok(log_level) = env::var("CHASER_LOG_LEVEL") {
            self.log_level = log_level;
        }

        if let Ok(format) = env::var("CHASER_LOG_FORMAT") {
            self.log_format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => return Err(Error::configuration("Invalid CHASER_LOG_FORMAT")),
            };
        }

        Ok(())
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text; missing keys keep their defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))
    }

    /// Reject configurations no scenario could run under
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.base_url)
            .map_err(|e| Error::configuration(format!("Invalid base_url {}: {}", self.base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(Error::configuration(format!("base_url {} cannot be a base", self.base_url)));
        }

        if self.workers == 0 {
            return Err(Error::configuration("workers must be at least 1"));
        }

        let t = &self.timeouts;
        if t.page_load_ms == 0 || t.probe_ms == 0 || t.action_ms == 0 || t.scenario_ms == 0 {
            return Err(Error::configuration("timeouts must be non-zero"));
        }
        if t.poll_interval_ms == 0 {
            return Err(Error::configuration("poll_interval_ms must be non-zero"));
        }

        Ok(())
    }
}
