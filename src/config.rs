//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::scheduler::SchedulerConfig;
use crate::strategy::ExtractSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const LOCAL_CONFIG: &str = "product-lens.toml";
const APP_DIR: &str = "product-lens";

/// Application configuration with layered loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Proxy URL (e.g., socks5://host:port)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Base delay before each request in milliseconds
    #[serde(default)]
    pub delay_ms: u64,

    /// Random jitter added to delay (0 to this value)
    #[serde(default = "default_delay_jitter_ms")]
    pub delay_jitter_ms: u64,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Wait after page load before the first detection pass
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Quiet period closing a burst of page mutations
    #[serde(default = "default_mutation_debounce_ms")]
    pub mutation_debounce_ms: u64,

    /// URL check interval while no product has been found
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// URL check interval once a product was reported
    #[serde(default = "default_steady_poll_interval_ms")]
    pub steady_poll_interval_ms: u64,

    /// Failed detection passes before giving up on a URL
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base retry delay, multiplied by the attempt number
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Upper bound for a size-list reveal probe
    #[serde(default = "default_reveal_timeout_ms")]
    pub reveal_timeout_ms: u64,

    /// Images with a side at or below this are ignored
    #[serde(default = "default_min_image_side")]
    pub min_image_side: f64,

    /// Images with both sides above this are preferred
    #[serde(default = "default_preferred_image_side")]
    pub preferred_image_side: f64,
}

fn default_delay_jitter_ms() -> u64 {
    500
}

fn default_settle_delay_ms() -> u64 {
    1500
}

fn default_mutation_debounce_ms() -> u64 {
    750
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_steady_poll_interval_ms() -> u64 {
    15000
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_reveal_timeout_ms() -> u64 {
    1500
}

fn default_min_image_side() -> f64 {
    100.0
}

fn default_preferred_image_side() -> f64 {
    300.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy: None,
            delay_ms: 0,
            delay_jitter_ms: default_delay_jitter_ms(),
            format: OutputFormat::Table,
            settle_delay_ms: default_settle_delay_ms(),
            mutation_debounce_ms: default_mutation_debounce_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            steady_poll_interval_ms: default_steady_poll_interval_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            reveal_timeout_ms: default_reveal_timeout_ms(),
            min_image_side: default_min_image_side(),
            preferred_image_side: default_preferred_image_side(),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new(LOCAL_CONFIG);
        if local_config.exists() {
            debug!("Found {} in current directory", LOCAL_CONFIG);
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join(APP_DIR).join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        // 4. Return default config
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies `LENS_*` environment variable overrides. Unparsable values are
    /// ignored.
    pub fn with_env(mut self) -> Self {
        if let Ok(proxy) = std::env::var("LENS_PROXY") {
            self.proxy = Some(proxy);
        }

        if let Some(delay) = env_number("LENS_DELAY") {
            self.delay_ms = delay;
        }

        if let Some(retries) = env_number("LENS_MAX_RETRIES") {
            self.max_retries = retries;
        }

        if let Some(interval) = env_number("LENS_POLL_INTERVAL") {
            self.poll_interval_ms = interval;
        }

        self
    }

    /// Timing and retry policy for the detection scheduler.
    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            mutation_debounce: Duration::from_millis(self.mutation_debounce_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            steady_poll_interval: Duration::from_millis(self.steady_poll_interval_ms),
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    /// Tunables handed to every extraction strategy.
    pub fn extract_settings(&self) -> ExtractSettings {
        ExtractSettings {
            min_image_side: self.min_image_side,
            preferred_image_side: self.preferred_image_side,
            reveal_timeout: Duration::from_millis(self.reveal_timeout_ms),
        }
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!("Unknown format: {}. Use: table, json, markdown", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}
