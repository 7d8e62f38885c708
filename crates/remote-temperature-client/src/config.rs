//! Configuration management.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;

use crate::sanity::SanityBounds;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// URL of the remote server to send temperatures to (required)
    #[serde(default)]
    pub server: Option<String>,

    /// Identifies this device to the server
    #[serde(default = "default_device_id")]
    pub device_id: String,

    /// Time between sensor reads in seconds
    #[serde(default = "default_period")]
    pub period: f64,

    /// Whether readings are checked against the sanity bounds at all
    #[serde(default = "default_sanity_check")]
    pub sanity_check: bool,

    /// Readings below this (degrees C) are discarded
    #[serde(default = "default_sanity_check_low")]
    pub sanity_check_low: Option<f64>,

    /// Readings above this (degrees C) are discarded
    #[serde(default = "default_sanity_check_high")]
    pub sanity_check_high: Option<f64>,

    /// Per-call RPC timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    /// Directory holding one-wire slave devices
    #[serde(default = "default_sensor_dir")]
    pub sensor_dir: PathBuf,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// Severity threshold
    #[serde(default)]
    pub level: LogLevel,

    /// File to append log messages to instead of stderr
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Severity threshold for logged events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
#[value(rename_all = "UPPER")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// The equivalent tracing filter. There is no level above error.
    pub fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }
}

// Default value functions
fn default_device_id() -> String {
    "unknown".to_string()
}

fn default_period() -> f64 {
    60.0
}

fn default_sanity_check() -> bool {
    true
}

fn default_sanity_check_low() -> Option<f64> {
    Some(-15.0)
}

fn default_sanity_check_high() -> Option<f64> {
    Some(100.0)
}

fn default_timeout() -> f64 {
    10.0
}

fn default_sensor_dir() -> PathBuf {
    PathBuf::from(remote_temperature_sensors::W1_DEVICES_DIR)
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!(
                "Failed to read configuration file {}",
                path.as_ref().display()
            )
        })?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Checks the values the poll loop relies on.
    pub fn validate(&self) -> Result<()> {
        match self.server.as_deref() {
            None | Some("") => bail!("No server URL configured (use --server)"),
            Some(_) => {}
        }
        if !self.period.is_finite() || self.period <= 0.0 {
            bail!("Period must be a positive number of seconds, got {}", self.period);
        }
        if !self.timeout.is_finite() || self.timeout <= 0.0 {
            bail!("Timeout must be a positive number of seconds, got {}", self.timeout);
        }
        let bounds = self.sanity_bounds();
        if let (Some(low), Some(high)) = (bounds.low, bounds.high) {
            if low > high {
                bail!("Sanity check low threshold {low}C is above high threshold {high}C");
            }
        }
        Ok(())
    }

    /// The server URL. Call [`Config::validate`] first.
    pub fn server_url(&self) -> &str {
        self.server.as_deref().unwrap_or_default()
    }

    /// Poll period. Call [`Config::validate`] first.
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(self.period)
    }

    /// RPC timeout. Call [`Config::validate`] first.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout)
    }

    /// Bounds readings are checked against.
    pub fn sanity_bounds(&self) -> SanityBounds {
        if self.sanity_check {
            SanityBounds::new(self.sanity_check_low, self.sanity_check_high)
        } else {
            SanityBounds::unbounded()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: None,
            device_id: default_device_id(),
            period: default_period(),
            sanity_check: default_sanity_check(),
            sanity_check_low: default_sanity_check_low(),
            sanity_check_high: default_sanity_check_high(),
            timeout: default_timeout(),
            sensor_dir: default_sensor_dir(),
            log: LogConfig::default(),
        }
    }
}
