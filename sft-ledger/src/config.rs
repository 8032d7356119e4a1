//! Configuration for the ledger

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Writer mailbox capacity (bounded for backpressure)
    pub mailbox_capacity: usize,

    /// Event broadcast buffer; slower subscribers lag and skip ahead
    pub event_channel_capacity: usize,

    /// Display decimals of token values
    pub value_decimals: u8,

    /// Snapshot file restored on open and written on request
    pub snapshot_path: Option<PathBuf>,

    /// Write a snapshot during shutdown (requires `snapshot_path`)
    pub snapshot_on_shutdown: bool,

    /// Log output format for the server binary
    pub log_format: LogFormat,

    /// Record Prometheus metrics
    pub metrics_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "sft-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            mailbox_capacity: 1000,
            event_channel_capacity: 1024,
            value_decimals: 18,
            snapshot_path: None,
            snapshot_on_shutdown: false,
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable
    Pretty,
    /// One JSON object per line
    Json,
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Apply `SFT_LEDGER_*` settings found through `lookup` over the defaults
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> crate::Result<Self> {
        let mut config = Config::default();

        if let Some(name) = lookup("SFT_LEDGER_SERVICE_NAME") {
            config.service_name = name;
        }

        if let Some(capacity) = lookup("SFT_LEDGER_MAILBOX_CAPACITY") {
            config.mailbox_capacity = parse_env("SFT_LEDGER_MAILBOX_CAPACITY", &capacity)?;
        }

        if let Some(capacity) = lookup("SFT_LEDGER_EVENT_CHANNEL_CAPACITY") {
            config.event_channel_capacity =
                parse_env("SFT_LEDGER_EVENT_CHANNEL_CAPACITY", &capacity)?;
        }

        if let Some(decimals) = lookup("SFT_LEDGER_VALUE_DECIMALS") {
            config.value_decimals = parse_env("SFT_LEDGER_VALUE_DECIMALS", &decimals)?;
        }

        if let Some(path) = lookup("SFT_LEDGER_SNAPSHOT_PATH") {
            config.snapshot_path = Some(PathBuf::from(path));
        }

        if let Some(flag) = lookup("SFT_LEDGER_SNAPSHOT_ON_SHUTDOWN") {
            config.snapshot_on_shutdown = parse_env("SFT_LEDGER_SNAPSHOT_ON_SHUTDOWN", &flag)?;
        }

        if let Some(format) = lookup("SFT_LEDGER_LOG_FORMAT") {
            config.log_format = match format.as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                other => {
                    return Err(crate::Error::Config(format!(
                        "SFT_LEDGER_LOG_FORMAT must be `json` or `pretty`, got `{}`",
                        other
                    )))
                }
            };
        }

        if let Some(flag) = lookup("SFT_LEDGER_METRICS_ENABLED") {
            config.metrics_enabled = parse_env("SFT_LEDGER_METRICS_ENABLED", &flag)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the ledger cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.mailbox_capacity == 0 {
            return Err(crate::Error::Config("mailbox_capacity must be > 0".to_string()));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::Config(
                "event_channel_capacity must be > 0".to_string(),
            ));
        }
        if self.snapshot_on_shutdown && self.snapshot_path.is_none() {
            return Err(crate::Error::Config(
                "snapshot_on_shutdown requires snapshot_path".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> crate::Result<T> {
    raw.parse()
        .map_err(|_| crate::Error::Config(format!("Invalid value for {}: `{}`", name, raw)))
}
