//! Service configuration
//!
//! Loaded in layers: compiled defaults, then `SLASRV_*` environment
//! variables, then an optional YAML file.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use common::config_loader::ConfigLoader;
use opsdesk_model::TicketPriority;
use opsdesk_sla::{MonitorConfig, PriorityHours, SlaThresholds};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlasrvError};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Monitor configuration
    #[serde(default)]
    pub monitor: MonitorSettings,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Service port
    #[serde(default = "default_service_port")]
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

/// SLA monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Interval between breach-check passes in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Dedup window for repeated alerts in hours
    #[serde(default = "default_dedup_window_hours")]
    pub dedup_window_hours: i64,

    /// Elapsed-ratio warning threshold, used until persisted configuration
    /// is loaded at monitor start
    #[serde(default = "default_warning_ratio")]
    pub warning_ratio: f64,

    /// Elapsed-ratio critical threshold, same fallback role
    #[serde(default = "default_critical_ratio")]
    pub critical_ratio: f64,

    /// Compute deadlines for new tickets in business hours instead of
    /// wall-clock hours
    #[serde(default)]
    pub business_hours_only: bool,

    /// Per-priority resolution hours (priority code -> hours). Persisted
    /// configuration takes precedence over these; both fall back to the
    /// compiled-in defaults.
    #[serde(default)]
    pub resolution_hours: HashMap<String, u32>,
}

impl Config {
    /// Load configuration from the default file locations
    pub fn load() -> Result<Self> {
        let config_paths = ["config/slasrv.yaml", "slasrv.yaml"];
        let yaml_path = config_paths
            .iter()
            .find(|path| Path::new(path).exists())
            .map(|path| path.to_string());

        let loader = ConfigLoader::new()
            .with_defaults(Config::default())
            .with_env_prefix("SLASRV");

        let loader = match yaml_path {
            Some(path) => loader.with_yaml_file(&path),
            None => loader,
        };

        loader
            .build()
            .map_err(|e| SlasrvError::Config(format!("Failed to load config: {}", e)))
    }

    /// Load configuration from an explicit file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SlasrvError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        ConfigLoader::new()
            .with_defaults(Config::default())
            .with_env_prefix("SLASRV")
            .with_yaml_file(&path.to_string_lossy())
            .build()
            .map_err(|e| SlasrvError::Config(format!("Failed to load config: {}", e)))
    }

    /// Engine monitor configuration derived from the settings
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_millis(self.monitor.poll_interval_ms),
            dedup_window_hours: self.monitor.dedup_window_hours,
        }
    }

    /// Initial thresholds, in effect until persisted values load
    pub fn thresholds(&self) -> SlaThresholds {
        SlaThresholds {
            warning_ratio: self.monitor.warning_ratio,
            critical_ratio: self.monitor.critical_ratio,
        }
    }

    /// Per-priority resolution hours from the environment-level config.
    /// Unknown priority codes are skipped.
    pub fn priority_hours(&self) -> PriorityHours {
        let mut hours = PriorityHours::default();
        for (code, value) in &self.monitor.resolution_hours {
            if let Some(priority) = TicketPriority::from_code(code) {
                hours.set(priority, *value);
            }
        }
        hours
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            service: ServiceConfig::default(),
            database: DatabaseConfig::default(),
            monitor: MonitorSettings::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            name: default_service_name(),
            port: default_service_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            url: default_database_url(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        MonitorSettings {
            poll_interval_ms: default_poll_interval_ms(),
            dedup_window_hours: default_dedup_window_hours(),
            warning_ratio: default_warning_ratio(),
            critical_ratio: default_critical_ratio(),
            business_hours_only: false,
            resolution_hours: HashMap::new(),
        }
    }
}

// Default value functions
fn default_service_name() -> String {
    "slasrv".to_string()
}

fn default_service_port() -> u16 {
    6010
}

fn default_database_url() -> String {
    "sqlite://data/opsdesk.db?mode=rwc".to_string()
}

fn default_poll_interval_ms() -> u64 {
    900_000 // 15 minutes
}

fn default_dedup_window_hours() -> i64 {
    24
}

fn default_warning_ratio() -> f64 {
    0.8
}

fn default_critical_ratio() -> f64 {
    0.95
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.service.port, 6010);
        assert_eq!(config.monitor.poll_interval_ms, 900_000);
        assert_eq!(config.monitor.dedup_window_hours, 24);
        assert!(!config.monitor.business_hours_only);
    }

    #[test]
    fn test_priority_hours_from_settings() {
        let mut config = Config::default();
        config
            .monitor
            .resolution_hours
            .insert("high".to_string(), 8);
        config
            .monitor
            .resolution_hours
            .insert("bogus".to_string(), 1);

        let hours = config.priority_hours();
        assert_eq!(hours.hours_for(TicketPriority::High), 8);
        // Unknown codes skipped, others default
        assert_eq!(hours.hours_for(TicketPriority::Medium), 72);
    }

    #[test]
    fn test_monitor_config_conversion() {
        let config = Config::default();
        let monitor = config.monitor_config();
        assert_eq!(monitor.poll_interval, Duration::from_millis(900_000));
        assert_eq!(monitor.dedup_window_hours, 24);

        let thresholds = config.thresholds();
        assert_eq!(thresholds.warning_ratio, 0.8);
        assert_eq!(thresholds.critical_ratio, 0.95);
    }
}
