// src/config.rs
//! Configuration: navigation tunables and source settings, JSON persisted

use crate::error::{NavError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Navigation tunables consumed by the route model and alert scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavSettings {
    /// Minimum bearing change (degrees) that counts as a turning point.
    pub min_direction_difference: f64,
    /// Below this smoothed speed (m/s) direction data is not trusted.
    pub minimum_speed_mps: f64,
    /// Meters to travel between two direction warnings.
    pub minimum_warning_distance: f64,
    /// Seconds between urgent direction warnings.
    pub audio_alert_interval: f64,
    /// Seconds between periodic status summaries.
    pub audio_info_interval: f64,
    /// Distance (m) at which an upcoming turn is announced.
    pub approach_distance: f64,
    /// Distance (m) at which the final waypoint counts as reached.
    pub arrival_distance: f64,
    /// Seconds between track log entries; 0 disables logging.
    pub log_interval: u64,
}

impl Default for NavSettings {
    fn default() -> Self {
        Self {
            min_direction_difference: 10.0,
            minimum_speed_mps: 1.0,
            minimum_warning_distance: 40.0,
            audio_alert_interval: 20.0,
            audio_info_interval: 120.0,
            approach_distance: 100.0,
            arrival_distance: 40.0,
            log_interval: 0,
        }
    }
}

/// Full application configuration, stored as JSON under
/// `~/.config/gps-navigator/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    pub source_type: String, // "serial" or "tcp"
    pub serial_port: Option<String>,
    pub serial_baudrate: u32,
    pub tcp_host: String,
    pub tcp_port: u16,
    pub route_file: Option<PathBuf>,
    pub track_log: Option<PathBuf>,
    pub nav: NavSettings,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            source_type: "serial".to_string(),
            serial_port: None,
            serial_baudrate: 4800,
            tcp_host: "localhost".to_string(),
            tcp_port: 2947,
            route_file: None,
            track_log: None,
            nav: NavSettings::default(),
        }
    }
}

impl NavConfig {
    /// Load the configuration, falling back to defaults when no file
    /// exists yet.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&config_path)
            .map_err(|e| NavError::Other(format!("Failed to read config file: {}", e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| NavError::Other(format!("Failed to parse config file: {}", e)))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| NavError::Other(format!("Failed to create config directory: {}", e)))?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, contents)
            .map_err(|e| NavError::Other(format!("Failed to write config file: {}", e)))?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| NavError::Other("HOME environment variable not set".to_string()))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("gps-navigator")
            .join("config.json"))
    }

    pub fn update_serial(&mut self, port: String, baudrate: u32) {
        self.source_type = "serial".to_string();
        self.serial_port = Some(port);
        self.serial_baudrate = baudrate;
    }

    pub fn update_tcp(&mut self, host: String, port: u16) {
        self.source_type = "tcp".to_string();
        self.tcp_host = host;
        self.tcp_port = port;
    }
}
