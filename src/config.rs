//! Configuration for the RakshakIO daemon
//!
//! Loads configuration from a TOML file with the parameters needed to
//! wire the link engine, the navigation receiver, and the backend uplink.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub device: DeviceConfig,
    pub hardware: HardwareConfig,
    pub link: LinkConfig,
    pub telemetry: TelemetryConfig,
    pub uplink: UplinkConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Device identity
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Name advertised on the wireless link
    pub name: String,
}

/// Hardware configuration (receiver port)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HardwareConfig {
    /// Navigation receiver serial port, or "sim" for the simulated receiver
    pub gps_port: String,
    /// Receiver baud rate (9600 for the stock module)
    pub gps_baud: u32,
}

/// Wireless link configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LinkConfig {
    /// Link backend. Only "sim" ships in this repo; vendor radio stacks
    /// plug in out-of-tree.
    pub backend: String,
}

/// Telemetry publish intervals
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    pub motion_interval_ms: u64,
    pub position_interval_ms: u64,
    pub status_interval_ms: u64,
}

/// Backend uplink configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UplinkConfig {
    pub enabled: bool,
    /// Backend base URL; the stored api_endpoint credential overrides it
    pub base_url: String,
    /// Path the position report is POSTed to
    pub report_path: String,
    pub report_interval_ms: u64,
}

/// Credential store location
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub credentials_path: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides
    pub level: String,
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Default configuration for the tracker reference hardware.
    ///
    /// Suitable for bench testing and development. Deployments should use
    /// a proper TOML configuration file.
    pub fn tracker_defaults() -> Self {
        Self {
            device: DeviceConfig {
                name: "Rakshak-Tracker".to_string(),
            },
            hardware: HardwareConfig {
                gps_port: "sim".to_string(),
                gps_baud: 9600,
            },
            link: LinkConfig {
                backend: "sim".to_string(),
            },
            telemetry: TelemetryConfig {
                motion_interval_ms: 1_000,
                position_interval_ms: 2_000,
                status_interval_ms: 5_000,
            },
            uplink: UplinkConfig {
                enabled: false,
                base_url: String::new(),
                report_path: "/api/device/location".to_string(),
                report_interval_ms: 30_000,
            },
            storage: StorageConfig {
                credentials_path: "/etc/rakshak/credentials.toml".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::tracker_defaults()
    }
}
