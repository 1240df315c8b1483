//! Configuration for the Tollgate Server
//!
//! This module contains the configuration types and loading functionality.

use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

use crate::error::ServerResult;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub bind_address: String,

    /// Review stage SLA deadline in days
    #[serde(default = "default_sla_deadline_days")]
    pub sla_deadline_days: u32,

    /// Interval between background SLA sweeps, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sla_sweep_interval_secs: u64,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_sla_deadline_days() -> u32 {
    2
}

fn default_sweep_interval() -> u64 {
    3600 // 1 hour
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_host(),
            sla_deadline_days: default_sla_deadline_days(),
            sla_sweep_interval_secs: default_sweep_interval(),
            log_level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn load() -> ServerResult<Self> {
        // Start with defaults
        let mut config = Self::default();

        // Override from environment variables
        if let Ok(port) = env::var("SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                config.port = port;
            } else {
                warn!("Invalid SERVER_PORT value: {}", port);
            }
        }

        if let Ok(host) = env::var("SERVER_HOST") {
            config.bind_address = host;
        }

        if let Ok(days) = env::var("SLA_DEADLINE_DAYS") {
            if let Ok(days) = days.parse::<u32>() {
                config.sla_deadline_days = days;
            } else {
                warn!("Invalid SLA_DEADLINE_DAYS value: {}", days);
            }
        }

        if let Ok(interval) = env::var("SLA_SWEEP_INTERVAL_SECS") {
            if let Ok(interval) = interval.parse::<u64>() {
                config.sla_sweep_interval_secs = interval;
            } else {
                warn!("Invalid SLA_SWEEP_INTERVAL_SECS value: {}", interval);
            }
        }

        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.log_level = log_level;
        }

        Ok(config)
    }
}
