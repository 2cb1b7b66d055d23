//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for relay logging.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Whether to include file and line in log lines
    pub with_source: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "xc-relay".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            with_source: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `XC_SERVICE_NAME`: Service name (default: xc-relay)
    /// - `XC_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `XC_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    /// - `XC_LOG_SOURCE`: Include file and line (default: false)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("XC_SERVICE_NAME").unwrap_or_else(|_| "xc-relay".to_string()),

            log_level: env::var("XC_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("XC_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            with_source: env::var("XC_LOG_SOURCE")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
        }
    }

    /// Create configuration for a named relay instance.
    pub fn for_instance(instance: &str) -> Self {
        let mut config = Self::from_env();
        config.service_name = format!("xc-relay-{}", instance);
        config
    }
}
