//! # XC Telemetry
//!
//! Logging setup for the cross-chain relay.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xc_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     init_telemetry(&TelemetryConfig::from_env()).expect("Failed to init telemetry");
//!     // Relay logs are now emitted
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `XC_SERVICE_NAME` | `xc-relay` | Service name in log lines |
//! | `XC_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` also honored) |
//! | `XC_JSON_LOGS` | `false` | JSON output (default `true` in containers) |
//! | `XC_LOG_SOURCE` | `false` | Include file and line |

#![warn(missing_docs)]

mod config;
mod logging;

pub use config::TelemetryConfig;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A global subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// The configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install the global log subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    logging::init_logging(config)
}

/// Install the global log subscriber, ignoring an already-installed one.
///
/// Intended for tests, where several cases race to initialize.
pub fn try_init_telemetry(config: &TelemetryConfig) -> bool {
    logging::init_logging(config).is_ok()
}
