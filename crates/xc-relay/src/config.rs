//! Relay configuration.

use crate::domain::{Address, DomainId, MAX_ADAPTER_COUNT};
use serde::{Deserialize, Serialize};
use std::env;

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Domain this gateway runs on.
    pub local_domain: DomainId,
    /// Maximum adapters per set (never above `MAX_ADAPTER_COUNT`).
    pub max_adapters: usize,
    /// Batch cost cap for scopes without an explicit cap.
    pub default_max_batch_cost: u64,
    /// Initial administrators.
    pub admins: Vec<Address>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            local_domain: DomainId(1),
            max_adapters: MAX_ADAPTER_COUNT,
            default_max_batch_cost: 25_000_000,
            admins: Vec::new(),
        }
    }
}

impl RelayConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `XC_LOCAL_DOMAIN`: Local domain id (default: 1)
    /// - `XC_MAX_ADAPTERS`: Adapter set size cap (default: 8)
    /// - `XC_DEFAULT_MAX_BATCH_COST`: Default batch cost cap (default: 25000000)
    /// - `XC_ADMINS`: Comma-separated hex addresses (default: none)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            local_domain: env::var("XC_LOCAL_DOMAIN")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(DomainId)
                .unwrap_or(defaults.local_domain),

            max_adapters: env::var("XC_MAX_ADAPTERS")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .map(|v| v.min(MAX_ADAPTER_COUNT))
                .unwrap_or(defaults.max_adapters),

            default_max_batch_cost: env::var("XC_DEFAULT_MAX_BATCH_COST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_max_batch_cost),

            admins: env::var("XC_ADMINS")
                .map(|v| parse_addresses(&v))
                .unwrap_or_default(),
        }
    }

    /// Add an initial administrator.
    pub fn with_admin(mut self, admin: Address) -> Self {
        self.admins.push(admin);
        self
    }
}

/// Parse comma-separated hex addresses, skipping malformed entries.
fn parse_addresses(value: &str) -> Vec<Address> {
    value
        .split(',')
        .filter_map(|s| {
            let bytes = hex::decode(s.trim().trim_start_matches("0x")).ok()?;
            Address::try_from(bytes.as_slice()).ok()
        })
        .collect()
}
