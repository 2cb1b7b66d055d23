//! # Adapter Registry
//!
//! Per-partition adapter set configuration with session versioning.
//!
//! Session ids come from one monotonic counter shared by every partition, so
//! `(domain, session_id)` identifies a configuration epoch without the scope.

use super::entities::AdapterSetConfig;
use super::errors::{AdapterId, RelayError};
use super::invariants::invariant_adapter_set;
use super::value_objects::{DomainId, Partition, ScopeId};
use std::collections::HashMap;

/// Partitioned adapter set store.
#[derive(Debug)]
pub struct AdapterRegistry {
    configs: HashMap<Partition, AdapterSetConfig>,
    last_session: u64,
    max_adapters: usize,
}

impl AdapterRegistry {
    /// Create an empty registry.
    pub fn new(max_adapters: usize) -> Self {
        Self {
            configs: HashMap::new(),
            last_session: 0,
            max_adapters,
        }
    }

    /// Replace the adapter set of a partition and start a new session.
    ///
    /// Returns the new configuration and the superseded session id, if any.
    pub fn configure(
        &mut self,
        domain: DomainId,
        scope: ScopeId,
        adapters: Vec<AdapterId>,
        threshold: u8,
        recovery_index: u8,
    ) -> Result<(AdapterSetConfig, Option<u64>), RelayError> {
        invariant_adapter_set(&adapters, threshold, recovery_index, self.max_adapters)?;

        self.last_session += 1;
        let partition = Partition::new(domain, scope);
        let config = AdapterSetConfig {
            partition,
            adapters,
            threshold,
            recovery_index,
            session_id: self.last_session,
        };
        let previous = self
            .configs
            .insert(partition, config.clone())
            .map(|old| old.session_id);
        Ok((config, previous))
    }

    /// Resolve the set for a partition, falling back to the default scope.
    pub fn resolve(&self, domain: DomainId, scope: ScopeId) -> Result<&AdapterSetConfig, RelayError> {
        self.configs
            .get(&Partition::new(domain, scope))
            .or_else(|| self.configs.get(&Partition::new(domain, ScopeId::DEFAULT)))
            .ok_or(RelayError::NoAdapterConfigured { domain, scope })
    }

    /// Exact configuration of a partition (no fallback).
    pub fn get(&self, partition: &Partition) -> Option<&AdapterSetConfig> {
        self.configs.get(partition)
    }

    /// Current session id of the set resolved for a partition.
    pub fn session_id(&self, domain: DomainId, scope: ScopeId) -> Option<u64> {
        self.resolve(domain, scope).ok().map(|c| c.session_id)
    }

    /// Check if an adapter id is referenced by any configured set.
    pub fn is_referenced(&self, adapter: &AdapterId) -> bool {
        self.configs.values().any(|c| c.adapters.contains(adapter))
    }

    /// Number of configured partitions.
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Returns true if nothing is configured.
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}
