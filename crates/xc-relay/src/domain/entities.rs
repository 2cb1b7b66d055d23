//! # Domain Entities
//!
//! Core entities owned by the relay engine.

use super::errors::{AdapterId, Address, Amount, Hash};
use super::value_objects::{DomainId, Partition, ScopeId};
use serde::{Deserialize, Serialize};

/// Adapter set configured for one `(domain, scope)` partition.
///
/// `quorum` is always `adapters.len()`. A new instance is created on every
/// reconfiguration, carrying a fresh `session_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterSetConfig {
    /// Partition this set applies to.
    pub partition: Partition,
    /// Ordered adapter ids. Slot index is the position in this list.
    pub adapters: Vec<AdapterId>,
    /// Confirmations required per delivery.
    pub threshold: u8,
    /// Slots at or above this index are recovery-only (no outbound fan-out).
    pub recovery_index: u8,
    /// Configuration epoch.
    pub session_id: u64,
}

impl AdapterSetConfig {
    /// Number of configured adapters.
    pub fn quorum(&self) -> u8 {
        self.adapters.len() as u8
    }

    /// Slot index of an adapter in this set.
    pub fn slot_of(&self, adapter: &AdapterId) -> Option<usize> {
        self.adapters.iter().position(|a| a == adapter)
    }

    /// Adapters that receive the outbound fan-out.
    pub fn outbound_adapters(&self) -> &[AdapterId] {
        let end = (self.recovery_index as usize).min(self.adapters.len());
        &self.adapters[..end]
    }
}

/// Key of a confirmation ledger entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConfirmationKey {
    /// Remote domain the content came from.
    pub domain: DomainId,
    /// Session the confirmations were counted under.
    pub session_id: u64,
    /// Content being confirmed.
    pub content_hash: Hash,
}

/// Per-content confirmation state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfirmationEntry {
    /// Banked confirmation credit per adapter slot (length = quorum).
    pub credits: Vec<u32>,
    /// Full payload, once a primary confirmation has been seen.
    pub payload: Option<Vec<u8>>,
    /// Deliveries fired from this entry.
    pub deliveries: u64,
}

impl ConfirmationEntry {
    /// Create an empty entry for a set of `quorum` adapters.
    pub fn new(quorum: usize) -> Self {
        Self {
            credits: vec![0; quorum],
            payload: None,
            deliveries: 0,
        }
    }

    /// Sum of live credit across all slots.
    pub fn net_confirmations(&self) -> u64 {
        self.credits.iter().map(|c| *c as u64).sum()
    }
}

/// Serialized messages accumulated for one destination while a batch is open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingBatch {
    /// Destination partition.
    pub partition: Partition,
    /// Concatenated message bytes.
    pub payload: Vec<u8>,
    /// Accumulated cost budget.
    pub cost: u64,
    /// Number of messages appended.
    pub message_count: usize,
}

impl PendingBatch {
    /// Create an empty pending batch.
    pub fn new(partition: Partition) -> Self {
        Self {
            partition,
            payload: Vec::new(),
            cost: 0,
            message_count: 0,
        }
    }

    /// Append a message and its cost.
    pub fn push(&mut self, message: &[u8], cost: u64) {
        self.payload.extend_from_slice(message);
        self.cost = self.cost.saturating_add(cost);
        self.message_count += 1;
    }
}

/// Outbound batch parked because the available funds did not cover its cost.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnderpaidEntry {
    /// Scope the batch was sent for (used to resolve adapters on repay).
    pub scope: ScopeId,
    /// Cost budget the batch was quoted with.
    pub cost_budget: u64,
    /// Transport cost at the time of underpayment.
    pub required_cost: Amount,
    /// Number of outstanding rounds for this exact batch.
    pub attempts: u32,
}

/// Subsidy account of a scope.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsidyAccount {
    /// Balance available to pay transport costs.
    pub balance: Amount,
    /// Address adapters refund overpayments to.
    pub refund_target: Option<Address>,
}
