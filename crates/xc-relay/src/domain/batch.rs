//! # Call Context and Batch Guard
//!
//! A `CallContext` represents one logical call (one inbound request or
//! transaction). It carries the caller identity, the value the caller
//! supplied for transport costs, and at most one open batch.
//!
//! ```text
//! [Idle] ──open_batch──→ [Batching] ──close_batch──→ [Idle]
//!    │                       │
//!    └─ append: immediate    └─ append: accumulate per (domain, scope)
//! ```
//!
//! The context is passed by `&mut` through every nested call, so a second
//! `open_batch` on the same context is detected (`AlreadyBatching`) and the
//! identity captured at open stays the initiator for the whole batch.

use super::entities::PendingBatch;
use super::errors::{Address, Amount, RelayError};
use super::invariants::invariant_batch_cost;
use super::value_objects::Partition;

/// Messages accumulated while a batch is open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchSession {
    batcher: Address,
    pending: Vec<PendingBatch>,
}

impl BatchSession {
    fn new(batcher: Address) -> Self {
        Self {
            batcher,
            pending: Vec::new(),
        }
    }

    /// Identity captured at open.
    pub fn batcher(&self) -> Address {
        self.batcher
    }

    /// Pending batches in first-append order.
    pub fn pending(&self) -> &[PendingBatch] {
        &self.pending
    }

    fn entry(&mut self, partition: Partition) -> &mut PendingBatch {
        let index = match self.pending.iter().position(|b| b.partition == partition) {
            Some(index) => index,
            None => {
                self.pending.push(PendingBatch::new(partition));
                self.pending.len() - 1
            }
        };
        &mut self.pending[index]
    }
}

/// Per-call state: caller, supplied value, open batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallContext {
    caller: Address,
    value: Amount,
    batch: Option<BatchSession>,
}

impl CallContext {
    /// Context for a caller that supplies no value.
    pub fn new(caller: Address) -> Self {
        Self::with_value(caller, 0)
    }

    /// Context for a caller that supplies `value` for transport costs.
    pub fn with_value(caller: Address, value: Amount) -> Self {
        Self {
            caller,
            value,
            batch: None,
        }
    }

    /// Direct caller.
    pub fn caller(&self) -> Address {
        self.caller
    }

    /// Identity that initiated the current work: the batcher while a batch
    /// is open, otherwise the caller.
    pub fn initiator(&self) -> Address {
        self.batch
            .as_ref()
            .map(|b| b.batcher)
            .unwrap_or(self.caller)
    }

    /// Check if a batch is open.
    pub fn is_batching(&self) -> bool {
        self.batch.is_some()
    }

    /// Supplied value not yet spent.
    pub fn remaining_value(&self) -> Amount {
        self.value
    }

    /// Add supplied value.
    pub fn add_value(&mut self, amount: Amount) {
        self.value = self.value.saturating_add(amount);
    }

    /// Take the unspent value out of the context.
    pub fn take_remaining_value(&mut self) -> Amount {
        std::mem::take(&mut self.value)
    }

    /// Pending batch for a destination, if a batch is open.
    pub fn pending(&self, partition: &Partition) -> Option<&PendingBatch> {
        self.batch
            .as_ref()
            .and_then(|b| b.pending.iter().find(|p| p.partition == *partition))
    }

    /// Open a batch.
    pub fn open_batch(&mut self) -> Result<(), RelayError> {
        if self.batch.is_some() {
            return Err(RelayError::AlreadyBatching);
        }
        self.batch = Some(BatchSession::new(self.caller));
        Ok(())
    }

    /// Append a message to the open batch, enforcing the scope's cost cap.
    pub fn append(
        &mut self,
        partition: Partition,
        message: &[u8],
        cost: u64,
        max_cost: u64,
    ) -> Result<&PendingBatch, RelayError> {
        let session = self.batch.as_mut().ok_or(RelayError::NoBatch)?;
        let current = session
            .pending
            .iter()
            .find(|b| b.partition == partition)
            .map(|b| b.cost)
            .unwrap_or(0);
        invariant_batch_cost(partition.scope, current.saturating_add(cost), max_cost)?;
        let pending = session.entry(partition);
        pending.push(message, cost);
        Ok(pending)
    }

    /// Close the batch, handing its contents to the caller for flushing.
    pub fn take_batch(&mut self) -> Result<BatchSession, RelayError> {
        self.batch.take().ok_or(RelayError::NoBatch)
    }

    /// Put a batch back after a failed flush.
    pub fn restore_batch(&mut self, session: BatchSession) {
        self.batch = Some(session);
    }

    pub(crate) fn spend(&mut self, amount: Amount) {
        self.value = self.value.saturating_sub(amount);
    }
}
