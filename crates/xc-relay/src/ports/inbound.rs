//! # Inbound Ports
//!
//! API trait defining what the relay engine can do, plus the receipts its
//! operations return.

use crate::domain::{
    AdapterId, Address, Amount, CallContext, DomainId, Hash, Partition, RelayResult, RoundId,
    ScopeId,
};
use async_trait::async_trait;

/// Result of counting one inbound confirmation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmReceipt {
    /// Content the confirmation was counted for.
    pub content_hash: Hash,
    /// Session the confirmation was counted under.
    pub session_id: u64,
    /// Net credit left after this confirmation (and any delivery).
    pub net: u64,
    /// Whether this confirmation completed a delivery.
    pub delivered: bool,
    /// Messages processed successfully by the sink.
    pub processed: usize,
    /// Messages recorded as failed.
    pub failed: usize,
}

/// Outcome of one outbound round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Every outbound adapter accepted the payload.
    Sent {
        /// Correlation id
        round: RoundId,
        /// Destination partition
        partition: Partition,
        /// Hash of the transmitted payload
        batch_hash: Hash,
        /// Sum of adapter quotes
        cost: Amount,
        /// Messages in the payload
        messages: usize,
    },
    /// Funds fell short; the payload was parked for repayment.
    Underpaid {
        /// Correlation id
        round: RoundId,
        /// Destination partition
        partition: Partition,
        /// Key of the underpaid entry
        batch_hash: Hash,
        /// Sum of adapter quotes
        required_cost: Amount,
        /// Outstanding rounds for this payload
        attempts: u32,
    },
}

impl RoundOutcome {
    /// Hash of the round payload.
    pub fn batch_hash(&self) -> Hash {
        match self {
            Self::Sent { batch_hash, .. } | Self::Underpaid { batch_hash, .. } => *batch_hash,
        }
    }

    /// True if the round was transmitted.
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// Result of appending a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Accumulated into the open batch.
    Queued {
        /// Accumulated cost of the destination batch
        pending_cost: u64,
        /// Messages in the destination batch
        message_count: usize,
    },
    /// No batch open: sent immediately.
    Sent(RoundOutcome),
}

/// Result of closing a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseReceipt {
    /// One outcome per destination, in first-append order.
    pub rounds: Vec<RoundOutcome>,
    /// Supplied value left unspent, returned to the caller.
    pub unspent: Amount,
}

/// Result of repaying an underpaid batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepayReceipt {
    /// Correlation id
    pub round: RoundId,
    /// Cost paid to adapters.
    pub cost: Amount,
    /// Excess returned to the repaying caller.
    pub refunded: Amount,
    /// Rounds still outstanding for the same payload.
    pub remaining_attempts: u32,
}

/// Relay API - inbound port.
///
/// Every outbound operation takes the `CallContext` of the logical call it
/// belongs to; the open batch and the supplied value live there.
#[async_trait]
pub trait RelayApi: Send + Sync {
    /// Count a confirmation from `adapter` for an inbound payload.
    async fn confirm(
        &self,
        domain: DomainId,
        adapter: AdapterId,
        payload: &[u8],
    ) -> RelayResult<ConfirmReceipt>;

    /// Count a confirmation on behalf of `adapter`. Recoverers only.
    async fn recover(
        &self,
        caller: Address,
        domain: DomainId,
        scope: ScopeId,
        adapter: AdapterId,
        content_hash: Hash,
    ) -> RelayResult<ConfirmReceipt>;

    /// Quote the cost of sending `payload` through every outbound adapter.
    async fn estimate(
        &self,
        domain: DomainId,
        scope: ScopeId,
        payload: &[u8],
        cost_budget: u64,
    ) -> RelayResult<Amount>;

    /// Send `payload` immediately as one metered round.
    async fn send(
        &self,
        ctx: &mut CallContext,
        domain: DomainId,
        scope: ScopeId,
        payload: &[u8],
        cost_budget: u64,
    ) -> RelayResult<RoundOutcome>;

    /// Open a batch on the context.
    fn open_batch(&self, ctx: &mut CallContext) -> RelayResult<()>;

    /// Append a message to the open batch, or send it if none is open.
    async fn append_message(
        &self,
        ctx: &mut CallContext,
        domain: DomainId,
        scope: ScopeId,
        message: &[u8],
        cost: u64,
    ) -> RelayResult<AppendOutcome>;

    /// Flush every pending batch of the context.
    async fn close_batch(&self, ctx: &mut CallContext) -> RelayResult<CloseReceipt>;

    /// Pay for and transmit an underpaid batch.
    async fn repay(
        &self,
        ctx: &mut CallContext,
        domain: DomainId,
        batch: &[u8],
    ) -> RelayResult<RepayReceipt>;

    /// Re-run a failed message. Returns the remaining failure count.
    async fn retry(&self, domain: DomainId, message: &[u8]) -> RelayResult<u32>;
}
