//! # Relay Events
//!
//! Observability events published through the `EventPublisher` port.

use super::errors::{AdapterId, Address, Amount, Hash};
use super::value_objects::{DomainId, Partition, ScopeId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation ID tying together the events of one outbound round.
pub type RoundId = Uuid;

/// All events emitted by the relay engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RelayEvent {
    // =========================================================================
    // ADAPTER REGISTRY
    // =========================================================================
    /// A partition was (re)configured, starting a new session.
    SessionStarted {
        partition: Partition,
        session_id: u64,
        quorum: u8,
        threshold: u8,
        recovery_index: u8,
    },

    // =========================================================================
    // INBOUND
    // =========================================================================
    /// An adapter confirmation was counted.
    Confirmed {
        domain: DomainId,
        adapter: AdapterId,
        content_hash: Hash,
        session_id: u64,
        net: u64,
        recovered: bool,
    },

    /// Threshold reached; content handed to the sink.
    Delivered {
        domain: DomainId,
        content_hash: Hash,
        session_id: u64,
    },

    /// One message inside delivered content processed successfully.
    MessageProcessed { domain: DomainId, message_hash: Hash },

    /// One message inside delivered content failed.
    MessageFailed {
        domain: DomainId,
        message_hash: Hash,
        retry_count: u32,
        reason: String,
    },

    /// A failed message was retried successfully.
    MessageRetried {
        domain: DomainId,
        message_hash: Hash,
        remaining: u32,
    },

    // =========================================================================
    // OUTBOUND
    // =========================================================================
    /// An adapter accepted a payload.
    ProofSent {
        round: RoundId,
        domain: DomainId,
        adapter: AdapterId,
        payload_hash: Hash,
        cost: Amount,
        reference: Hash,
    },

    /// A round was transmitted through every outbound adapter.
    BatchSent {
        round: RoundId,
        partition: Partition,
        batch_hash: Hash,
        cost: Amount,
        messages: usize,
    },

    /// A round was parked for lack of funds.
    BatchUnderpaid {
        round: RoundId,
        partition: Partition,
        batch_hash: Hash,
        required_cost: Amount,
        attempts: u32,
    },

    /// A parked round was repaid and transmitted.
    BatchRepaid {
        round: RoundId,
        domain: DomainId,
        batch_hash: Hash,
        cost: Amount,
        refunded: Amount,
    },

    // =========================================================================
    // FEES AND ADMINISTRATION
    // =========================================================================
    /// Subsidy credited.
    SubsidyDeposited { scope: ScopeId, amount: Amount },

    /// Subsidy debited.
    SubsidyWithdrawn {
        scope: ScopeId,
        amount: Amount,
        to: Address,
    },

    /// Refund target registered.
    RefundTargetSet { scope: ScopeId, target: Address },

    /// Outgoing toggle changed.
    OutgoingBlockedSet { partition: Partition, blocked: bool },
}

impl RelayEvent {
    /// Short name for logs and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::Confirmed { .. } => "confirmed",
            Self::Delivered { .. } => "delivered",
            Self::MessageProcessed { .. } => "message_processed",
            Self::MessageFailed { .. } => "message_failed",
            Self::MessageRetried { .. } => "message_retried",
            Self::ProofSent { .. } => "proof_sent",
            Self::BatchSent { .. } => "batch_sent",
            Self::BatchUnderpaid { .. } => "batch_underpaid",
            Self::BatchRepaid { .. } => "batch_repaid",
            Self::SubsidyDeposited { .. } => "subsidy_deposited",
            Self::SubsidyWithdrawn { .. } => "subsidy_withdrawn",
            Self::RefundTargetSet { .. } => "refund_target_set",
            Self::OutgoingBlockedSet { .. } => "outgoing_blocked_set",
        }
    }
}
