//! # Domain Errors
//!
//! Error types for the relay engine.
//!
//! Every failure maps onto one of the error kinds below. Configuration and
//! authorization failures surface immediately; underfunded rounds and
//! downstream failures are normally captured as ledger state instead of
//! being returned, so the variants for them only appear on the explicit
//! recovery calls (`repay`, `retry`).

use super::value_objects::{DomainId, ScopeId};
use thiserror::Error;

/// Hash type (32-byte SHA-256).
pub type Hash = [u8; 32];

/// Address type (20-byte). Identifies callers, managers and adapters.
pub type Address = [u8; 20];

/// Adapter identity.
pub type AdapterId = Address;

/// Transport value paid to adapters.
pub type Amount = u128;

/// Error taxonomy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid adapter set or missing configuration. Not retried.
    Configuration,
    /// Caller not allowed to perform the operation.
    Authorization,
    /// Funds supplied were not enough. Recovered through `repay`.
    Underfunded,
    /// The message sink failed. Recovered through `retry`.
    DownstreamProcessing,
    /// An adapter failed during an outbound round.
    Transport,
    /// Operation not valid in the current state.
    State,
}

/// Relay error types.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Adapter set violates a configuration constraint.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Adapter id is not registered with the gateway.
    #[error("Unregistered adapter: {}", hex::encode(.0))]
    UnregisteredAdapter(AdapterId),

    /// No adapter set for the partition or the default scope.
    #[error("No adapter configured for domain {domain} scope {scope}")]
    NoAdapterConfigured {
        /// Remote domain
        domain: DomainId,
        /// Requested scope
        scope: ScopeId,
    },

    /// Sender is not part of the current session's adapter set.
    #[error("Unknown adapter {} for domain {domain}", hex::encode(.adapter))]
    UnknownAdapter {
        /// Remote domain
        domain: DomainId,
        /// Offending adapter
        adapter: AdapterId,
    },

    /// Caller lacks the required role.
    #[error("Unauthorized: {}", hex::encode(.0))]
    Unauthorized(Address),

    /// Threshold reached but no confirmation carried the full payload.
    #[error("Payload missing for content {}", hex::encode(.0))]
    PayloadMissing(Hash),

    /// A batch is already open in this call context.
    #[error("Already batching")]
    AlreadyBatching,

    /// No batch is open in this call context.
    #[error("No batch open")]
    NoBatch,

    /// Appending would exceed the scope's batch cost cap.
    #[error("Batch cost {cost} exceeds maximum {max} for scope {scope}")]
    ExceedsMaxBatchCost {
        /// Scope of the batch
        scope: ScopeId,
        /// Cost after appending
        cost: u64,
        /// Configured cap
        max: u64,
    },

    /// Outgoing messages are blocked for the partition.
    #[error("Outgoing blocked for domain {domain} scope {scope}")]
    OutgoingBlocked {
        /// Remote domain
        domain: DomainId,
        /// Scope
        scope: ScopeId,
    },

    /// Retry requested for a message with no failure record.
    #[error("Not a failed message: {}", hex::encode(.0))]
    NotFailedMessage(Hash),

    /// Repay requested for a batch with no underpaid record.
    #[error("Batch not underpaid: {}", hex::encode(.0))]
    NotUnderpaid(Hash),

    /// Repayment does not cover the batch cost.
    #[error("Insufficient repayment: required {required}, supplied {supplied}")]
    InsufficientRepayment {
        /// Current cost of the batch
        required: Amount,
        /// Value supplied by the caller
        supplied: Amount,
    },

    /// Subsidy withdrawal larger than the balance.
    #[error("Insufficient subsidy for scope {scope}: balance {balance}, requested {requested}")]
    InsufficientSubsidy {
        /// Scope
        scope: ScopeId,
        /// Current balance
        balance: Amount,
        /// Requested amount
        requested: Amount,
    },

    /// An adapter failed to quote or transmit.
    #[error("Transport error from adapter {}: {reason}", hex::encode(.adapter))]
    Transport {
        /// Failing adapter
        adapter: AdapterId,
        /// Adapter-reported reason
        reason: String,
    },

    /// The message sink failed to process a message.
    #[error("Downstream processing failed: {0}")]
    Downstream(String),

    /// The message sink could not classify a payload.
    #[error("Classification failed: {0}")]
    Classification(String),
}

impl RelayError {
    /// Map the error onto the taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfiguration(_)
            | Self::UnregisteredAdapter(_)
            | Self::NoAdapterConfigured { .. }
            | Self::ExceedsMaxBatchCost { .. } => ErrorKind::Configuration,
            Self::UnknownAdapter { .. } | Self::Unauthorized(_) | Self::OutgoingBlocked { .. } => {
                ErrorKind::Authorization
            }
            Self::InsufficientRepayment { .. } | Self::InsufficientSubsidy { .. } => {
                ErrorKind::Underfunded
            }
            Self::Downstream(_) | Self::Classification(_) => ErrorKind::DownstreamProcessing,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::PayloadMissing(_)
            | Self::AlreadyBatching
            | Self::NoBatch
            | Self::NotFailedMessage(_)
            | Self::NotUnderpaid(_) => ErrorKind::State,
        }
    }

    /// Whether the failure has a permissionless recovery path.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Underfunded | ErrorKind::DownstreamProcessing
        )
    }
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
