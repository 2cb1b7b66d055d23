//! # Outbound Ports
//!
//! Traits for external collaborators: transport adapters, the message sink
//! consuming quorum output, and the event publisher.

use crate::domain::{AdapterId, AdapterProof, Address, Amount, Classification, DomainId, RelayEvent};
use async_trait::async_trait;
use thiserror::Error;

/// Error reported by a transport adapter.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct AdapterError(pub String);

/// Error reported by the message sink.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct SinkError(pub String);

/// Error reported by an event publisher.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PublishError {
    /// The event bus is not connected.
    #[error("Event bus not connected")]
    NotConnected,
    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Transport adapter - outbound port.
///
/// Each implementation wraps one external bridge network. Calls must be
/// safe to repeat with the same payload.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Identity of this adapter in adapter sets.
    fn id(&self) -> AdapterId;

    /// Quote the transport cost of sending `payload` with `cost_budget`.
    async fn estimate(
        &self,
        domain: DomainId,
        payload: &[u8],
        cost_budget: u64,
    ) -> Result<Amount, AdapterError>;

    /// Transmit `payload`, paying `value`. Overpayment is refunded to `refund`.
    async fn send(
        &self,
        domain: DomainId,
        payload: &[u8],
        cost_budget: u64,
        refund: Address,
        value: Amount,
    ) -> Result<AdapterProof, AdapterError>;
}

/// Message sink - outbound port consuming quorum output.
///
/// The sink owns the message format: it classifies inbound payloads, frames
/// messages inside delivered content, and executes them.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Map an inbound payload to its scope and content hash.
    fn classify(&self, payload: &[u8]) -> Result<Classification, SinkError>;

    /// Length of the message at the head of `bytes`.
    fn message_length(&self, bytes: &[u8]) -> Result<usize, SinkError>;

    /// Execute one message from `domain`.
    async fn deliver(&self, domain: DomainId, message: &[u8]) -> Result<(), SinkError>;
}

/// Event publisher - outbound port.
pub trait EventPublisher: Send + Sync {
    /// Publish one event.
    fn publish(&self, event: RelayEvent) -> Result<(), PublishError>;
}
