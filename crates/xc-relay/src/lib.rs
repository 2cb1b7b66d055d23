//! # XC Relay
//!
//! Cross-chain message relay over multiple independent transport adapters.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Relay application messages between isolated execution domains:
//! - Inbound content is trusted only after `threshold` adapter confirmations,
//!   and is delivered exactly once per threshold-worth of confirmations
//! - Outbound messages are batched per destination and fanned out to every
//!   configured adapter, all-or-nothing
//! - Transport costs are paid from supplied value, then from scope subsidy;
//!   shortfalls are parked as underpaid batches and repaid later
//! - Failed downstream executions are recorded per message and retried
//!
//! ## Safety Properties
//!
//! | Property | Description |
//! |----------|-------------|
//! | Quorum safety | At most `floor(confirmations / threshold)` deliveries per content |
//! | Session invalidation | Reconfiguring a set discards its in-flight votes |
//! | Reentrancy guard | One open batch per call context, initiator fixed at open |
//! | All-or-nothing fan-out | A failing adapter aborts the whole round |
//! | No silent drops | Content is delivered, parked as underpaid, or recorded as failed |
//!
//! ## Module Structure
//!
//! ```text
//! xc-relay/
//! ├── domain/          # Registry, ledgers, call context, events, errors
//! ├── algorithms/      # Quorum accounting, hashing
//! ├── ports/           # RelayApi, Adapter, MessageSink, EventPublisher
//! ├── adapters/        # In-memory adapter, framed sink, event log
//! ├── config.rs        # RelayConfig
//! ├── metrics.rs       # Prometheus counters (feature "metrics")
//! └── service.rs       # RelayService
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{FramedMessageSink, InMemoryAdapter, InMemoryEventLog, NoOpPublisher};
pub use algorithms::{batch_hash, content_hash, message_hash, VoteOutcome};
pub use config::RelayConfig;
pub use domain::{
    AdapterId, AdapterProof, AdapterSetConfig, Address, Amount, BatchSession, CallContext,
    Classification, DomainId, ErrorKind, Hash, Partition, PendingBatch, RelayError, RelayEvent,
    RelayResult, RoundId, ScopeId, UnderpaidEntry, MAX_ADAPTER_COUNT,
};
pub use ports::{
    Adapter, AdapterError, AppendOutcome, CloseReceipt, ConfirmReceipt, EventPublisher,
    MessageSink, PublishError, RelayApi, RepayReceipt, RoundOutcome, SinkError,
};
pub use service::RelayService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
