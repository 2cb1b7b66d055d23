//! # Adapters Layer (Hexagonal Architecture)
//!
//! In-memory implementations of the outbound ports.

mod event_log;
mod framed_sink;
mod in_memory_adapter;

pub use event_log::{InMemoryEventLog, NoOpPublisher};
pub use framed_sink::{FramedMessageSink, MAX_BODY_LEN};
pub use in_memory_adapter::{InMemoryAdapter, SentPayload};
