//! # Algorithms Module
//!
//! Quorum accounting and hashing used by the relay engine.

pub mod hashing;
pub mod quorum;

pub use hashing::{batch_hash, content_hash, message_hash, short_hex};
pub use quorum::{apply_confirmation, consume_threshold, max_deliveries, VoteOutcome};
