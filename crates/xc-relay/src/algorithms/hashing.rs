//! # Hashing
//!
//! SHA-256 identifiers for batches and messages.

use crate::domain::Hash;
use sha2::{Digest, Sha256};

/// Hash of an arbitrary byte string.
pub fn content_hash(bytes: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Identifier of an outbound batch (key of underpaid entries).
pub fn batch_hash(batch: &[u8]) -> Hash {
    content_hash(batch)
}

/// Identifier of one inbound message (key of failed entries).
pub fn message_hash(message: &[u8]) -> Hash {
    content_hash(message)
}

/// Short hex prefix for log lines.
pub fn short_hex(hash: &Hash) -> String {
    hex::encode(&hash[..4])
}
