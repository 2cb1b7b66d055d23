//! # Delivery Ledger
//!
//! Failed downstream executions keyed by `(domain, message_hash)`.

use super::errors::{Hash, RelayError};
use super::value_objects::DomainId;
use std::collections::HashMap;

/// Failed-message ledger.
#[derive(Debug, Default)]
pub struct DeliveryLedger {
    failed: HashMap<(DomainId, Hash), u32>,
}

impl DeliveryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed execution. Returns the new retry count.
    pub fn record_failure(&mut self, domain: DomainId, message_hash: Hash) -> u32 {
        let count = self.failed.entry((domain, message_hash)).or_insert(0);
        *count += 1;
        *count
    }

    /// Retry count of a message (zero if none).
    pub fn failed_count(&self, domain: DomainId, message_hash: &Hash) -> u32 {
        self.failed
            .get(&(domain, *message_hash))
            .copied()
            .unwrap_or(0)
    }

    /// Claim one failure for a retry. Returns the remaining count.
    ///
    /// A retry whose execution fails puts the claim back with
    /// [`record_failure`](Self::record_failure).
    pub fn clear_one(&mut self, domain: DomainId, message_hash: &Hash) -> Result<u32, RelayError> {
        let key = (domain, *message_hash);
        let count = self
            .failed
            .get_mut(&key)
            .ok_or(RelayError::NotFailedMessage(*message_hash))?;
        *count -= 1;
        let remaining = *count;
        if remaining == 0 {
            self.failed.remove(&key);
        }
        Ok(remaining)
    }

    /// Number of messages with live failures.
    pub fn len(&self) -> usize {
        self.failed.len()
    }

    /// Returns true if no failure is recorded.
    pub fn is_empty(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Split a concatenated batch into messages.
///
/// `message_length` returns the length of the message at the head of the
/// slice. Returns the framed messages and any remainder that could not be
/// framed (zero length, length past the end, or a framing error).
pub fn split_messages<'a, F, E>(batch: &'a [u8], mut message_length: F) -> (Vec<&'a [u8]>, Option<&'a [u8]>)
where
    F: FnMut(&[u8]) -> Result<usize, E>,
{
    let mut messages = Vec::new();
    let mut offset = 0;
    while offset < batch.len() {
        let rest = &batch[offset..];
        match message_length(rest) {
            Ok(len) if len > 0 && len <= rest.len() => {
                messages.push(&rest[..len]);
                offset += len;
            }
            _ => return (messages, Some(rest)),
        }
    }
    (messages, None)
}
