//! # Confirmation Ledger
//!
//! Vote state keyed by `(domain, session_id, content_hash)`.

use super::entities::{ConfirmationEntry, ConfirmationKey};
use super::errors::RelayError;
use super::value_objects::DomainId;
use crate::algorithms::quorum::{apply_confirmation, VoteOutcome};
use std::collections::HashMap;

/// Confirmation ledger.
#[derive(Debug, Default)]
pub struct ConfirmationLedger {
    entries: HashMap<ConfirmationKey, ConfirmationEntry>,
}

impl ConfirmationLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one confirmation from `slot`.
    ///
    /// The entry is created on first confirmation and committed only if the
    /// confirmation is accepted. A drained entry keeps its payload, so later
    /// references to the same content can still deliver. Entries go away
    /// only with their session.
    pub fn confirm(
        &mut self,
        key: ConfirmationKey,
        quorum: usize,
        slot: usize,
        threshold: u8,
        payload: Option<&[u8]>,
    ) -> Result<VoteOutcome, RelayError> {
        let (next, outcome) = match self.entries.get(&key) {
            Some(entry) => apply_confirmation(entry, &key.content_hash, slot, threshold, payload)?,
            None => apply_confirmation(
                &ConfirmationEntry::new(quorum),
                &key.content_hash,
                slot,
                threshold,
                payload,
            )?,
        };

        self.entries.insert(key, next);
        Ok(outcome)
    }

    /// Entry for a key.
    pub fn get(&self, key: &ConfirmationKey) -> Option<&ConfirmationEntry> {
        self.entries.get(key)
    }

    /// Per-slot credit for a key.
    pub fn counters(&self, key: &ConfirmationKey) -> Option<Vec<u32>> {
        self.entries.get(key).map(|e| e.credits.clone())
    }

    /// Drop every entry counted under a superseded session.
    pub fn discard_session(&mut self, domain: DomainId, session_id: u64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|k, _| !(k.domain == domain && k.session_id == session_id));
        before - self.entries.len()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entry is live.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
