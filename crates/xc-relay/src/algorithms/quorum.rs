//! # Quorum Vote Accounting
//!
//! Banked-confirmation quorum over a fixed set of adapter slots.
//!
//! Each slot holds the credit its adapter has banked for one content hash.
//! A confirmation adds one unit to the sender's slot. Whenever the net
//! credit across all slots reaches `threshold`, one delivery fires and
//! exactly `threshold` units are consumed, so that at every point:
//!
//! ```text
//! confirmations - deliveries * threshold == sum(credits)
//! ```
//!
//! Surplus above the threshold stays banked for a later delivery of the same
//! content. Consumption always draws from the slot holding the most credit
//! (lowest slot on ties), which keeps the outcome independent of adapter
//! identity and never drives a slot below zero.

use crate::domain::{ConfirmationEntry, Hash, RelayError};

/// Result of applying one confirmation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Credit recorded, threshold not reached.
    Pending {
        /// Net credit after the confirmation.
        net: u64,
    },
    /// Threshold reached, payload must be delivered once.
    Deliver {
        /// Content to hand to the sink.
        payload: Vec<u8>,
        /// Net credit left after consumption.
        remaining: u64,
    },
}

/// Apply one confirmation from `slot` to a copy of `entry`.
///
/// Returns the updated entry and the outcome. The caller commits the entry
/// only on `Ok`, so a `PayloadMissing` failure leaves the ledger untouched.
pub fn apply_confirmation(
    entry: &ConfirmationEntry,
    content_hash: &Hash,
    slot: usize,
    threshold: u8,
    payload: Option<&[u8]>,
) -> Result<(ConfirmationEntry, VoteOutcome), RelayError> {
    let mut next = entry.clone();
    if slot >= next.credits.len() {
        next.credits.resize(slot + 1, 0);
    }
    next.credits[slot] = next.credits[slot].saturating_add(1);
    if next.payload.is_none() {
        if let Some(bytes) = payload {
            next.payload = Some(bytes.to_vec());
        }
    }

    let net = next.net_confirmations();
    if net < threshold as u64 {
        return Ok((next, VoteOutcome::Pending { net }));
    }

    let payload = next
        .payload
        .clone()
        .ok_or(RelayError::PayloadMissing(*content_hash))?;
    consume_threshold(&mut next.credits, threshold);
    next.deliveries += 1;
    let remaining = next.net_confirmations();
    Ok((next, VoteOutcome::Deliver { payload, remaining }))
}

/// Remove exactly `threshold` units of credit.
///
/// Requires `sum(credits) >= threshold`.
pub fn consume_threshold(credits: &mut [u32], threshold: u8) {
    for _ in 0..threshold {
        let richest = credits
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))
            .map(|(i, _)| i);
        match richest {
            Some(i) if credits[i] > 0 => credits[i] -= 1,
            _ => break,
        }
    }
}

/// Upper bound on deliveries for a number of confirmations.
pub fn max_deliveries(confirmations: u64, threshold: u8) -> u64 {
    if threshold == 0 {
        return 0;
    }
    confirmations / threshold as u64
}
