//! # Domain Invariants
//!
//! Business rules for adapter sets and batches.

use super::errors::{AdapterId, RelayError};
use super::value_objects::ScopeId;
use std::collections::HashSet;

/// Maximum number of adapters in one set.
pub const MAX_ADAPTER_COUNT: usize = 8;

/// Invariant: well-formed adapter set.
///
/// `0 < len <= max`, no duplicate ids, `0 < threshold <= len`,
/// `recovery_index <= len`.
pub fn invariant_adapter_set(
    adapters: &[AdapterId],
    threshold: u8,
    recovery_index: u8,
    max_adapters: usize,
) -> Result<(), RelayError> {
    if adapters.is_empty() {
        return Err(RelayError::InvalidConfiguration(
            "empty adapter set".to_string(),
        ));
    }
    let max = max_adapters.min(MAX_ADAPTER_COUNT);
    if adapters.len() > max {
        return Err(RelayError::InvalidConfiguration(format!(
            "{} adapters exceeds maximum {}",
            adapters.len(),
            max
        )));
    }

    let mut seen = HashSet::with_capacity(adapters.len());
    for adapter in adapters {
        if !seen.insert(*adapter) {
            return Err(RelayError::InvalidConfiguration(format!(
                "duplicate adapter {}",
                hex::encode(adapter)
            )));
        }
    }

    let quorum = adapters.len();
    if threshold == 0 || threshold as usize > quorum {
        return Err(RelayError::InvalidConfiguration(format!(
            "threshold {} outside 1..={}",
            threshold, quorum
        )));
    }
    if recovery_index as usize > quorum {
        return Err(RelayError::InvalidConfiguration(format!(
            "recovery index {} exceeds quorum {}",
            recovery_index, quorum
        )));
    }
    Ok(())
}

/// Invariant: accumulated batch cost within the scope cap.
pub fn invariant_batch_cost(scope: ScopeId, cost: u64, max: u64) -> Result<(), RelayError> {
    if cost > max {
        return Err(RelayError::ExceedsMaxBatchCost { scope, cost, max });
    }
    Ok(())
}
