//! # Domain Value Objects
//!
//! Immutable value types for the relay engine.

use super::errors::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a remote execution domain (chain).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DomainId(pub u16);

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Partition of configuration and funds (e.g. a pool).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub u64);

impl ScopeId {
    /// Reserved scope whose adapter set is the fallback for every other scope.
    pub const DEFAULT: ScopeId = ScopeId(0);

    /// Check if this is the reserved default scope.
    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `(domain, scope)` pair. Unit of configuration and linearization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Partition {
    /// Remote domain.
    pub domain: DomainId,
    /// Scope within the domain.
    pub scope: ScopeId,
}

impl Partition {
    /// Create a new partition key.
    pub fn new(domain: DomainId, scope: ScopeId) -> Self {
        Self { domain, scope }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.scope)
    }
}

/// Result of the sink's classification hook for an inbound payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    /// Scope the content belongs to.
    pub scope: ScopeId,
    /// Hash identifying the content being confirmed.
    pub content_hash: Hash,
    /// True if the payload carries the full content, false for a hash reference.
    pub is_primary: bool,
}

impl Classification {
    /// Full-payload confirmation.
    pub fn primary(scope: ScopeId, content_hash: Hash) -> Self {
        Self {
            scope,
            content_hash,
            is_primary: true,
        }
    }

    /// Hash-only confirmation.
    pub fn reference(scope: ScopeId, content_hash: Hash) -> Self {
        Self {
            scope,
            content_hash,
            is_primary: false,
        }
    }
}

/// Proof returned by an adapter for one transmitted payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterProof {
    /// Adapter-specific reference (message id, tx hash, ...).
    pub reference: Hash,
}
