//! Framed Message Sink
//!
//! Implements the `MessageSink` port over a minimal wire format.
//!
//! ```text
//! message   = len:u16be | scope:u64be | body[len]
//! primary   = message+                   (content hash = SHA-256 of the bytes)
//! reference = 0xFF | scope:u64be | content_hash[32]
//! ```
//!
//! A primary payload is classified under the scope of its first message.

use crate::algorithms::content_hash;
use crate::domain::{Classification, DomainId, Hash, ScopeId};
use crate::ports::outbound::{MessageSink, SinkError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use tracing::debug;

const REFERENCE_TAG: u8 = 0xFF;
const HEADER_LEN: usize = 2 + 8;
const REFERENCE_LEN: usize = 1 + 8 + 32;

/// Largest body a frame can carry (keeps the first byte below the reference tag).
pub const MAX_BODY_LEN: usize = 0xFEFF;

/// Sink that records deliveries and can be told to fail specific bodies.
#[derive(Default)]
pub struct FramedMessageSink {
    delivered: RwLock<Vec<(DomainId, Vec<u8>)>>,
    failing: RwLock<HashSet<Vec<u8>>>,
}

impl FramedMessageSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode one message.
    pub fn frame(scope: ScopeId, body: &[u8]) -> Result<Vec<u8>, SinkError> {
        if body.len() > MAX_BODY_LEN {
            return Err(SinkError(format!("body of {} bytes too large", body.len())));
        }
        let mut out = Vec::with_capacity(HEADER_LEN + body.len());
        out.extend_from_slice(&(body.len() as u16).to_be_bytes());
        out.extend_from_slice(&scope.0.to_be_bytes());
        out.extend_from_slice(body);
        Ok(out)
    }

    /// Encode a hash-only confirmation of `content`.
    pub fn reference(scope: ScopeId, content: &[u8]) -> Vec<u8> {
        Self::reference_to(scope, &content_hash(content))
    }

    /// Encode a hash-only confirmation of a known content hash.
    pub fn reference_to(scope: ScopeId, hash: &Hash) -> Vec<u8> {
        let mut out = Vec::with_capacity(REFERENCE_LEN);
        out.push(REFERENCE_TAG);
        out.extend_from_slice(&scope.0.to_be_bytes());
        out.extend_from_slice(hash);
        out
    }

    /// Body of a framed message.
    pub fn body(message: &[u8]) -> &[u8] {
        message.get(HEADER_LEN..).unwrap_or_default()
    }

    /// Fail every subsequent delivery of a message with this body.
    pub fn fail_on(&self, body: &[u8]) {
        self.failing.write().insert(body.to_vec());
    }

    /// Stop injecting failures.
    pub fn clear_failures(&self) {
        self.failing.write().clear();
    }

    /// Messages delivered so far.
    pub fn delivered(&self) -> Vec<(DomainId, Vec<u8>)> {
        self.delivered.read().clone()
    }

    /// Bodies delivered so far.
    pub fn delivered_bodies(&self) -> Vec<Vec<u8>> {
        self.delivered
            .read()
            .iter()
            .map(|(_, m)| Self::body(m).to_vec())
            .collect()
    }
}

fn read_scope(bytes: &[u8]) -> Result<ScopeId, SinkError> {
    let raw: [u8; 8] = bytes
        .get(..8)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| SinkError("truncated scope".to_string()))?;
    Ok(ScopeId(u64::from_be_bytes(raw)))
}

#[async_trait]
impl MessageSink for FramedMessageSink {
    fn classify(&self, payload: &[u8]) -> Result<Classification, SinkError> {
        match payload.first() {
            None => Err(SinkError("empty payload".to_string())),
            Some(&REFERENCE_TAG) => {
                if payload.len() != REFERENCE_LEN {
                    return Err(SinkError("malformed reference".to_string()));
                }
                let scope = read_scope(&payload[1..])?;
                let mut hash = [0u8; 32];
                hash.copy_from_slice(&payload[9..]);
                Ok(Classification::reference(scope, hash))
            }
            Some(_) => {
                let scope = read_scope(payload.get(2..).unwrap_or_default())?;
                Ok(Classification::primary(scope, content_hash(payload)))
            }
        }
    }

    fn message_length(&self, bytes: &[u8]) -> Result<usize, SinkError> {
        let raw: [u8; 2] = bytes
            .get(..2)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| SinkError("truncated length".to_string()))?;
        Ok(HEADER_LEN + u16::from_be_bytes(raw) as usize)
    }

    async fn deliver(&self, domain: DomainId, message: &[u8]) -> Result<(), SinkError> {
        if self.failing.read().contains(Self::body(message)) {
            return Err(SinkError("handler reverted".to_string()));
        }
        debug!(
            "[xc-relay] Sink executed {} byte message from domain {}",
            message.len(),
            domain
        );
        self.delivered.write().push((domain, message.to_vec()));
        Ok(())
    }
}
