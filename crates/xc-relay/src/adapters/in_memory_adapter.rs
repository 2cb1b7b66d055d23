//! In-Memory Transport Adapter
//!
//! Implements the `Adapter` port without a network. Quotes are
//! `base_fee + cost_budget * gas_price`; every accepted send is recorded.

use crate::algorithms::content_hash;
use crate::domain::{AdapterId, AdapterProof, Address, Amount, DomainId};
use crate::ports::outbound::{Adapter, AdapterError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

/// A send accepted by an `InMemoryAdapter`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentPayload {
    pub domain: DomainId,
    pub payload: Vec<u8>,
    pub cost_budget: u64,
    pub refund: Address,
    pub value: Amount,
}

/// Transport adapter backed by memory.
pub struct InMemoryAdapter {
    id: AdapterId,
    base_fee: Amount,
    gas_price: Amount,
    fail_sends: AtomicBool,
    fail_estimates: AtomicBool,
    nonce: AtomicU64,
    sent: RwLock<Vec<SentPayload>>,
}

impl InMemoryAdapter {
    /// Create an adapter charging a flat `base_fee`.
    pub fn new(id: AdapterId, base_fee: Amount) -> Self {
        Self {
            id,
            base_fee,
            gas_price: 0,
            fail_sends: AtomicBool::new(false),
            fail_estimates: AtomicBool::new(false),
            nonce: AtomicU64::new(0),
            sent: RwLock::new(Vec::new()),
        }
    }

    /// Also charge `gas_price` per unit of cost budget.
    pub fn with_gas_price(mut self, gas_price: Amount) -> Self {
        self.gas_price = gas_price;
        self
    }

    /// Make subsequent sends fail.
    pub fn set_failing(&self, failing: bool) {
        self.fail_sends.store(failing, Ordering::SeqCst);
    }

    /// Make subsequent estimates fail.
    pub fn set_estimate_failing(&self, failing: bool) {
        self.fail_estimates.store(failing, Ordering::SeqCst);
    }

    /// Sends accepted so far.
    pub fn sent(&self) -> Vec<SentPayload> {
        self.sent.read().clone()
    }

    /// Number of sends accepted so far.
    pub fn sent_count(&self) -> usize {
        self.sent.read().len()
    }

    fn quote(&self, cost_budget: u64) -> Amount {
        self.base_fee
            .saturating_add(self.gas_price.saturating_mul(cost_budget as Amount))
    }
}

#[async_trait]
impl Adapter for InMemoryAdapter {
    fn id(&self) -> AdapterId {
        self.id
    }

    async fn estimate(
        &self,
        _domain: DomainId,
        _payload: &[u8],
        cost_budget: u64,
    ) -> Result<Amount, AdapterError> {
        if self.fail_estimates.load(Ordering::SeqCst) {
            return Err(AdapterError("estimate unavailable".to_string()));
        }
        Ok(self.quote(cost_budget))
    }

    async fn send(
        &self,
        domain: DomainId,
        payload: &[u8],
        cost_budget: u64,
        refund: Address,
        value: Amount,
    ) -> Result<AdapterProof, AdapterError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(AdapterError("transport unavailable".to_string()));
        }
        let required = self.quote(cost_budget);
        if value < required {
            return Err(AdapterError(format!(
                "underpaid: required {}, got {}",
                required, value
            )));
        }

        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut preimage = Vec::with_capacity(self.id.len() + 8 + payload.len());
        preimage.extend_from_slice(&self.id);
        preimage.extend_from_slice(&nonce.to_be_bytes());
        preimage.extend_from_slice(payload);

        debug!(
            "[xc-relay] Adapter {} accepted {} bytes for domain {}",
            hex::encode(&self.id[..4]),
            payload.len(),
            domain
        );

        self.sent.write().push(SentPayload {
            domain,
            payload: payload.to_vec(),
            cost_budget,
            refund,
            value,
        });
        Ok(AdapterProof {
            reference: content_hash(&preimage),
        })
    }
}
