//! Relay Service - Core business logic
//!
//! Wires the adapter registry, the confirmation, fee and delivery ledgers and
//! the outbound ports together behind the `RelayApi` port.
//!
//! State lives behind one `parking_lot::RwLock`. Guards are never held across
//! an adapter or sink call: each operation mutates state in short critical
//! sections around the external I/O.

use crate::algorithms::{batch_hash, message_hash, short_hex, VoteOutcome};
use crate::config::RelayConfig;
use crate::domain::{
    invariant_batch_cost, split_messages, AdapterId, AdapterProof, AdapterRegistry,
    AdapterSetConfig, Address, Amount, CallContext, ConfirmationKey, ConfirmationLedger,
    DeliveryLedger, DomainId, FeeLedger, Hash, Partition, Payment, PendingBatch, RelayError,
    RelayEvent, RelayResult, RoundId, ScopeId, UnderpaidEntry,
};
use crate::metrics;
use crate::ports::inbound::{
    AppendOutcome, CloseReceipt, ConfirmReceipt, RelayApi, RepayReceipt, RoundOutcome,
};
use crate::ports::outbound::{Adapter, EventPublisher, MessageSink};
use async_trait::async_trait;
use futures::future::try_join_all;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Internal state of the engine.
struct RelayState {
    registry: AdapterRegistry,
    confirmations: ConfirmationLedger,
    fees: FeeLedger,
    deliveries: DeliveryLedger,
    /// Registered transport handles by id
    transports: HashMap<AdapterId, Arc<dyn Adapter>>,
    admins: HashSet<Address>,
    managers: HashMap<ScopeId, HashSet<Address>>,
    recoverers: HashSet<Address>,
    /// Per-scope batch cost caps
    max_batch_cost: HashMap<ScopeId, u64>,
    outgoing_blocked: HashSet<Partition>,
}

impl RelayState {
    fn new(config: &RelayConfig) -> Self {
        Self {
            registry: AdapterRegistry::new(config.max_adapters),
            confirmations: ConfirmationLedger::new(),
            fees: FeeLedger::new(),
            deliveries: DeliveryLedger::new(),
            transports: HashMap::new(),
            admins: config.admins.iter().copied().collect(),
            managers: HashMap::new(),
            recoverers: HashSet::new(),
            max_batch_cost: HashMap::new(),
            outgoing_blocked: HashSet::new(),
        }
    }

    fn ensure_admin(&self, caller: Address) -> RelayResult<()> {
        if self.admins.contains(&caller) {
            Ok(())
        } else {
            Err(RelayError::Unauthorized(caller))
        }
    }

    /// Administrators act as managers of every scope.
    fn ensure_manager(&self, caller: Address, scope: ScopeId) -> RelayResult<()> {
        let is_manager = self
            .managers
            .get(&scope)
            .is_some_and(|m| m.contains(&caller));
        if is_manager || self.admins.contains(&caller) {
            Ok(())
        } else {
            Err(RelayError::Unauthorized(caller))
        }
    }
}

/// Outbound round priced but not yet paid.
struct Quote {
    round: RoundId,
    partition: Partition,
    batch_hash: Hash,
    payload: Vec<u8>,
    cost_budget: u64,
    messages: usize,
    legs: Vec<(Arc<dyn Adapter>, Amount)>,
}

impl Quote {
    fn total(&self) -> Amount {
        self.legs
            .iter()
            .fold(0, |acc: Amount, (_, cost)| acc.saturating_add(*cost))
    }
}

type Proofs = Vec<(AdapterId, Amount, AdapterProof)>;

/// Relay service implementation.
pub struct RelayService<S: MessageSink> {
    config: RelayConfig,
    state: Arc<RwLock<RelayState>>,
    sink: Arc<S>,
    events: Arc<dyn EventPublisher>,
}

impl<S: MessageSink> RelayService<S> {
    /// Create a new relay service.
    pub fn new(config: RelayConfig, sink: Arc<S>, events: Arc<dyn EventPublisher>) -> Self {
        info!(
            "[xc-relay] Starting relay on domain {} with {} administrator(s)",
            config.local_domain,
            config.admins.len()
        );
        Self {
            state: Arc::new(RwLock::new(RelayState::new(&config))),
            config,
            sink,
            events,
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    fn emit(&self, event: RelayEvent) {
        let name = event.name();
        if let Err(e) = self.events.publish(event) {
            warn!("[xc-relay] Failed to publish {} event: {}", name, e);
        }
    }

    // =========================================================================
    // ADMINISTRATION
    // =========================================================================

    /// Grant administrator rights.
    pub fn rely(&self, caller: Address, who: Address) -> RelayResult<()> {
        let mut state = self.state.write();
        state.ensure_admin(caller)?;
        state.admins.insert(who);
        info!("[xc-relay] Administrator {} added", hex::encode(who));
        Ok(())
    }

    /// Revoke administrator rights.
    pub fn deny(&self, caller: Address, who: Address) -> RelayResult<()> {
        let mut state = self.state.write();
        state.ensure_admin(caller)?;
        state.admins.remove(&who);
        info!("[xc-relay] Administrator {} removed", hex::encode(who));
        Ok(())
    }

    /// Register a transport handle under its id.
    pub fn register_adapter(&self, caller: Address, adapter: Arc<dyn Adapter>) -> RelayResult<AdapterId> {
        let id = adapter.id();
        let mut state = self.state.write();
        state.ensure_admin(caller)?;
        state.transports.insert(id, adapter);
        info!("[xc-relay] Adapter {} registered", hex::encode(id));
        Ok(id)
    }

    /// Remove a transport handle. Fails while any adapter set references it.
    pub fn deregister_adapter(&self, caller: Address, id: AdapterId) -> RelayResult<()> {
        let mut state = self.state.write();
        state.ensure_admin(caller)?;
        if state.registry.is_referenced(&id) {
            return Err(RelayError::InvalidConfiguration(format!(
                "adapter {} still referenced by an adapter set",
                hex::encode(id)
            )));
        }
        if state.transports.remove(&id).is_none() {
            return Err(RelayError::UnregisteredAdapter(id));
        }
        info!("[xc-relay] Adapter {} deregistered", hex::encode(id));
        Ok(())
    }

    /// Replace the adapter set of `(domain, scope)` and start a new session.
    ///
    /// Confirmation entries of the superseded session are discarded.
    pub fn configure(
        &self,
        caller: Address,
        domain: DomainId,
        scope: ScopeId,
        adapters: Vec<AdapterId>,
        threshold: u8,
        recovery_index: u8,
    ) -> RelayResult<AdapterSetConfig> {
        if domain == self.config.local_domain {
            return Err(RelayError::InvalidConfiguration(format!(
                "domain {} is the local domain",
                domain
            )));
        }

        let (config, discarded) = {
            let mut state = self.state.write();
            state.ensure_admin(caller)?;
            if let Some(missing) = adapters.iter().find(|id| !state.transports.contains_key(*id)) {
                return Err(RelayError::UnregisteredAdapter(*missing));
            }
            let (config, previous) =
                state
                    .registry
                    .configure(domain, scope, adapters, threshold, recovery_index)?;
            let discarded = previous
                .map(|session| state.confirmations.discard_session(domain, session))
                .unwrap_or(0);
            (config, discarded)
        };

        info!(
            "[xc-relay] Session {} started for {}: {} adapter(s), threshold {}, recovery index {}",
            config.session_id,
            config.partition,
            config.quorum(),
            config.threshold,
            config.recovery_index
        );
        if discarded > 0 {
            debug!(
                "[xc-relay] Discarded {} in-flight confirmation entries for {}",
                discarded, config.partition
            );
        }
        self.emit(RelayEvent::SessionStarted {
            partition: config.partition,
            session_id: config.session_id,
            quorum: config.quorum(),
            threshold: config.threshold,
            recovery_index: config.recovery_index,
        });
        Ok(config)
    }

    /// Grant or revoke manager rights for a scope.
    pub fn set_manager(&self, caller: Address, scope: ScopeId, who: Address, enabled: bool) -> RelayResult<()> {
        let mut state = self.state.write();
        state.ensure_admin(caller)?;
        let managers = state.managers.entry(scope).or_default();
        if enabled {
            managers.insert(who);
        } else {
            managers.remove(&who);
        }
        Ok(())
    }

    /// Grant or revoke the right to call `recover`.
    pub fn set_recoverer(&self, caller: Address, who: Address, enabled: bool) -> RelayResult<()> {
        let mut state = self.state.write();
        state.ensure_admin(caller)?;
        if enabled {
            state.recoverers.insert(who);
        } else {
            state.recoverers.remove(&who);
        }
        Ok(())
    }

    /// Set the batch cost cap of a scope.
    pub fn set_max_batch_cost(&self, caller: Address, scope: ScopeId, max: u64) -> RelayResult<()> {
        let mut state = self.state.write();
        state.ensure_admin(caller)?;
        state.max_batch_cost.insert(scope, max);
        Ok(())
    }

    /// Block or unblock outgoing messages for a partition.
    pub fn set_outgoing_blocked(
        &self,
        caller: Address,
        domain: DomainId,
        scope: ScopeId,
        blocked: bool,
    ) -> RelayResult<()> {
        let partition = Partition::new(domain, scope);
        {
            let mut state = self.state.write();
            state.ensure_admin(caller)?;
            if blocked {
                state.outgoing_blocked.insert(partition);
            } else {
                state.outgoing_blocked.remove(&partition);
            }
        }
        info!("[xc-relay] Outgoing for {} blocked: {}", partition, blocked);
        self.emit(RelayEvent::OutgoingBlockedSet { partition, blocked });
        Ok(())
    }

    // =========================================================================
    // SUBSIDY
    // =========================================================================

    /// Credit a scope's subsidy. Returns the new balance.
    pub fn deposit_subsidy(&self, caller: Address, scope: ScopeId, amount: Amount) -> RelayResult<Amount> {
        let balance = {
            let mut state = self.state.write();
            state.ensure_manager(caller, scope)?;
            state.fees.deposit(scope, amount)
        };
        debug!("[xc-relay] Subsidy for scope {} now {}", scope, balance);
        self.emit(RelayEvent::SubsidyDeposited { scope, amount });
        Ok(balance)
    }

    /// Debit a scope's subsidy to `to`. Returns the new balance.
    pub fn withdraw_subsidy(
        &self,
        caller: Address,
        scope: ScopeId,
        amount: Amount,
        to: Address,
    ) -> RelayResult<Amount> {
        let balance = {
            let mut state = self.state.write();
            state.ensure_manager(caller, scope)?;
            state.fees.withdraw(scope, amount)?
        };
        debug!("[xc-relay] Subsidy for scope {} now {}", scope, balance);
        self.emit(RelayEvent::SubsidyWithdrawn { scope, amount, to });
        Ok(balance)
    }

    /// Register the address adapters refund overpayments to.
    pub fn set_refund_target(&self, caller: Address, scope: ScopeId, target: Address) -> RelayResult<()> {
        {
            let mut state = self.state.write();
            state.ensure_manager(caller, scope)?;
            state.fees.set_refund_target(scope, target);
        }
        self.emit(RelayEvent::RefundTargetSet { scope, target });
        Ok(())
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Current session of the set resolved for a partition.
    pub fn session_id(&self, domain: DomainId, scope: ScopeId) -> Option<u64> {
        self.state.read().registry.session_id(domain, scope)
    }

    /// Adapter set resolved for a partition.
    pub fn adapter_config(&self, domain: DomainId, scope: ScopeId) -> Option<AdapterSetConfig> {
        self.state.read().registry.resolve(domain, scope).ok().cloned()
    }

    /// Per-slot credit of a content under the current session.
    pub fn confirmation_counters(
        &self,
        domain: DomainId,
        scope: ScopeId,
        content_hash: Hash,
    ) -> Option<Vec<u32>> {
        let state = self.state.read();
        let session_id = state.registry.session_id(domain, scope)?;
        state.confirmations.counters(&ConfirmationKey {
            domain,
            session_id,
            content_hash,
        })
    }

    /// Underpaid entry of a batch.
    pub fn underpaid(&self, domain: DomainId, batch_hash: &Hash) -> Option<UnderpaidEntry> {
        self.state.read().fees.underpaid(domain, batch_hash).cloned()
    }

    /// Retry count of a failed message (zero if none).
    pub fn failed_count(&self, domain: DomainId, message_hash: &Hash) -> u32 {
        self.state.read().deliveries.failed_count(domain, message_hash)
    }

    /// Subsidy balance of a scope.
    pub fn subsidy(&self, scope: ScopeId) -> Amount {
        self.state.read().fees.subsidy(scope)
    }

    /// Registered refund target of a scope.
    pub fn refund_target(&self, scope: ScopeId) -> Option<Address> {
        self.state.read().fees.refund_target(scope)
    }

    /// Whether outgoing messages are blocked for a partition.
    pub fn is_outgoing_blocked(&self, domain: DomainId, scope: ScopeId) -> bool {
        self.state
            .read()
            .outgoing_blocked
            .contains(&Partition::new(domain, scope))
    }

    /// Batch cost cap of a scope.
    pub fn max_batch_cost(&self, scope: ScopeId) -> u64 {
        self.state
            .read()
            .max_batch_cost
            .get(&scope)
            .copied()
            .unwrap_or(self.config.default_max_batch_cost)
    }

    /// Whether an address is an administrator.
    pub fn is_admin(&self, who: &Address) -> bool {
        self.state.read().admins.contains(who)
    }

    /// Whether a transport is registered under an id.
    pub fn is_registered(&self, id: &AdapterId) -> bool {
        self.state.read().transports.contains_key(id)
    }

    // =========================================================================
    // INBOUND
    // =========================================================================

    async fn count_confirmation(
        &self,
        domain: DomainId,
        scope: ScopeId,
        adapter: AdapterId,
        content_hash: Hash,
        payload: Option<&[u8]>,
        recovered: bool,
    ) -> RelayResult<ConfirmReceipt> {
        let (session_id, outcome) = {
            let mut state = self.state.write();
            let (slot, quorum, threshold, session_id) = {
                let config = state.registry.resolve(domain, scope)?;
                let slot = config
                    .slot_of(&adapter)
                    .ok_or(RelayError::UnknownAdapter { domain, adapter })?;
                (slot, config.adapters.len(), config.threshold, config.session_id)
            };
            let key = ConfirmationKey {
                domain,
                session_id,
                content_hash,
            };
            let outcome = state
                .confirmations
                .confirm(key, quorum, slot, threshold, payload)?;
            (session_id, outcome)
        };

        metrics::record_confirmation(recovered);
        let (net, delivered) = match &outcome {
            VoteOutcome::Pending { net } => (*net, None),
            VoteOutcome::Deliver { payload, remaining } => (*remaining, Some(payload)),
        };
        debug!(
            "[xc-relay] Confirmation from {} for {} (domain {}, session {}), net {}",
            hex::encode(&adapter[..4]),
            short_hex(&content_hash),
            domain,
            session_id,
            net
        );
        self.emit(RelayEvent::Confirmed {
            domain,
            adapter,
            content_hash,
            session_id,
            net,
            recovered,
        });

        let mut receipt = ConfirmReceipt {
            content_hash,
            session_id,
            net,
            delivered: false,
            processed: 0,
            failed: 0,
        };
        if let Some(content) = delivered {
            info!(
                "[xc-relay] Threshold reached for {} from domain {}, delivering",
                short_hex(&content_hash),
                domain
            );
            metrics::record_delivery();
            self.emit(RelayEvent::Delivered {
                domain,
                content_hash,
                session_id,
            });
            let (processed, failed) = self.process_content(domain, content).await;
            receipt.delivered = true;
            receipt.processed = processed;
            receipt.failed = failed;
        }
        Ok(receipt)
    }

    /// Hand every message of delivered content to the sink in isolation.
    async fn process_content(&self, domain: DomainId, content: &[u8]) -> (usize, usize) {
        let sink = &self.sink;
        let (messages, remainder) = split_messages(content, |bytes| sink.message_length(bytes));

        let mut processed = 0;
        let mut failed = 0;
        for message in messages {
            match self.sink.deliver(domain, message).await {
                Ok(()) => {
                    processed += 1;
                    self.emit(RelayEvent::MessageProcessed {
                        domain,
                        message_hash: message_hash(message),
                    });
                }
                Err(e) => {
                    failed += 1;
                    self.record_failed(domain, message, e.0);
                }
            }
        }
        if let Some(rest) = remainder {
            failed += 1;
            self.record_failed(domain, rest, "unframeable remainder".to_string());
        }
        (processed, failed)
    }

    fn record_failed(&self, domain: DomainId, message: &[u8], reason: String) {
        let hash = message_hash(message);
        let retry_count = self.state.write().deliveries.record_failure(domain, hash);
        metrics::record_message_failed();
        warn!(
            "[xc-relay] Message {} from domain {} failed (count {}): {}",
            short_hex(&hash),
            domain,
            retry_count,
            reason
        );
        self.emit(RelayEvent::MessageFailed {
            domain,
            message_hash: hash,
            retry_count,
            reason,
        });
    }

    // =========================================================================
    // OUTBOUND
    // =========================================================================

    fn ensure_outgoing(&self, domain: DomainId, scope: ScopeId) -> RelayResult<()> {
        if self.is_outgoing_blocked(domain, scope) {
            return Err(RelayError::OutgoingBlocked { domain, scope });
        }
        Ok(())
    }

    /// Transport handles of the outbound adapters resolved for a partition.
    fn outbound_handles(&self, partition: Partition) -> RelayResult<Vec<Arc<dyn Adapter>>> {
        let state = self.state.read();
        let config = state.registry.resolve(partition.domain, partition.scope)?;
        let ids = config.outbound_adapters();
        if ids.is_empty() {
            return Err(RelayError::NoAdapterConfigured {
                domain: partition.domain,
                scope: partition.scope,
            });
        }
        ids.iter()
            .map(|id| {
                state
                    .transports
                    .get(id)
                    .cloned()
                    .ok_or(RelayError::UnregisteredAdapter(*id))
            })
            .collect()
    }

    /// Price a payload on every outbound adapter concurrently.
    async fn quote(
        &self,
        partition: Partition,
        payload: Vec<u8>,
        cost_budget: u64,
        messages: usize,
    ) -> RelayResult<Quote> {
        let handles = self.outbound_handles(partition)?;
        let domain = partition.domain;
        let costs = {
            let bytes: &[u8] = &payload;
            try_join_all(handles.iter().map(|adapter| async move {
                adapter
                    .estimate(domain, bytes, cost_budget)
                    .await
                    .map_err(|e| RelayError::Transport {
                        adapter: adapter.id(),
                        reason: e.0,
                    })
            }))
            .await?
        };
        Ok(Quote {
            round: Uuid::new_v4(),
            partition,
            batch_hash: batch_hash(&payload),
            payload,
            cost_budget,
            messages,
            legs: handles.into_iter().zip(costs).collect(),
        })
    }

    async fn quote_all(&self, pending: &[PendingBatch]) -> RelayResult<Vec<Quote>> {
        try_join_all(pending.iter().map(|batch| {
            self.quote(
                batch.partition,
                batch.payload.clone(),
                batch.cost,
                batch.message_count,
            )
        }))
        .await
    }

    /// Send a quoted payload through every leg, paying each its quote.
    async fn transmit(&self, quote: &Quote, refund: Address) -> RelayResult<Proofs> {
        let domain = quote.partition.domain;
        let payload: &[u8] = &quote.payload;
        let cost_budget = quote.cost_budget;
        try_join_all(quote.legs.iter().map(|(adapter, cost)| async move {
            let id = adapter.id();
            adapter
                .send(domain, payload, cost_budget, refund, *cost)
                .await
                .map(|proof| (id, *cost, proof))
                .map_err(|e| RelayError::Transport {
                    adapter: id,
                    reason: e.0,
                })
        }))
        .await
    }

    /// Pay for and transmit quoted rounds as one unit.
    ///
    /// Payments are planned and reserved for every round before anything is
    /// sent. Rounds the available funds cannot cover are parked as underpaid
    /// once all covered rounds went out. If any send fails, every reservation
    /// is released and nothing is recorded.
    async fn dispatch(
        &self,
        ctx: &mut CallContext,
        initiator: Address,
        quotes: Vec<Quote>,
    ) -> RelayResult<Vec<RoundOutcome>> {
        let mut payments = Vec::with_capacity(quotes.len());
        let mut refunds = Vec::with_capacity(quotes.len());
        {
            let mut state = self.state.write();
            for quote in &quotes {
                let scope = quote.partition.scope;
                let payment = state
                    .fees
                    .plan_payment(scope, quote.total(), ctx.remaining_value());
                if let Payment::Covered { from_value, .. } = payment {
                    state.fees.reserve(scope, &payment);
                    ctx.spend(from_value);
                }
                refunds.push(state.fees.refund_target(scope).unwrap_or(initiator));
                payments.push(payment);
            }
        }

        let rounds = quotes
            .iter()
            .zip(&payments)
            .zip(&refunds)
            .filter(|((_, payment), _)| matches!(payment, Payment::Covered { .. }))
            .map(|((quote, _), refund)| self.transmit(quote, *refund));
        let proofs = match try_join_all(rounds).await {
            Ok(proofs) => proofs,
            Err(err) => {
                let mut state = self.state.write();
                for (quote, payment) in quotes.iter().zip(&payments) {
                    state.fees.release(quote.partition.scope, payment);
                    if let Payment::Covered { from_value, .. } = payment {
                        ctx.add_value(*from_value);
                    }
                }
                warn!("[xc-relay] Outbound round aborted: {}", err);
                return Err(err);
            }
        };

        let mut outcomes = Vec::with_capacity(quotes.len());
        {
            let mut state = self.state.write();
            for (quote, payment) in quotes.iter().zip(&payments) {
                let outcome = match payment {
                    Payment::Covered { .. } => RoundOutcome::Sent {
                        round: quote.round,
                        partition: quote.partition,
                        batch_hash: quote.batch_hash,
                        cost: quote.total(),
                        messages: quote.messages,
                    },
                    Payment::Short { required, .. } => RoundOutcome::Underpaid {
                        round: quote.round,
                        partition: quote.partition,
                        batch_hash: quote.batch_hash,
                        required_cost: *required,
                        attempts: state.fees.record_underpaid(
                            quote.partition.domain,
                            quote.batch_hash,
                            quote.partition.scope,
                            quote.cost_budget,
                            *required,
                        ),
                    },
                };
                outcomes.push(outcome);
            }
        }

        let mut proofs = proofs.into_iter();
        for (quote, (outcome, payment)) in quotes.iter().zip(outcomes.iter().zip(&payments)) {
            match (outcome, payment) {
                (RoundOutcome::Sent { .. }, Payment::Covered { from_value, from_subsidy }) => {
                    self.emit_proofs(quote, proofs.next().unwrap_or_default());
                    metrics::record_round_sent();
                    info!(
                        "[xc-relay] Round {} sent to {}: {} message(s), cost {} ({} supplied, {} subsidy)",
                        quote.round,
                        quote.partition,
                        quote.messages,
                        quote.total(),
                        from_value,
                        from_subsidy
                    );
                    self.emit(RelayEvent::BatchSent {
                        round: quote.round,
                        partition: quote.partition,
                        batch_hash: quote.batch_hash,
                        cost: quote.total(),
                        messages: quote.messages,
                    });
                }
                (
                    RoundOutcome::Underpaid {
                        required_cost,
                        attempts,
                        ..
                    },
                    Payment::Short { available, .. },
                ) => {
                    metrics::record_round_underpaid();
                    warn!(
                        "[xc-relay] Round {} to {} underpaid: required {}, available {}",
                        quote.round, quote.partition, required_cost, available
                    );
                    self.emit(RelayEvent::BatchUnderpaid {
                        round: quote.round,
                        partition: quote.partition,
                        batch_hash: quote.batch_hash,
                        required_cost: *required_cost,
                        attempts: *attempts,
                    });
                }
                _ => {}
            }
        }
        Ok(outcomes)
    }

    fn emit_proofs(&self, quote: &Quote, proofs: Proofs) {
        for (adapter, cost, proof) in proofs {
            self.emit(RelayEvent::ProofSent {
                round: quote.round,
                domain: quote.partition.domain,
                adapter,
                payload_hash: quote.batch_hash,
                cost,
                reference: proof.reference,
            });
        }
    }
}

#[async_trait]
impl<S> RelayApi for RelayService<S>
where
    S: MessageSink + 'static,
{
    async fn confirm(
        &self,
        domain: DomainId,
        adapter: AdapterId,
        payload: &[u8],
    ) -> RelayResult<ConfirmReceipt> {
        let class = self
            .sink
            .classify(payload)
            .map_err(|e| RelayError::Classification(e.0))?;
        let primary = if class.is_primary { Some(payload) } else { None };
        self.count_confirmation(
            domain,
            class.scope,
            adapter,
            class.content_hash,
            primary,
            false,
        )
        .await
    }

    async fn recover(
        &self,
        caller: Address,
        domain: DomainId,
        scope: ScopeId,
        adapter: AdapterId,
        content_hash: Hash,
    ) -> RelayResult<ConfirmReceipt> {
        if !self.state.read().recoverers.contains(&caller) {
            return Err(RelayError::Unauthorized(caller));
        }
        info!(
            "[xc-relay] Recoverer {} confirming {} on behalf of {}",
            hex::encode(&caller[..4]),
            short_hex(&content_hash),
            hex::encode(&adapter[..4])
        );
        self.count_confirmation(domain, scope, adapter, content_hash, None, true)
            .await
    }

    async fn estimate(
        &self,
        domain: DomainId,
        scope: ScopeId,
        payload: &[u8],
        cost_budget: u64,
    ) -> RelayResult<Amount> {
        let quote = self
            .quote(Partition::new(domain, scope), payload.to_vec(), cost_budget, 1)
            .await?;
        Ok(quote.total())
    }

    async fn send(
        &self,
        ctx: &mut CallContext,
        domain: DomainId,
        scope: ScopeId,
        payload: &[u8],
        cost_budget: u64,
    ) -> RelayResult<RoundOutcome> {
        self.ensure_outgoing(domain, scope)?;
        let quote = self
            .quote(Partition::new(domain, scope), payload.to_vec(), cost_budget, 1)
            .await?;
        let initiator = ctx.initiator();
        self.dispatch(ctx, initiator, vec![quote])
            .await?
            .into_iter()
            .next()
            .ok_or(RelayError::NoAdapterConfigured { domain, scope })
    }

    fn open_batch(&self, ctx: &mut CallContext) -> RelayResult<()> {
        ctx.open_batch()?;
        debug!("[xc-relay] Batch opened by {}", hex::encode(ctx.caller()));
        Ok(())
    }

    async fn append_message(
        &self,
        ctx: &mut CallContext,
        domain: DomainId,
        scope: ScopeId,
        message: &[u8],
        cost: u64,
    ) -> RelayResult<AppendOutcome> {
        self.ensure_outgoing(domain, scope)?;
        self.state.read().registry.resolve(domain, scope)?;
        let max = self.max_batch_cost(scope);

        if ctx.is_batching() {
            let pending = ctx.append(Partition::new(domain, scope), message, cost, max)?;
            debug!(
                "[xc-relay] Queued message for {}/{}: {} message(s), cost {}",
                domain, scope, pending.message_count, pending.cost
            );
            return Ok(AppendOutcome::Queued {
                pending_cost: pending.cost,
                message_count: pending.message_count,
            });
        }

        invariant_batch_cost(scope, cost, max)?;
        let outcome = self.send(ctx, domain, scope, message, cost).await?;
        Ok(AppendOutcome::Sent(outcome))
    }

    async fn close_batch(&self, ctx: &mut CallContext) -> RelayResult<CloseReceipt> {
        let session = ctx.take_batch()?;
        let quotes = match self.quote_all(session.pending()).await {
            Ok(quotes) => quotes,
            Err(err) => {
                ctx.restore_batch(session);
                return Err(err);
            }
        };
        let rounds = match self.dispatch(ctx, session.batcher(), quotes).await {
            Ok(rounds) => rounds,
            Err(err) => {
                ctx.restore_batch(session);
                return Err(err);
            }
        };
        let unspent = ctx.take_remaining_value();
        info!(
            "[xc-relay] Batch closed: {} round(s), {} unspent",
            rounds.len(),
            unspent
        );
        Ok(CloseReceipt { rounds, unspent })
    }

    async fn repay(
        &self,
        ctx: &mut CallContext,
        domain: DomainId,
        batch: &[u8],
    ) -> RelayResult<RepayReceipt> {
        let hash = batch_hash(batch);
        let entry = self
            .underpaid(domain, &hash)
            .ok_or(RelayError::NotUnderpaid(hash))?;
        self.ensure_outgoing(domain, entry.scope)?;
        let quote = self
            .quote(
                Partition::new(domain, entry.scope),
                batch.to_vec(),
                entry.cost_budget,
                1,
            )
            .await?;
        let required = quote.total();
        let supplied = ctx.remaining_value();
        if supplied < required {
            return Err(RelayError::InsufficientRepayment { required, supplied });
        }

        // Claim one attempt before sending so concurrent repays cannot both pay.
        let (claimed, refund) = {
            let mut state = self.state.write();
            let claimed = state.fees.consume_underpaid(domain, &hash)?;
            let refund = state
                .fees
                .refund_target(entry.scope)
                .unwrap_or(ctx.initiator());
            (claimed, refund)
        };
        ctx.spend(required);

        let proofs = match self.transmit(&quote, refund).await {
            Ok(proofs) => proofs,
            Err(err) => {
                ctx.add_value(required);
                self.state.write().fees.record_underpaid(
                    domain,
                    hash,
                    entry.scope,
                    entry.cost_budget,
                    entry.required_cost,
                );
                warn!(
                    "[xc-relay] Repay of {} failed: {}",
                    short_hex(&hash),
                    err
                );
                return Err(err);
            }
        };

        let refunded = ctx.take_remaining_value();
        metrics::record_round_repaid();
        info!(
            "[xc-relay] Batch {} repaid: cost {}, refunded {}",
            short_hex(&hash),
            required,
            refunded
        );
        self.emit_proofs(&quote, proofs);
        self.emit(RelayEvent::BatchRepaid {
            round: quote.round,
            domain,
            batch_hash: hash,
            cost: required,
            refunded,
        });
        Ok(RepayReceipt {
            round: quote.round,
            cost: required,
            refunded,
            remaining_attempts: claimed.attempts,
        })
    }

    async fn retry(&self, domain: DomainId, message: &[u8]) -> RelayResult<u32> {
        let hash = message_hash(message);
        // Claim one failure before executing so overlapping retries cannot both run it.
        let remaining = self.state.write().deliveries.clear_one(domain, &hash)?;
        if let Err(e) = self.sink.deliver(domain, message).await {
            self.state.write().deliveries.record_failure(domain, hash);
            return Err(RelayError::Downstream(e.0));
        }

        metrics::record_message_retried();
        info!(
            "[xc-relay] Message {} retried, {} failure(s) left",
            short_hex(&hash),
            remaining
        );
        self.emit(RelayEvent::MessageRetried {
            domain,
            message_hash: hash,
            remaining,
        });
        Ok(remaining)
    }
}
