//! # Outbound Scenarios
//!
//! Batch accumulation, the reentrancy guard and all-or-nothing fan-out.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use xc_relay::{
        batch_hash, AppendOutcome, CallContext, DomainId, Partition, RelayApi, RelayError,
        RoundOutcome, ScopeId,
    };

    const OTHER: DomainId = DomainId(3);

    /// Add a second destination served by the same adapters.
    fn configure_other(relay: &TestRelay) {
        let ids = (0..relay.adapters.len()).map(adapter_id).collect();
        relay
            .service
            .configure(ADMIN, OTHER, ScopeId::DEFAULT, ids, 1, relay.adapters.len() as u8)
            .unwrap();
    }

    // =========================================================================
    // BATCHING
    // =========================================================================

    #[tokio::test]
    async fn test_batch_one_round_per_destination() {
        let relay = TestRelay::new(2, 1);
        configure_other(&relay);
        let m1 = message(b"first");
        let m2 = message(b"second");
        let m3 = message(b"elsewhere");

        let mut ctx = CallContext::new(ALICE);
        relay.service.open_batch(&mut ctx).unwrap();
        let queued = relay
            .service
            .append_message(&mut ctx, REMOTE, SCOPE, &m1, 10)
            .await
            .unwrap();
        assert_eq!(
            queued,
            AppendOutcome::Queued {
                pending_cost: 10,
                message_count: 1
            }
        );
        relay
            .service
            .append_message(&mut ctx, REMOTE, SCOPE, &m2, 20)
            .await
            .unwrap();
        relay
            .service
            .append_message(&mut ctx, OTHER, SCOPE, &m3, 5)
            .await
            .unwrap();
        // nothing leaves before close
        assert_eq!(relay.adapters[0].sent_count(), 0);

        let receipt = relay.service.close_batch(&mut ctx).await.unwrap();
        assert_eq!(receipt.rounds.len(), 2);
        assert!(receipt.rounds.iter().all(RoundOutcome::is_sent));
        assert!(!ctx.is_batching());

        for adapter in &relay.adapters {
            let sent = adapter.sent();
            assert_eq!(sent.len(), 2);
            assert_eq!(sent[0].domain, REMOTE);
            assert_eq!(sent[0].payload, [m1.clone(), m2.clone()].concat());
            assert_eq!(sent[0].cost_budget, 30);
            assert_eq!(sent[1].domain, OTHER);
            assert_eq!(sent[1].payload, m3);
            assert_eq!(sent[1].cost_budget, 5);
        }

        match &receipt.rounds[0] {
            RoundOutcome::Sent { messages, partition, .. } => {
                assert_eq!(*messages, 2);
                assert_eq!(*partition, Partition::new(REMOTE, SCOPE));
            }
            other => panic!("unexpected round: {:?}", other),
        }
        assert_eq!(relay.log.count("batch_sent"), 2);
    }

    #[tokio::test]
    async fn test_append_without_batch_sends_immediately() {
        let relay = TestRelay::new(2, 1);
        let mut ctx = CallContext::new(ALICE);

        let outcome = relay
            .service
            .append_message(&mut ctx, REMOTE, SCOPE, &message(b"now"), 3)
            .await
            .unwrap();
        assert!(matches!(outcome, AppendOutcome::Sent(RoundOutcome::Sent { .. })));
        assert_eq!(relay.adapters[0].sent_count(), 1);
        assert_eq!(relay.adapters[1].sent_count(), 1);
    }

    #[tokio::test]
    async fn test_close_returns_unspent_value() {
        let relay = TestRelay::with_fee(2, 1, 10);
        let mut ctx = CallContext::with_value(ALICE, 50);

        relay.service.open_batch(&mut ctx).unwrap();
        relay
            .service
            .append_message(&mut ctx, REMOTE, SCOPE, &message(b"paid"), 1)
            .await
            .unwrap();
        let receipt = relay.service.close_batch(&mut ctx).await.unwrap();
        assert_eq!(receipt.unspent, 30);
        assert_eq!(ctx.remaining_value(), 0);
    }

    #[tokio::test]
    async fn test_append_to_unconfigured_destination() {
        let relay = TestRelay::new(1, 1);
        let mut ctx = CallContext::new(ALICE);
        relay.service.open_batch(&mut ctx).unwrap();

        let result = relay
            .service
            .append_message(&mut ctx, DomainId(77), SCOPE, &message(b"lost"), 1)
            .await;
        assert!(matches!(result, Err(RelayError::NoAdapterConfigured { .. })));
        assert!(ctx.pending(&Partition::new(DomainId(77), SCOPE)).is_none());
    }

    // =========================================================================
    // REENTRANCY GUARD
    // =========================================================================

    #[tokio::test]
    async fn test_nested_open_is_rejected() {
        let relay = TestRelay::new(1, 1);
        let mut ctx = CallContext::new(ALICE);

        relay.service.open_batch(&mut ctx).unwrap();
        relay
            .service
            .append_message(&mut ctx, REMOTE, SCOPE, &message(b"kept"), 1)
            .await
            .unwrap();
        assert!(matches!(
            relay.service.open_batch(&mut ctx),
            Err(RelayError::AlreadyBatching)
        ));

        // the outer batch is untouched
        let pending = ctx.pending(&Partition::new(REMOTE, SCOPE)).unwrap();
        assert_eq!(pending.message_count, 1);
        let receipt = relay.service.close_batch(&mut ctx).await.unwrap();
        assert_eq!(receipt.rounds.len(), 1);
    }

    #[tokio::test]
    async fn test_close_without_open() {
        let relay = TestRelay::new(1, 1);
        let mut ctx = CallContext::new(ALICE);
        assert!(matches!(
            relay.service.close_batch(&mut ctx).await,
            Err(RelayError::NoBatch)
        ));

        relay.service.open_batch(&mut ctx).unwrap();
        relay.service.close_batch(&mut ctx).await.unwrap();
        assert!(matches!(
            relay.service.close_batch(&mut ctx).await,
            Err(RelayError::NoBatch)
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_sends_nothing() {
        let relay = TestRelay::new(2, 1);
        let mut ctx = CallContext::new(ALICE);
        relay.service.open_batch(&mut ctx).unwrap();

        let receipt = relay.service.close_batch(&mut ctx).await.unwrap();
        assert!(receipt.rounds.is_empty());
        assert_eq!(relay.adapters[0].sent_count(), 0);
    }

    #[tokio::test]
    async fn test_batcher_is_refund_address() {
        let relay = TestRelay::with_fee(1, 1, 4);
        let mut ctx = CallContext::with_value(ALICE, 4);
        relay.service.open_batch(&mut ctx).unwrap();
        relay
            .service
            .append_message(&mut ctx, REMOTE, SCOPE, &message(b"r"), 1)
            .await
            .unwrap();
        relay.service.close_batch(&mut ctx).await.unwrap();

        assert_eq!(relay.adapters[0].sent()[0].refund, ALICE);
        assert_eq!(relay.adapters[0].sent()[0].value, 4);
    }

    // =========================================================================
    // COST CAP
    // =========================================================================

    #[tokio::test]
    async fn test_batch_cost_cap() {
        let relay = TestRelay::new(1, 1);
        relay.service.set_max_batch_cost(ADMIN, SCOPE, 25).unwrap();
        let mut ctx = CallContext::new(ALICE);
        relay.service.open_batch(&mut ctx).unwrap();

        relay
            .service
            .append_message(&mut ctx, REMOTE, SCOPE, &message(b"a"), 10)
            .await
            .unwrap();
        let result = relay
            .service
            .append_message(&mut ctx, REMOTE, SCOPE, &message(b"b"), 20)
            .await;
        assert!(matches!(
            result,
            Err(RelayError::ExceedsMaxBatchCost { cost: 30, max: 25, .. })
        ));
        let pending = ctx.pending(&Partition::new(REMOTE, SCOPE)).unwrap();
        assert_eq!(pending.cost, 10);
        assert_eq!(pending.message_count, 1);

        // exactly at the cap is accepted
        relay
            .service
            .append_message(&mut ctx, REMOTE, SCOPE, &message(b"c"), 15)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_single_message_over_cap() {
        let relay = TestRelay::new(1, 1);
        relay.service.set_max_batch_cost(ADMIN, SCOPE, 5).unwrap();
        let mut ctx = CallContext::new(ALICE);

        let result = relay
            .service
            .append_message(&mut ctx, REMOTE, SCOPE, &message(b"big"), 6)
            .await;
        assert!(matches!(result, Err(RelayError::ExceedsMaxBatchCost { .. })));
        assert_eq!(relay.adapters[0].sent_count(), 0);
    }

    #[tokio::test]
    async fn test_cap_is_per_scope() {
        let relay = TestRelay::new(1, 1);
        relay.service.set_max_batch_cost(ADMIN, SCOPE, 5).unwrap();
        assert_eq!(relay.service.max_batch_cost(SCOPE), 5);
        assert_eq!(
            relay.service.max_batch_cost(ScopeId(9)),
            relay.service.config().default_max_batch_cost
        );
        assert!(matches!(
            relay.service.set_max_batch_cost(BOB, SCOPE, 50),
            Err(RelayError::Unauthorized(_))
        ));
    }

    // =========================================================================
    // FAN-OUT
    // =========================================================================

    #[tokio::test]
    async fn test_failed_round_restores_batch_and_subsidy() {
        let relay = TestRelay::with_fee(2, 1, 10);
        relay.service.deposit_subsidy(ADMIN, SCOPE, 100).unwrap();
        let mut ctx = CallContext::new(ALICE);
        relay.service.open_batch(&mut ctx).unwrap();
        relay
            .service
            .append_message(&mut ctx, REMOTE, SCOPE, &message(b"atomic"), 1)
            .await
            .unwrap();

        relay.adapters[1].set_failing(true);
        let result = relay.service.close_batch(&mut ctx).await;
        assert!(matches!(result, Err(RelayError::Transport { .. })));
        assert!(ctx.is_batching());
        assert_eq!(relay.service.subsidy(SCOPE), 100);
        assert_eq!(relay.log.count("batch_sent"), 0);

        relay.adapters[1].set_failing(false);
        let receipt = relay.service.close_batch(&mut ctx).await.unwrap();
        assert!(receipt.rounds[0].is_sent());
        assert_eq!(relay.service.subsidy(SCOPE), 80);
    }

    #[tokio::test]
    async fn test_failed_estimate_restores_batch() {
        let relay = TestRelay::new(2, 1);
        let mut ctx = CallContext::new(ALICE);
        relay.service.open_batch(&mut ctx).unwrap();
        relay
            .service
            .append_message(&mut ctx, REMOTE, SCOPE, &message(b"priced"), 1)
            .await
            .unwrap();

        relay.adapters[0].set_estimate_failing(true);
        assert!(relay.service.close_batch(&mut ctx).await.is_err());
        assert!(ctx.is_batching());
        assert_eq!(relay.adapters[1].sent_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_send_restores_value() {
        let relay = TestRelay::with_fee(2, 1, 10);
        relay.adapters[0].set_failing(true);
        let mut ctx = CallContext::with_value(ALICE, 20);

        let result = relay
            .service
            .send(&mut ctx, REMOTE, SCOPE, &message(b"v"), 0)
            .await;
        assert!(result.is_err());
        assert_eq!(ctx.remaining_value(), 20);
        assert!(relay.service.underpaid(REMOTE, &xc_relay::batch_hash(&message(b"v"))).is_none());
    }

    #[tokio::test]
    async fn test_recovery_only_adapters_not_used_outbound() {
        let relay = TestRelay::build(LOCAL, REMOTE, 3, 1, 2, 0);
        let mut ctx = CallContext::new(ALICE);

        relay
            .service
            .send(&mut ctx, REMOTE, SCOPE, &message(b"fanout"), 0)
            .await
            .unwrap();
        assert_eq!(relay.adapters[0].sent_count(), 1);
        assert_eq!(relay.adapters[1].sent_count(), 1);
        assert_eq!(relay.adapters[2].sent_count(), 0);
        assert_eq!(relay.log.count("proof_sent"), 2);
    }

    #[tokio::test]
    async fn test_estimate_sums_outbound_quotes() {
        let relay = TestRelay::build(LOCAL, REMOTE, 3, 1, 2, 7);
        let total = relay
            .service
            .estimate(REMOTE, SCOPE, &message(b"q"), 100)
            .await
            .unwrap();
        assert_eq!(total, 14);

        relay.adapters[1].set_estimate_failing(true);
        assert!(matches!(
            relay.service.estimate(REMOTE, SCOPE, &message(b"q"), 100).await,
            Err(RelayError::Transport { .. })
        ));
    }

    // =========================================================================
    // OUTGOING BLOCK
    // =========================================================================

    #[tokio::test]
    async fn test_outgoing_block_is_per_partition() {
        let relay = TestRelay::new(1, 1);
        relay
            .service
            .set_outgoing_blocked(ADMIN, REMOTE, SCOPE, true)
            .unwrap();
        let mut ctx = CallContext::new(ALICE);

        assert!(matches!(
            relay
                .service
                .send(&mut ctx, REMOTE, SCOPE, &message(b"x"), 0)
                .await,
            Err(RelayError::OutgoingBlocked { .. })
        ));
        // another scope on the same domain is unaffected
        relay
            .service
            .send(&mut ctx, REMOTE, ScopeId(9), &message(b"x"), 0)
            .await
            .unwrap();

        relay
            .service
            .set_outgoing_blocked(ADMIN, REMOTE, SCOPE, false)
            .unwrap();
        relay
            .service
            .send(&mut ctx, REMOTE, SCOPE, &message(b"x"), 0)
            .await
            .unwrap();
        assert_eq!(relay.log.count("outgoing_blocked_set"), 2);
    }

    #[tokio::test]
    async fn test_outgoing_block_stops_repay() {
        let relay = TestRelay::with_fee(2, 1, 10);
        let payload = message(b"parked");
        let hash = batch_hash(&payload);
        let mut ctx = CallContext::new(ALICE);
        let outcome = relay
            .service
            .send(&mut ctx, REMOTE, SCOPE, &payload, 50)
            .await
            .unwrap();
        assert!(!outcome.is_sent());

        relay
            .service
            .set_outgoing_blocked(ADMIN, REMOTE, SCOPE, true)
            .unwrap();
        let mut ctx = CallContext::with_value(BOB, 20);
        assert!(matches!(
            relay.service.repay(&mut ctx, REMOTE, &payload).await,
            Err(RelayError::OutgoingBlocked { .. })
        ));
        assert_eq!(ctx.remaining_value(), 20);
        assert_eq!(relay.service.underpaid(REMOTE, &hash).map(|e| e.attempts), Some(1));
        assert!(relay.adapters.iter().all(|a| a.sent_count() == 0));

        relay
            .service
            .set_outgoing_blocked(ADMIN, REMOTE, SCOPE, false)
            .unwrap();
        relay
            .service
            .repay(&mut ctx, REMOTE, &payload)
            .await
            .unwrap();
        assert!(relay.service.underpaid(REMOTE, &hash).is_none());
        assert!(relay.adapters.iter().all(|a| a.sent_count() == 1));
    }

    #[tokio::test]
    async fn test_outgoing_block_requires_admin() {
        let relay = TestRelay::new(1, 1);
        assert!(matches!(
            relay.service.set_outgoing_blocked(ALICE, REMOTE, SCOPE, true),
            Err(RelayError::Unauthorized(_))
        ));
        assert!(!relay.service.is_outgoing_blocked(REMOTE, SCOPE));
    }
}
