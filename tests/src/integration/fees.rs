//! # Fee Scenarios
//!
//! Payment from supplied value and subsidy, underpaid rounds and repayment.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use xc_relay::{batch_hash, CallContext, DomainId, RelayApi, RelayError, RoundOutcome, ScopeId};

    async fn send_underpaid(relay: &TestRelay, payload: &[u8]) -> RoundOutcome {
        let mut ctx = CallContext::new(ALICE);
        let outcome = relay
            .service
            .send(&mut ctx, REMOTE, SCOPE, payload, 50)
            .await
            .unwrap();
        assert!(!outcome.is_sent());
        outcome
    }

    // =========================================================================
    // PAYMENT
    // =========================================================================

    #[tokio::test]
    async fn test_value_spent_before_subsidy() {
        let relay = TestRelay::with_fee(2, 1, 10);
        relay.service.deposit_subsidy(ADMIN, SCOPE, 15).unwrap();
        let mut ctx = CallContext::with_value(ALICE, 5);

        relay
            .service
            .send(&mut ctx, REMOTE, SCOPE, &message(b"mixed"), 0)
            .await
            .unwrap();
        assert_eq!(ctx.remaining_value(), 0);
        assert_eq!(relay.service.subsidy(SCOPE), 0);
        assert!(relay.adapters.iter().all(|a| a.sent()[0].value == 10));
    }

    #[tokio::test]
    async fn test_subsidy_is_per_scope() {
        let relay = TestRelay::with_fee(1, 1, 10);
        relay.service.deposit_subsidy(ADMIN, ScopeId(9), 10).unwrap();
        let mut ctx = CallContext::new(ALICE);

        let outcome = relay
            .service
            .send(&mut ctx, REMOTE, SCOPE, &message(b"s"), 0)
            .await
            .unwrap();
        assert!(!outcome.is_sent());
        assert_eq!(relay.service.subsidy(ScopeId(9)), 10);
    }

    #[tokio::test]
    async fn test_later_round_underpaid_when_funds_run_out() {
        let relay = TestRelay::with_fee(2, 1, 10);
        let ids = (0..2).map(adapter_id).collect();
        relay
            .service
            .configure(ADMIN, DomainId(3), ScopeId::DEFAULT, ids, 1, 2)
            .unwrap();
        let mut ctx = CallContext::with_value(ALICE, 25);

        relay.service.open_batch(&mut ctx).unwrap();
        relay
            .service
            .append_message(&mut ctx, REMOTE, SCOPE, &message(b"first"), 1)
            .await
            .unwrap();
        relay
            .service
            .append_message(&mut ctx, DomainId(3), SCOPE, &message(b"second"), 1)
            .await
            .unwrap();
        let receipt = relay.service.close_batch(&mut ctx).await.unwrap();

        assert!(receipt.rounds[0].is_sent());
        match &receipt.rounds[1] {
            RoundOutcome::Underpaid { required_cost, attempts, .. } => {
                assert_eq!(*required_cost, 20);
                assert_eq!(*attempts, 1);
            }
            other => panic!("expected underpaid round, got {:?}", other),
        }
        assert_eq!(receipt.unspent, 5);
        assert!(relay
            .service
            .underpaid(DomainId(3), &batch_hash(&message(b"second")))
            .is_some());
    }

    // =========================================================================
    // UNDERPAID AND REPAY
    // =========================================================================

    #[tokio::test]
    async fn test_underpaid_round_parks_entry() {
        let relay = TestRelay::with_fee(2, 1, 10);
        let payload = message(b"later");

        let outcome = send_underpaid(&relay, &payload).await;
        let hash = batch_hash(&payload);
        assert_eq!(outcome.batch_hash(), hash);

        let entry = relay.service.underpaid(REMOTE, &hash).unwrap();
        assert_eq!(entry.required_cost, 20);
        assert_eq!(entry.attempts, 1);
        assert_eq!(entry.scope, SCOPE);
        assert_eq!(entry.cost_budget, 50);
        assert_eq!(relay.adapters[0].sent_count(), 0);
        assert_eq!(relay.log.count("batch_underpaid"), 1);
    }

    #[tokio::test]
    async fn test_repay_exact_amount() {
        let relay = TestRelay::with_fee(2, 1, 10);
        let payload = message(b"repaid");
        send_underpaid(&relay, &payload).await;

        let mut ctx = CallContext::with_value(BOB, 20);
        let receipt = relay
            .service
            .repay(&mut ctx, REMOTE, &payload)
            .await
            .unwrap();
        assert_eq!(receipt.cost, 20);
        assert_eq!(receipt.refunded, 0);
        assert_eq!(receipt.remaining_attempts, 0);
        assert!(relay.service.underpaid(REMOTE, &batch_hash(&payload)).is_none());

        for adapter in &relay.adapters {
            let sent = adapter.sent();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].payload, payload);
            assert_eq!(sent[0].cost_budget, 50);
            assert_eq!(sent[0].refund, BOB);
        }
        assert_eq!(relay.log.count("batch_repaid"), 1);
    }

    #[tokio::test]
    async fn test_repay_refunds_excess() {
        let relay = TestRelay::with_fee(2, 1, 10);
        let payload = message(b"generous");
        send_underpaid(&relay, &payload).await;

        let mut ctx = CallContext::with_value(BOB, 35);
        let receipt = relay
            .service
            .repay(&mut ctx, REMOTE, &payload)
            .await
            .unwrap();
        assert_eq!(receipt.refunded, 15);
        assert_eq!(ctx.remaining_value(), 0);
    }

    #[tokio::test]
    async fn test_repay_insufficient() {
        let relay = TestRelay::with_fee(2, 1, 10);
        let payload = message(b"short");
        send_underpaid(&relay, &payload).await;

        let mut ctx = CallContext::with_value(BOB, 19);
        assert!(matches!(
            relay.service.repay(&mut ctx, REMOTE, &payload).await,
            Err(RelayError::InsufficientRepayment {
                required: 20,
                supplied: 19
            })
        ));
        assert_eq!(ctx.remaining_value(), 19);
        assert_eq!(
            relay
                .service
                .underpaid(REMOTE, &batch_hash(&payload))
                .map(|e| e.attempts),
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_repay_unknown_batch() {
        let relay = TestRelay::with_fee(1, 1, 10);
        let mut ctx = CallContext::with_value(BOB, 100);
        assert!(matches!(
            relay.service.repay(&mut ctx, REMOTE, b"never parked").await,
            Err(RelayError::NotUnderpaid(_))
        ));
    }

    #[tokio::test]
    async fn test_repeated_underpaid_rounds_accumulate_attempts() {
        let relay = TestRelay::with_fee(1, 1, 10);
        let payload = message(b"twice");

        send_underpaid(&relay, &payload).await;
        match send_underpaid(&relay, &payload).await {
            RoundOutcome::Underpaid { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("expected underpaid round, got {:?}", other),
        }

        let mut ctx = CallContext::with_value(BOB, 10);
        let first = relay
            .service
            .repay(&mut ctx, REMOTE, &payload)
            .await
            .unwrap();
        assert_eq!(first.remaining_attempts, 1);
        assert!(relay.service.underpaid(REMOTE, &batch_hash(&payload)).is_some());

        let mut ctx = CallContext::with_value(BOB, 10);
        relay
            .service
            .repay(&mut ctx, REMOTE, &payload)
            .await
            .unwrap();
        assert!(relay.service.underpaid(REMOTE, &batch_hash(&payload)).is_none());
        assert_eq!(relay.adapters[0].sent_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_repay_keeps_entry() {
        let relay = TestRelay::with_fee(2, 1, 10);
        let payload = message(b"retry later");
        send_underpaid(&relay, &payload).await;

        relay.adapters[1].set_failing(true);
        let mut ctx = CallContext::with_value(BOB, 20);
        assert!(matches!(
            relay.service.repay(&mut ctx, REMOTE, &payload).await,
            Err(RelayError::Transport { .. })
        ));
        assert_eq!(ctx.remaining_value(), 20);
        let entry = relay.service.underpaid(REMOTE, &batch_hash(&payload)).unwrap();
        assert_eq!(entry.attempts, 1);

        relay.adapters[1].set_failing(false);
        relay
            .service
            .repay(&mut ctx, REMOTE, &payload)
            .await
            .unwrap();
        assert!(relay.service.underpaid(REMOTE, &batch_hash(&payload)).is_none());
    }

    // =========================================================================
    // SUBSIDY AND REFUNDS
    // =========================================================================

    #[tokio::test]
    async fn test_refund_target_overrides_initiator() {
        let relay = TestRelay::with_fee(1, 1, 3);
        relay.service.set_manager(ADMIN, SCOPE, ALICE, true).unwrap();
        relay.service.set_refund_target(ALICE, SCOPE, BOB).unwrap();
        assert_eq!(relay.service.refund_target(SCOPE), Some(BOB));

        let mut ctx = CallContext::with_value(ALICE, 3);
        relay
            .service
            .send(&mut ctx, REMOTE, SCOPE, &message(b"refund"), 0)
            .await
            .unwrap();
        assert_eq!(relay.adapters[0].sent()[0].refund, BOB);
    }

    #[tokio::test]
    async fn test_refund_target_is_manager_gated() {
        let relay = TestRelay::new(1, 1);
        assert!(matches!(
            relay.service.set_refund_target(BOB, SCOPE, BOB),
            Err(RelayError::Unauthorized(_))
        ));
        assert_eq!(relay.service.refund_target(SCOPE), None);
    }

    #[tokio::test]
    async fn test_manager_rights_are_per_scope() {
        let relay = TestRelay::new(1, 1);
        relay.service.set_manager(ADMIN, SCOPE, ALICE, true).unwrap();

        assert_eq!(relay.service.deposit_subsidy(ALICE, SCOPE, 40).unwrap(), 40);
        assert!(matches!(
            relay.service.deposit_subsidy(ALICE, ScopeId(9), 1),
            Err(RelayError::Unauthorized(_))
        ));
        assert_eq!(
            relay.service.withdraw_subsidy(ALICE, SCOPE, 15, ALICE).unwrap(),
            25
        );

        relay.service.set_manager(ADMIN, SCOPE, ALICE, false).unwrap();
        assert!(relay.service.withdraw_subsidy(ALICE, SCOPE, 1, ALICE).is_err());
        assert_eq!(relay.log.count("subsidy_withdrawn"), 1);
    }
}
