//! # Fee Ledger
//!
//! Subsidy balances, refund targets and underpaid batches.
//!
//! ## Payment order
//!
//! A round's cost is covered from the caller's supplied value first, then
//! from the scope's subsidy. If both together fall short nothing is spent:
//! the batch is parked as an underpaid entry and repaid later.

use super::entities::{SubsidyAccount, UnderpaidEntry};
use super::errors::{Address, Amount, Hash, RelayError};
use super::value_objects::{DomainId, ScopeId};
use std::collections::HashMap;

/// How a round's cost will be covered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Payment {
    /// Funds cover the cost.
    Covered {
        /// Drawn from the caller's supplied value.
        from_value: Amount,
        /// Drawn from the scope subsidy.
        from_subsidy: Amount,
    },
    /// Funds fall short; nothing is drawn.
    Short {
        /// Cost of the round.
        required: Amount,
        /// Supplied value plus subsidy.
        available: Amount,
    },
}

/// Subsidy and underpayment ledger.
#[derive(Debug, Default)]
pub struct FeeLedger {
    accounts: HashMap<ScopeId, SubsidyAccount>,
    underpaid: HashMap<(DomainId, Hash), UnderpaidEntry>,
}

impl FeeLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subsidy balance of a scope.
    pub fn subsidy(&self, scope: ScopeId) -> Amount {
        self.accounts.get(&scope).map(|a| a.balance).unwrap_or(0)
    }

    /// Credit a scope's subsidy. Returns the new balance.
    pub fn deposit(&mut self, scope: ScopeId, amount: Amount) -> Amount {
        let account = self.accounts.entry(scope).or_default();
        account.balance = account.balance.saturating_add(amount);
        account.balance
    }

    /// Debit a scope's subsidy. Returns the new balance.
    pub fn withdraw(&mut self, scope: ScopeId, amount: Amount) -> Result<Amount, RelayError> {
        let balance = self.subsidy(scope);
        if amount > balance {
            return Err(RelayError::InsufficientSubsidy {
                scope,
                balance,
                requested: amount,
            });
        }
        let account = self.accounts.entry(scope).or_default();
        account.balance -= amount;
        Ok(account.balance)
    }

    /// Register the refund target of a scope.
    pub fn set_refund_target(&mut self, scope: ScopeId, target: Address) {
        self.accounts.entry(scope).or_default().refund_target = Some(target);
    }

    /// Refund target of a scope, if registered.
    pub fn refund_target(&self, scope: ScopeId) -> Option<Address> {
        self.accounts.get(&scope).and_then(|a| a.refund_target)
    }

    /// Decide how `cost` is covered given `supplied` value.
    pub fn plan_payment(&self, scope: ScopeId, cost: Amount, supplied: Amount) -> Payment {
        let from_value = cost.min(supplied);
        let shortfall = cost - from_value;
        let subsidy = self.subsidy(scope);
        if shortfall > subsidy {
            return Payment::Short {
                required: cost,
                available: supplied.saturating_add(subsidy),
            };
        }
        Payment::Covered {
            from_value,
            from_subsidy: shortfall,
        }
    }

    /// Draw the subsidy part of a covered payment.
    pub fn reserve(&mut self, scope: ScopeId, payment: &Payment) {
        if let Payment::Covered { from_subsidy, .. } = payment {
            if *from_subsidy > 0 {
                let account = self.accounts.entry(scope).or_default();
                account.balance = account.balance.saturating_sub(*from_subsidy);
            }
        }
    }

    /// Return a reserved subsidy draw after a failed round.
    pub fn release(&mut self, scope: ScopeId, payment: &Payment) {
        if let Payment::Covered { from_subsidy, .. } = payment {
            if *from_subsidy > 0 {
                self.deposit(scope, *from_subsidy);
            }
        }
    }

    /// Park an underpaid batch. Returns the number of outstanding attempts.
    pub fn record_underpaid(
        &mut self,
        domain: DomainId,
        batch_hash: Hash,
        scope: ScopeId,
        cost_budget: u64,
        required_cost: Amount,
    ) -> u32 {
        let entry = self
            .underpaid
            .entry((domain, batch_hash))
            .or_insert(UnderpaidEntry {
                scope,
                cost_budget,
                required_cost,
                attempts: 0,
            });
        entry.required_cost = required_cost;
        entry.attempts += 1;
        entry.attempts
    }

    /// Underpaid entry for a batch.
    pub fn underpaid(&self, domain: DomainId, batch_hash: &Hash) -> Option<&UnderpaidEntry> {
        self.underpaid.get(&(domain, *batch_hash))
    }

    /// Consume one outstanding attempt, deleting the entry at zero.
    pub fn consume_underpaid(
        &mut self,
        domain: DomainId,
        batch_hash: &Hash,
    ) -> Result<UnderpaidEntry, RelayError> {
        let key = (domain, *batch_hash);
        let entry = self
            .underpaid
            .get_mut(&key)
            .ok_or(RelayError::NotUnderpaid(*batch_hash))?;
        entry.attempts = entry.attempts.saturating_sub(1);
        let snapshot = entry.clone();
        if snapshot.attempts == 0 {
            self.underpaid.remove(&key);
        }
        Ok(snapshot)
    }
}
