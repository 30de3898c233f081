//! Reference in-memory ledger.
//!
//! Settlement of one auction:
//! 1. Check idempotency (no double-settlement)
//! 2. Check every trader can cover their summed debits
//! 3. Apply debits and credits; roll back if any step fails
//! 4. Verify supply conservation for every asset touched
//! 5. Mark the auction settled

use std::collections::{BTreeSet, HashMap};

use sealmatch_types::{
    Asset, AuctionId, Pubkey, Result, SealmatchError, SettlementEngine, SettlementExecution,
    SettlementType, check_debits, constants,
};

use crate::idempotency::IdempotencyGuard;
use crate::supply_conservation::SupplyConservation;

/// Per-(pubkey, asset) balances with deposits, withdrawals and
/// auction settlement.
#[derive(Debug)]
pub struct Ledger {
    balances: HashMap<(Pubkey, Asset), u64>,
    idempotency: IdempotencyGuard,
    supply: SupplyConservation,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(constants::SETTLEMENT_IDEMPOTENCY_CACHE_SIZE)
    }
}

impl Ledger {
    #[must_use]
    pub fn new(idempotency_cache_size: usize) -> Self {
        Self {
            balances: HashMap::new(),
            idempotency: IdempotencyGuard::new(idempotency_cache_size),
            supply: SupplyConservation::new(),
        }
    }

    /// Credit external funds. Returns the new balance.
    pub fn deposit(&mut self, pubkey: Pubkey, asset: &str, amount: u64) -> Result<u64> {
        let balance = self.balances.entry((pubkey, asset.to_string())).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| SealmatchError::BalanceOverflow {
                asset: asset.to_string(),
            })?;
        let new_balance = *balance;
        self.supply.record_deposit(asset, amount);
        tracing::debug!(%pubkey, asset, amount, balance = new_balance, "deposit");
        Ok(new_balance)
    }

    /// Release funds to the outside. Returns the new balance.
    pub fn withdraw(&mut self, pubkey: Pubkey, asset: &str, amount: u64) -> Result<u64> {
        let available = self.balance(pubkey, asset);
        let remaining = available
            .checked_sub(amount)
            .ok_or_else(|| SealmatchError::InsufficientBalance {
                asset: asset.to_string(),
                needed: amount,
                available,
            })?;
        self.balances.insert((pubkey, asset.to_string()), remaining);
        self.supply.record_withdrawal(asset, amount);
        tracing::debug!(%pubkey, asset, amount, balance = remaining, "withdrawal");
        Ok(remaining)
    }

    #[must_use]
    pub fn balance(&self, pubkey: Pubkey, asset: &str) -> u64 {
        self.balances
            .get(&(pubkey, asset.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Verify supply conservation for one asset.
    pub fn verify_supply(&self, asset: &str) -> Result<()> {
        let actual: u128 = self
            .balances
            .iter()
            .filter(|((_, a), _)| a == asset)
            .map(|(_, amount)| u128::from(*amount))
            .sum();
        self.supply.verify(asset, actual)
    }

    /// Verify supply conservation for every asset ever deposited.
    pub fn verify_all_supply(&self) -> Result<()> {
        for asset in self.supply.tracked_assets() {
            self.verify_supply(&asset)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn idempotency(&self) -> &IdempotencyGuard {
        &self.idempotency
    }
}

impl SettlementEngine for Ledger {
    fn apply_settlement_execution(&mut self, exec: &SettlementExecution) -> Result<u64> {
        let balance = self.balance(exec.pubkey, &exec.asset);
        let updated = match exec.kind {
            SettlementType::Debit => {
                balance
                    .checked_sub(exec.amount)
                    .ok_or_else(|| SealmatchError::InsufficientBalance {
                        asset: exec.asset.clone(),
                        needed: exec.amount,
                        available: balance,
                    })?
            }
            SettlementType::Credit => {
                balance
                    .checked_add(exec.amount)
                    .ok_or_else(|| SealmatchError::BalanceOverflow {
                        asset: exec.asset.clone(),
                    })?
            }
        };
        self.balances.insert((exec.pubkey, exec.asset.clone()), updated);
        tracing::debug!(
            pubkey = %exec.pubkey,
            asset = %exec.asset,
            kind = %exec.kind,
            amount = exec.amount,
            balance = updated,
            "settlement applied"
        );
        Ok(updated)
    }

    fn check_valid(&self, exec: &SettlementExecution) -> Result<bool> {
        let balance = self.balance(exec.pubkey, &exec.asset);
        Ok(match exec.kind {
            SettlementType::Debit => balance >= exec.amount,
            SettlementType::Credit => balance.checked_add(exec.amount).is_some(),
        })
    }

    /// Checks funding, applies, and verifies supply. On any failure every
    /// touched balance is restored.
    fn settle_executions(&mut self, execs: &[SettlementExecution]) -> Result<()> {
        let snapshot: Vec<((Pubkey, Asset), Option<u64>)> = execs
            .iter()
            .map(|e| (e.pubkey, e.asset.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|key| {
                let prior = self.balances.get(&key).copied();
                (key, prior)
            })
            .collect();

        let outcome = check_debits(&*self, execs)
            .and_then(|()| {
                execs
                    .iter()
                    .try_for_each(|e| self.apply_settlement_execution(e).map(drop))
            })
            .and_then(|()| self.verify_touched_supply(execs));

        if let Err(e) = outcome {
            for (key, prior) in snapshot {
                match prior {
                    Some(amount) => self.balances.insert(key, amount),
                    None => self.balances.remove(&key),
                };
            }
            tracing::warn!(error = %e, "settlement rolled back");
            return Err(e);
        }
        Ok(())
    }

    fn settle_auction(
        &mut self,
        auction_id: AuctionId,
        execs: &[SettlementExecution],
    ) -> Result<()> {
        if self.idempotency.is_settled(&auction_id) {
            return Err(SealmatchError::AuctionAlreadySettled(auction_id));
        }

        self.settle_executions(execs).map_err(|e| match e {
            SealmatchError::SettlementFailed { reason } => SealmatchError::SettlementFailed {
                reason: format!("{auction_id}: {reason}"),
            },
            other => other,
        })?;

        self.idempotency.mark_settled(auction_id)?;
        tracing::info!(auction = %auction_id, executions = execs.len(), "auction settled");
        Ok(())
    }
}

impl Ledger {
    fn verify_touched_supply(&self, execs: &[SettlementExecution]) -> Result<()> {
        let assets: BTreeSet<&Asset> = execs.iter().map(|e| &e.asset).collect();
        for asset in assets {
            if let Err(e) = self.verify_supply(asset) {
                tracing::error!(%asset, error = %e, "supply not conserved");
                return Err(e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sealmatch_types::*;

    use super::*;

    fn pk(seed: u8) -> Pubkey {
        Pubkey([seed; 32])
    }

    fn auction(seq: u64) -> AuctionId {
        AuctionId::derive(&MarketPair::new("BTC", "LTC"), seq)
    }

    /// Buyer pays 100 LTC for 1 BTC from the seller.
    fn trade(buyer: Pubkey, seller: Pubkey) -> Vec<SettlementExecution> {
        vec![
            SettlementExecution::debit(buyer, &Entry::new("LTC", 100)),
            SettlementExecution::credit(buyer, &Entry::new("BTC", 1)),
            SettlementExecution::debit(seller, &Entry::new("BTC", 1)),
            SettlementExecution::credit(seller, &Entry::new("LTC", 100)),
        ]
    }

    #[test]
    fn deposit_and_withdraw() {
        let mut ledger = Ledger::default();
        assert_eq!(ledger.deposit(pk(1), "LTC", 500).unwrap(), 500);
        assert_eq!(ledger.withdraw(pk(1), "LTC", 200).unwrap(), 300);
        assert_eq!(ledger.balance(pk(1), "LTC"), 300);
        ledger.verify_supply("LTC").unwrap();

        let err = ledger.withdraw(pk(1), "LTC", 301).unwrap_err();
        assert!(matches!(
            err,
            SealmatchError::InsufficientBalance {
                needed: 301,
                available: 300,
                ..
            }
        ));
    }

    #[test]
    fn deposit_overflow_rejected() {
        let mut ledger = Ledger::default();
        ledger.deposit(pk(1), "BTC", u64::MAX).unwrap();
        assert!(matches!(
            ledger.deposit(pk(1), "BTC", 1),
            Err(SealmatchError::BalanceOverflow { .. })
        ));
        assert_eq!(ledger.balance(pk(1), "BTC"), u64::MAX);
    }

    #[test]
    fn apply_reports_new_balance() {
        let mut ledger = Ledger::default();
        ledger.deposit(pk(1), "LTC", 100).unwrap();
        let debit = SettlementExecution::debit(pk(1), &Entry::new("LTC", 40));
        assert!(ledger.check_valid(&debit).unwrap());
        assert_eq!(ledger.apply_settlement_execution(&debit).unwrap(), 60);

        let too_much = SettlementExecution::debit(pk(1), &Entry::new("LTC", 61));
        assert!(!ledger.check_valid(&too_much).unwrap());
        assert!(ledger.apply_settlement_execution(&too_much).is_err());
    }

    #[test]
    fn settle_auction_moves_balances() {
        let mut ledger = Ledger::default();
        ledger.deposit(pk(1), "LTC", 100).unwrap();
        ledger.deposit(pk(2), "BTC", 1).unwrap();

        ledger.settle_auction(auction(0), &trade(pk(1), pk(2))).unwrap();

        assert_eq!(ledger.balance(pk(1), "BTC"), 1);
        assert_eq!(ledger.balance(pk(1), "LTC"), 0);
        assert_eq!(ledger.balance(pk(2), "LTC"), 100);
        assert_eq!(ledger.balance(pk(2), "BTC"), 0);
        ledger.verify_all_supply().unwrap();
    }

    #[test]
    fn double_settlement_blocked() {
        let mut ledger = Ledger::default();
        ledger.deposit(pk(1), "LTC", 200).unwrap();
        ledger.deposit(pk(2), "BTC", 2).unwrap();

        ledger.settle_auction(auction(0), &trade(pk(1), pk(2))).unwrap();
        let err = ledger
            .settle_auction(auction(0), &trade(pk(1), pk(2)))
            .unwrap_err();
        assert!(matches!(err, SealmatchError::AuctionAlreadySettled(_)));
        assert_eq!(ledger.balance(pk(1), "BTC"), 1);
    }

    #[test]
    fn unfunded_auction_leaves_balances_untouched() {
        let mut ledger = Ledger::default();
        ledger.deposit(pk(1), "LTC", 99).unwrap();
        ledger.deposit(pk(2), "BTC", 1).unwrap();

        let err = ledger
            .settle_auction(auction(0), &trade(pk(1), pk(2)))
            .unwrap_err();
        assert!(matches!(err, SealmatchError::SettlementFailed { .. }));
        assert_eq!(ledger.balance(pk(1), "LTC"), 99);
        assert_eq!(ledger.balance(pk(2), "BTC"), 1);
        assert!(!ledger.idempotency().is_settled(&auction(0)));
    }

    #[test]
    fn failed_credit_rolls_back_earlier_steps() {
        let mut ledger = Ledger::default();
        ledger.deposit(pk(1), "LTC", 100).unwrap();
        ledger.deposit(pk(2), "LTC", u64::MAX).unwrap();
        ledger.deposit(pk(2), "BTC", 1).unwrap();

        // The seller's LTC credit overflows after the buyer was debited.
        let err = ledger
            .settle_auction(auction(0), &trade(pk(1), pk(2)))
            .unwrap_err();
        assert!(matches!(err, SealmatchError::BalanceOverflow { .. }));
        assert_eq!(ledger.balance(pk(1), "LTC"), 100);
        assert_eq!(ledger.balance(pk(1), "BTC"), 0);
        assert_eq!(ledger.balance(pk(2), "BTC"), 1);
        ledger.verify_all_supply().unwrap();
    }

    #[test]
    fn unbalanced_instructions_break_supply() {
        let mut ledger = Ledger::default();
        ledger.deposit(pk(1), "LTC", 100).unwrap();
        // A credit with no matching debit mints LTC.
        let execs = [SettlementExecution::credit(pk(2), &Entry::new("LTC", 5))];
        let err = ledger.settle_auction(auction(0), &execs).unwrap_err();
        assert!(matches!(err, SealmatchError::SupplyInvariantViolation { .. }));
        assert_eq!(ledger.balance(pk(2), "LTC"), 0);
        ledger.verify_all_supply().unwrap();
    }
}
