//! Supply conservation invariant checker.
//!
//! Enforced after every settlement:
//! ```text
//! ∀ asset: Σ balances == Σ deposits − Σ withdrawals
//! ```
//!
//! Settlement only moves funds between traders. If the totals ever drift,
//! the ledger refuses the settlement and reports it.

use std::collections::{BTreeSet, HashMap};

use sealmatch_types::{Asset, Result, SealmatchError};

/// Per-asset deposit and withdrawal totals since genesis.
#[derive(Debug, Default)]
pub struct SupplyConservation {
    deposits: HashMap<Asset, u128>,
    withdrawals: HashMap<Asset, u128>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_deposit(&mut self, asset: &str, amount: u64) {
        *self.deposits.entry(asset.to_string()).or_insert(0) += u128::from(amount);
    }

    pub fn record_withdrawal(&mut self, asset: &str, amount: u64) {
        *self.withdrawals.entry(asset.to_string()).or_insert(0) += u128::from(amount);
    }

    /// Deposits minus withdrawals. Withdrawals never exceed deposits when
    /// recorded through the ledger.
    #[must_use]
    pub fn expected_supply(&self, asset: &str) -> u128 {
        self.total_deposits(asset)
            .saturating_sub(self.total_withdrawals(asset))
    }

    /// # Errors
    /// [`SealmatchError::SupplyInvariantViolation`] if `actual_supply`
    /// differs from the expected supply.
    pub fn verify(&self, asset: &str, actual_supply: u128) -> Result<()> {
        let expected = self.expected_supply(asset);
        if actual_supply != expected {
            return Err(SealmatchError::SupplyInvariantViolation {
                reason: format!(
                    "Asset {asset}: actual supply {actual_supply} != expected {expected} \
                     (deposits={}, withdrawals={})",
                    self.total_deposits(asset),
                    self.total_withdrawals(asset),
                ),
            });
        }
        Ok(())
    }

    /// Every asset ever deposited or withdrawn, sorted.
    #[must_use]
    pub fn tracked_assets(&self) -> Vec<Asset> {
        let assets: BTreeSet<&Asset> =
            self.deposits.keys().chain(self.withdrawals.keys()).collect();
        assets.into_iter().cloned().collect()
    }

    #[must_use]
    pub fn total_deposits(&self, asset: &str) -> u128 {
        self.deposits.get(asset).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_withdrawals(&self, asset: &str) -> u128 {
        self.withdrawals.get(asset).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_supply_is_zero() {
        let sc = SupplyConservation::new();
        assert_eq!(sc.expected_supply("BTC"), 0);
        assert!(sc.verify("BTC", 0).is_ok());
    }

    #[test]
    fn deposits_and_withdrawals_move_expected() {
        let mut sc = SupplyConservation::new();
        sc.record_deposit("LTC", 1_000);
        sc.record_deposit("LTC", 500);
        sc.record_withdrawal("LTC", 300);
        assert_eq!(sc.expected_supply("LTC"), 1_200);
    }

    #[test]
    fn verify_fails_when_imbalanced() {
        let mut sc = SupplyConservation::new();
        sc.record_deposit("BTC", 10);
        let err = sc.verify("BTC", 11).unwrap_err();
        assert!(matches!(err, SealmatchError::SupplyInvariantViolation { .. }));
    }

    #[test]
    fn totals_exceed_u64() {
        let mut sc = SupplyConservation::new();
        sc.record_deposit("BTC", u64::MAX);
        sc.record_deposit("BTC", u64::MAX);
        assert_eq!(sc.expected_supply("BTC"), 2 * u128::from(u64::MAX));
    }

    #[test]
    fn tracked_assets_sorted_and_unique() {
        let mut sc = SupplyConservation::new();
        sc.record_deposit("LTC", 1);
        sc.record_deposit("BTC", 1);
        sc.record_withdrawal("LTC", 1);
        assert_eq!(sc.tracked_assets(), vec!["BTC".to_string(), "LTC".to_string()]);
    }
}
