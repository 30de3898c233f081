//! Collaborator boundaries.
//!
//! The core produces executions; persisting balances and orders is somebody
//! else's job. These traits are the narrow calls the core makes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    Asset, AuctionId, AuctionOrder, MarketPair, OrderExecution, OrderId, Pubkey, RestingOrder,
    Result, SealmatchError, SettlementExecution, SettlementType,
};

/// Applies balance instructions.
pub trait SettlementEngine: Send {
    /// Apply one instruction and return the resulting balance.
    fn apply_settlement_execution(&mut self, exec: &SettlementExecution) -> Result<u64>;

    /// Whether `exec` can be applied right now (sufficient funds for a debit).
    fn check_valid(&self, exec: &SettlementExecution) -> Result<bool>;

    /// Check summed debits, then apply every instruction in order.
    fn settle_executions(&mut self, execs: &[SettlementExecution]) -> Result<()> {
        check_debits(&*self, execs)?;
        for exec in execs {
            self.apply_settlement_execution(exec)?;
        }
        Ok(())
    }

    /// Apply every instruction of one auction.
    fn settle_auction(
        &mut self,
        auction_id: AuctionId,
        execs: &[SettlementExecution],
    ) -> Result<()> {
        self.settle_executions(execs).map_err(|e| match e {
            SealmatchError::SettlementFailed { reason } => SealmatchError::SettlementFailed {
                reason: format!("{auction_id}: {reason}"),
            },
            other => other,
        })
    }
}

/// Fail with `SettlementFailed` unless every trader can cover the sum of
/// their debits per asset. Nothing is applied.
pub fn check_debits<S: SettlementEngine + ?Sized>(
    engine: &S,
    execs: &[SettlementExecution],
) -> Result<()> {
    let mut debits: BTreeMap<(Pubkey, Asset), u64> = BTreeMap::new();
    for exec in execs.iter().filter(|e| e.kind == SettlementType::Debit) {
        let total = debits
            .entry((exec.pubkey, exec.asset.clone()))
            .or_default();
        *total = total.saturating_add(exec.amount);
    }
    for ((pubkey, asset), amount) in debits {
        let combined = SettlementExecution {
            pubkey,
            amount,
            asset,
            kind: SettlementType::Debit,
        };
        if !engine.check_valid(&combined)? {
            return Err(SealmatchError::SettlementFailed {
                reason: format!("{pubkey} cannot cover {} {}", combined.amount, combined.asset),
            });
        }
    }
    Ok(())
}

/// Snapshot of the resting orders on one pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookView {
    /// Best price first.
    pub buys: Vec<RestingOrder>,
    /// Best price first.
    pub sells: Vec<RestingOrder>,
}

/// Persists orders and their fate.
pub trait OrderbookStore: Send {
    fn place_auction_order(&mut self, order: &AuctionOrder) -> Result<()>;

    fn cancel_order(&mut self, id: &OrderId) -> Result<()>;

    fn view_order_book(&self, pair: &MarketPair) -> Result<OrderBookView>;

    /// Record matching output. Filled orders leave the book, partial ones
    /// keep their reduced amounts.
    fn record_executions(&mut self, execs: &[OrderExecution]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::Entry;

    #[derive(Default)]
    struct MapEngine {
        balances: HashMap<(Pubkey, Asset), u64>,
        applied: usize,
    }

    impl SettlementEngine for MapEngine {
        fn apply_settlement_execution(&mut self, exec: &SettlementExecution) -> Result<u64> {
            self.applied += 1;
            let bal = self
                .balances
                .entry((exec.pubkey, exec.asset.clone()))
                .or_default();
            match exec.kind {
                SettlementType::Debit => *bal -= exec.amount,
                SettlementType::Credit => *bal += exec.amount,
            }
            Ok(*bal)
        }

        fn check_valid(&self, exec: &SettlementExecution) -> Result<bool> {
            let bal = self
                .balances
                .get(&(exec.pubkey, exec.asset.clone()))
                .copied()
                .unwrap_or(0);
            Ok(exec.kind == SettlementType::Credit || bal >= exec.amount)
        }
    }

    #[test]
    fn settle_auction_checks_summed_debits_first() {
        let pk = Pubkey([1u8; 32]);
        let mut engine = MapEngine::default();
        engine.balances.insert((pk, "LTC".into()), 150);

        let execs = vec![
            SettlementExecution::debit(pk, &Entry::new("LTC", 100)),
            SettlementExecution::credit(pk, &Entry::new("BTC", 1)),
            SettlementExecution::debit(pk, &Entry::new("LTC", 100)),
        ];
        let err = engine
            .settle_auction(AuctionId([0u8; 32]), &execs)
            .unwrap_err();
        assert!(matches!(err, SealmatchError::SettlementFailed { .. }));
        assert_eq!(engine.applied, 0);
    }

    #[test]
    fn settle_auction_applies_everything() {
        let pk = Pubkey([1u8; 32]);
        let mut engine = MapEngine::default();
        engine.balances.insert((pk, "LTC".into()), 100);
        let execs = vec![
            SettlementExecution::debit(pk, &Entry::new("LTC", 100)),
            SettlementExecution::credit(pk, &Entry::new("BTC", 100)),
        ];
        engine.settle_auction(AuctionId([0u8; 32]), &execs).unwrap();
        assert_eq!(engine.applied, 2);
        assert_eq!(engine.balances[&(pk, "BTC".to_string())], 100);
        assert_eq!(engine.balances[&(pk, "LTC".to_string())], 0);
    }
}
