//! Determinism verification utilities for cross-node consistency.
//!
//! Every node matching the same validated batch must produce the exact same
//! executions. The `execution_root` is a hash over all of them that enables
//! quick verification without comparing full payloads.

use rust_decimal::Decimal;
use sealmatch_types::{AuctionId, OrderExecution};
use sha2::{Digest, Sha256};

/// Compute the execution root over one auction's outcome.
///
/// Depends on the auction id, the clearing price, and every execution in
/// order. The same executions in the same order always produce the same root.
#[must_use]
pub fn compute_execution_root(
    auction_id: &AuctionId,
    clearing_price: Option<Decimal>,
    executions: &[OrderExecution],
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"sealmatch:execution_root:v1:");
    hasher.update(auction_id.as_bytes());
    match clearing_price {
        Some(price) => {
            hasher.update([1u8]);
            hasher.update(price.normalize().to_string().as_bytes());
        }
        None => hasher.update([0u8]),
    }
    hasher.update((executions.len() as u64).to_le_bytes());

    for exec in executions {
        hasher.update(exec.order_id.as_bytes());
        hasher.update(exec.debited.asset.as_bytes());
        hasher.update(exec.debited.amount.to_le_bytes());
        hasher.update(exec.credited.asset.as_bytes());
        hasher.update(exec.credited.amount.to_le_bytes());
        hasher.update(exec.new_amount_want.to_le_bytes());
        hasher.update(exec.new_amount_have.to_le_bytes());
        hasher.update([u8::from(exec.filled)]);
    }

    hasher.finalize().into()
}

/// Recompute the root and compare with `expected_root`.
#[must_use]
pub fn verify_execution_root(
    auction_id: &AuctionId,
    clearing_price: Option<Decimal>,
    executions: &[OrderExecution],
    expected_root: &[u8; 32],
) -> bool {
    compute_execution_root(auction_id, clearing_price, executions) == *expected_root
}

#[cfg(test)]
mod tests {
    use sealmatch_types::*;

    use super::*;

    fn make_exec(seed: u8, amount: u64) -> OrderExecution {
        OrderExecution {
            order_id: OrderId([seed; 32]),
            debited: Entry::new("LTC", amount),
            credited: Entry::new("BTC", amount),
            new_amount_want: 0,
            new_amount_have: 0,
            filled: true,
        }
    }

    const AUCTION: AuctionId = AuctionId([5u8; 32]);

    #[test]
    fn same_executions_same_root() {
        let execs = vec![make_exec(1, 10), make_exec(2, 20)];
        let a = compute_execution_root(&AUCTION, Some(Decimal::ONE), &execs);
        let b = compute_execution_root(&AUCTION, Some(Decimal::ONE), &execs);
        assert_eq!(a, b);
    }

    #[test]
    fn different_amounts_different_root() {
        let a = compute_execution_root(&AUCTION, None, &[make_exec(1, 10)]);
        let b = compute_execution_root(&AUCTION, None, &[make_exec(1, 11)]);
        assert_ne!(a, b);
    }

    #[test]
    fn order_matters() {
        let (e1, e2) = (make_exec(1, 10), make_exec(2, 10));
        let ab = compute_execution_root(&AUCTION, None, &[e1.clone(), e2.clone()]);
        let ba = compute_execution_root(&AUCTION, None, &[e2, e1]);
        assert_ne!(ab, ba, "Order of executions must affect root hash");
    }

    #[test]
    fn price_scale_does_not_matter() {
        let a = compute_execution_root(&AUCTION, Some(Decimal::new(10, 1)), &[]);
        let b = compute_execution_root(&AUCTION, Some(Decimal::ONE), &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn clearing_price_is_committed() {
        let a = compute_execution_root(&AUCTION, Some(Decimal::ONE), &[]);
        let b = compute_execution_root(&AUCTION, None, &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn verify_roots() {
        let execs = vec![make_exec(1, 10)];
        let root = compute_execution_root(&AUCTION, None, &execs);
        assert!(verify_execution_root(&AUCTION, None, &execs, &root));
        assert!(!verify_execution_root(&AUCTION, None, &execs, &[0xAB; 32]));
    }
}
