//! Settlement idempotency guard: each auction settles at most once.
//!
//! Settling the same [`AuctionId`] a second time returns
//! [`SealmatchError::AuctionAlreadySettled`].
//!
//! The guard keeps a bounded FIFO cache so memory stays predictable in
//! long-running exchanges.

use std::collections::{HashSet, VecDeque};

use sealmatch_types::{AuctionId, Result, SealmatchError};

/// Remembers the most recently settled auctions.
///
/// When the set reaches `max_size`, the oldest entry is evicted to make room.
#[derive(Debug)]
pub struct IdempotencyGuard {
    settled: HashSet<AuctionId>,
    /// Insertion order for eviction (front = oldest).
    order: VecDeque<AuctionId>,
    max_size: usize,
}

impl IdempotencyGuard {
    /// A `max_size` of zero is treated as one.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            settled: HashSet::with_capacity(max_size),
            order: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Mark an auction as settled.
    ///
    /// # Errors
    /// [`SealmatchError::AuctionAlreadySettled`] if it already was.
    pub fn mark_settled(&mut self, auction_id: AuctionId) -> Result<()> {
        if self.settled.contains(&auction_id) {
            return Err(SealmatchError::AuctionAlreadySettled(auction_id));
        }

        if self.settled.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.settled.remove(&oldest);
            }
        }

        self.settled.insert(auction_id);
        self.order.push_back(auction_id);
        Ok(())
    }

    #[must_use]
    pub fn is_settled(&self, auction_id: &AuctionId) -> bool {
        self.settled.contains(auction_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.settled.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settled.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use sealmatch_types::MarketPair;

    use super::*;

    fn auction(seq: u64) -> AuctionId {
        AuctionId::derive(&MarketPair::new("BTC", "LTC"), seq)
    }

    #[test]
    fn first_settle_ok() {
        let mut guard = IdempotencyGuard::new(100);
        assert!(guard.mark_settled(auction(0)).is_ok());
        assert!(guard.is_settled(&auction(0)));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn double_settle_blocked() {
        let mut guard = IdempotencyGuard::new(100);
        guard.mark_settled(auction(0)).unwrap();

        let err = guard.mark_settled(auction(0)).unwrap_err();
        assert!(
            matches!(err, SealmatchError::AuctionAlreadySettled(id) if id == auction(0)),
            "Expected AuctionAlreadySettled, got: {err:?}"
        );
    }

    #[test]
    fn evicts_oldest() {
        let mut guard = IdempotencyGuard::new(3);
        for seq in 0..3 {
            guard.mark_settled(auction(seq)).unwrap();
        }
        assert_eq!(guard.len(), 3);

        guard.mark_settled(auction(3)).unwrap();
        assert_eq!(guard.len(), 3);
        assert!(!guard.is_settled(&auction(0)), "oldest should have been evicted");
        assert!(guard.is_settled(&auction(1)));
        assert!(guard.is_settled(&auction(3)));
    }

    #[test]
    fn zero_size_still_guards_latest() {
        let mut guard = IdempotencyGuard::new(0);
        guard.mark_settled(auction(0)).unwrap();
        assert!(guard.mark_settled(auction(0)).is_err());
        assert!(!guard.is_empty());
    }
}
