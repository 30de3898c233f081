//! Batch validation: the gate between solved puzzles and the matcher.
//!
//! Drops, with a logged reason:
//! - results whose puzzle failed to solve or decode
//! - orders whose auction id or pair disagrees with their routing metadata
//! - zero amounts and indeterminate prices
//! - bad signatures
//! - duplicates of an order already accepted
//!
//! Accepted orders come back sorted by [`OrderId`], so matching never
//! depends on the order in which puzzles happened to finish.

use std::collections::HashSet;

use sealmatch_types::{
    AuctionBatch, AuctionId, AuctionOrder, MarketPair, OrderId, Result, SealmatchError,
};

/// An order (or undecodable result) left out of matching.
#[derive(Debug)]
pub struct Rejection {
    /// `None` when the order never decoded.
    pub order_id: Option<OrderId>,
    pub reason: SealmatchError,
}

/// Orders fit for matching, plus everything that was turned away.
#[derive(Debug)]
pub struct ValidatedBatch {
    pub auction_id: AuctionId,
    pub pair: MarketPair,
    pub orders: Vec<AuctionOrder>,
    pub rejections: Vec<Rejection>,
}

/// Check one decoded order against the auction it arrived in.
pub fn validate_order(
    order: &AuctionOrder,
    auction_id: &AuctionId,
    pair: &MarketPair,
) -> Result<()> {
    if order.auction_id != *auction_id {
        return Err(SealmatchError::InvalidOrder {
            reason: format!("order for {} delivered in {auction_id}", order.auction_id),
        });
    }
    if order.pair != *pair {
        return Err(SealmatchError::InvalidOrder {
            reason: format!("order for {} delivered in {pair} auction", order.pair),
        });
    }
    if order.amount_have == 0 || order.amount_want == 0 {
        return Err(SealmatchError::InvalidOrder {
            reason: "zero amount".into(),
        });
    }
    order.price()?;
    order.verify_signature()
}

/// Validate every result of a delivered batch for `pair`.
pub fn validate_batch(batch: AuctionBatch, pair: &MarketPair) -> ValidatedBatch {
    let auction_id = batch.auction_id;
    let mut seen: HashSet<OrderId> = HashSet::new();
    let mut orders = Vec::with_capacity(batch.batch.len());
    let mut rejections = Vec::new();

    for result in batch.batch {
        let order = match result.outcome {
            Ok(order) => order,
            Err(reason) => {
                tracing::warn!(auction = %auction_id, error = %reason, "dropping unsolved order");
                rejections.push(Rejection {
                    order_id: None,
                    reason,
                });
                continue;
            }
        };
        let id = order.id();

        let routed = if result.encrypted.intended_auction != order.auction_id
            || result.encrypted.intended_pair != order.pair
        {
            Err(SealmatchError::InvalidOrder {
                reason: "sealed order disagrees with its routing metadata".into(),
            })
        } else {
            validate_order(&order, &auction_id, pair)
        };

        let verdict = routed.and_then(|()| {
            if seen.insert(id) {
                Ok(())
            } else {
                Err(SealmatchError::DuplicateOrder(id))
            }
        });

        match verdict {
            Ok(()) => orders.push(order),
            Err(reason) => {
                tracing::warn!(
                    auction = %auction_id,
                    order = %id,
                    error = %reason,
                    "rejecting order"
                );
                rejections.push(Rejection {
                    order_id: Some(id),
                    reason,
                });
            }
        }
    }

    orders.sort_by_key(AuctionOrder::id);

    tracing::info!(
        auction = %auction_id,
        accepted = orders.len(),
        rejected = rejections.len(),
        "batch validated"
    );

    ValidatedBatch {
        auction_id,
        pair: pair.clone(),
        orders,
        rejections,
    }
}
