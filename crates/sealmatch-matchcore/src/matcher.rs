//! Uniform-price batch auction matcher.
//!
//! ```text
//! match_auction(AuctionId, pair, [AuctionOrder]) -> AuctionOutcome
//! ```
//!
//! Every order that trades does so at one clearing price. No side effects:
//! balances are checked and moved by the settlement engine afterwards.
//!
//! ## Algorithm
//!
//! 1. Sort orders by [`OrderId`](sealmatch_types::OrderId) and load them into a fresh book
//! 2. Compute the clearing price `c` (see [`crate::clearing`])
//! 3. Eligible orders: buys priced at or above `c`, sells at or below it
//! 4. Executed BASE is `min(demand, supply)`; QUOTE is `floor(BASE * c)`,
//!    computed from the exact crossing totals
//! 5. The short side fills completely; the long side is rationed pro rata
//!    by BASE, and QUOTE is split by allocated BASE on both sides
//! 6. Emit executions (buys, then sells) and the execution root
//!
//! QUOTE rounding dust stays with the buyers as unspent balance.

use rust_decimal::Decimal;
use sealmatch_types::{
    AuctionId, AuctionOrder, MarketPair, OrderExecution, RestingOrder, Result,
    SealmatchError, SettlementExecution,
};

use crate::allocation::apportion;
use crate::clearing::compute_clearing_price;
use crate::determinism::compute_execution_root;
use crate::fill::fill_order;
use crate::validation::ValidatedBatch;
use crate::OrderBook;

/// Everything one auction produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionOutcome {
    pub auction_id: AuctionId,
    pub pair: MarketPair,
    /// `None` when the book did not cross.
    pub clearing_price: Option<Decimal>,
    pub order_executions: Vec<OrderExecution>,
    /// Two per order execution: the debit, then the credit.
    pub settlement_executions: Vec<SettlementExecution>,
    pub execution_root: [u8; 32],
}

impl AuctionOutcome {
    /// An outcome with no trades and no clearing price.
    #[must_use]
    pub fn empty(auction_id: AuctionId, pair: MarketPair) -> Self {
        Self {
            auction_id,
            pair,
            clearing_price: None,
            order_executions: Vec::new(),
            settlement_executions: Vec::new(),
            execution_root: compute_execution_root(&auction_id, None, &[]),
        }
    }

    #[must_use]
    pub fn has_trades(&self) -> bool {
        !self.order_executions.is_empty()
    }

    /// Total BASE that changed hands.
    #[must_use]
    pub fn base_volume(&self) -> u64 {
        self.order_executions
            .iter()
            .filter(|e| e.credited.asset == self.pair.base)
            .map(|e| e.credited.amount)
            .sum()
    }
}

/// Match an already validated batch.
pub fn match_validated(batch: &ValidatedBatch) -> Result<AuctionOutcome> {
    match_auction(batch.auction_id, &batch.pair, &batch.orders)
}

/// Run the uniform-price auction over `orders`.
///
/// Orders that cannot enter the book (wrong pair, indeterminate price,
/// duplicate id) are skipped with a warning; run them through
/// [`validate_batch`](crate::validation::validate_batch) first to get the
/// reasons back.
///
/// ## Determinism
///
/// The outcome depends only on the set of orders, not on their order in
/// the slice: the same set yields the same executions and the same
/// `execution_root` on every node.
///
/// ## Rounding
///
/// Total QUOTE is rounded down once, then split by allocated BASE with
/// largest remainders. A seller priced exactly at the clearing price can
/// therefore receive up to one unit of QUOTE less than `amount_want` when
/// its side is split several ways; the unit stays with the buyers. Debits
/// always equal credits.
pub fn match_auction(
    auction_id: AuctionId,
    pair: &MarketPair,
    orders: &[AuctionOrder],
) -> Result<AuctionOutcome> {
    let mut sorted: Vec<&AuctionOrder> = orders.iter().collect();
    sorted.sort_by_key(|o| o.id());

    let mut book = OrderBook::new(pair.clone());
    for (sequence, order) in (0u64..).zip(sorted) {
        let inserted =
            RestingOrder::from_auction(order, sequence).and_then(|r| book.insert_order(r));
        if let Err(e) = inserted {
            tracing::warn!(
                auction = %auction_id,
                order = %order.id(),
                error = %e,
                "order left out of auction"
            );
        }
    }

    let Some(clearing) = compute_clearing_price(&book)? else {
        tracing::info!(auction = %auction_id, orders = book.order_count(), "book did not cross");
        return Ok(AuctionOutcome::empty(auction_id, pair.clone()));
    };
    let price = clearing.clearing_price;

    let mut buys: Vec<&RestingOrder> = book
        .bid_levels()
        .filter(|level| level.price >= price)
        .flat_map(|level| level.orders.iter())
        .collect();
    let mut sells: Vec<&RestingOrder> = book
        .ask_levels()
        .filter(|level| level.price <= price)
        .flat_map(|level| level.orders.iter())
        .collect();
    buys.sort_by_key(|o| o.sequence);
    sells.sort_by_key(|o| o.sequence);

    let demand = side_base(&buys)?;
    let supply = side_base(&sells)?;
    let base_volume = demand.min(supply);
    let quote_volume = clearing.quote_for(base_volume)?;

    let buy_base = allocate_base(&buys, demand, base_volume);
    let sell_base = allocate_base(&sells, supply, base_volume);
    let buy_quote = apportion(quote_volume, &buy_base);
    let sell_quote = apportion(quote_volume, &sell_base);

    let mut order_executions = Vec::with_capacity(buys.len() + sells.len());
    let mut settlement_executions = Vec::with_capacity(2 * (buys.len() + sells.len()));
    let allocations = buys
        .iter()
        .zip(buy_base.iter().zip(&buy_quote))
        .chain(sells.iter().zip(sell_base.iter().zip(&sell_quote)));
    for (order, (&base, &quote)) in allocations {
        if base == 0 {
            continue;
        }
        let exec = fill_order(order, base, quote);
        settlement_executions.extend(exec.settlement_pair(order.pubkey));
        order_executions.push(exec);
    }

    let execution_root = compute_execution_root(&auction_id, Some(price), &order_executions);

    tracing::info!(
        auction = %auction_id,
        market = %pair,
        clearing_price = %price,
        base_volume,
        quote_volume,
        executions = order_executions.len(),
        "auction matched"
    );

    Ok(AuctionOutcome {
        auction_id,
        pair: pair.clone(),
        clearing_price: Some(price),
        order_executions,
        settlement_executions,
        execution_root,
    })
}

fn side_base(orders: &[&RestingOrder]) -> Result<u64> {
    orders
        .iter()
        .try_fold(0u64, |acc, o| acc.checked_add(o.base_amount()))
        .ok_or_else(|| SealmatchError::MatchingFailed {
            reason: "BASE volume on one side exceeds u64".into(),
        })
}

/// BASE per order. A side whose total equals the executed volume fills
/// completely; otherwise it is rationed by each order's BASE.
fn allocate_base(orders: &[&RestingOrder], side_total: u64, executed: u64) -> Vec<u64> {
    let weights: Vec<u64> = orders.iter().map(|o| o.base_amount()).collect();
    if side_total == executed {
        weights
    } else {
        apportion(executed, &weights)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use sealmatch_types::*;

    use super::*;

    const COIN: u64 = 100_000_000;

    fn pair() -> MarketPair {
        MarketPair::new("BTC", "LTC")
    }

    fn auction() -> AuctionId {
        AuctionId::derive(&pair(), 0)
    }

    fn order(side: OrderSide, have: u64, want: u64) -> AuctionOrder {
        AuctionOrder::dummy(side, have, want, auction())
    }

    /// Net balance change per asset across all traders.
    fn net_flows(outcome: &AuctionOutcome) -> HashMap<Asset, i128> {
        let mut net = HashMap::new();
        for s in &outcome.settlement_executions {
            let delta = match s.kind {
                SettlementType::Debit => -i128::from(s.amount),
                SettlementType::Credit => i128::from(s.amount),
            };
            *net.entry(s.asset.clone()).or_insert(0) += delta;
        }
        net
    }

    #[test]
    fn one_for_one_clears_at_one() {
        let buy = order(OrderSide::Buy, COIN, COIN);
        let sell = order(OrderSide::Sell, COIN, COIN);
        let outcome = match_auction(auction(), &pair(), &[buy.clone(), sell.clone()]).unwrap();

        assert_eq!(outcome.clearing_price, Some(Decimal::ONE));
        assert_eq!(outcome.order_executions.len(), 2);
        assert_eq!(outcome.settlement_executions.len(), 4);

        let buy_exec = &outcome.order_executions[0];
        assert_eq!(buy_exec.order_id, buy.id());
        assert_eq!(buy_exec.debited, Entry::new("LTC", COIN));
        assert_eq!(buy_exec.credited, Entry::new("BTC", COIN));
        assert!(buy_exec.filled);

        let sell_exec = &outcome.order_executions[1];
        assert_eq!(sell_exec.order_id, sell.id());
        assert_eq!(sell_exec.debited, Entry::new("BTC", COIN));
        assert_eq!(sell_exec.credited, Entry::new("LTC", COIN));
        assert!(sell_exec.filled);

        assert_eq!(
            outcome.settlement_executions[0],
            SettlementExecution::debit(buy.pubkey, &Entry::new("LTC", COIN))
        );
        assert_eq!(
            outcome.settlement_executions[1],
            SettlementExecution::credit(buy.pubkey, &Entry::new("BTC", COIN))
        );
    }

    #[test]
    fn no_cross_no_trades() {
        // Buy at 0.5, sell at 2.0.
        let orders = [
            order(OrderSide::Buy, 50, 100),
            order(OrderSide::Sell, 100, 200),
        ];
        let outcome = match_auction(auction(), &pair(), &orders).unwrap();
        assert_eq!(outcome.clearing_price, None);
        assert!(!outcome.has_trades());
        assert!(outcome.settlement_executions.is_empty());
    }

    #[test]
    fn empty_auction() {
        let outcome = match_auction(auction(), &pair(), &[]).unwrap();
        assert!(!outcome.has_trades());
        assert_eq!(outcome.execution_root, compute_execution_root(&auction(), None, &[]));
    }

    #[test]
    fn one_sided_auction() {
        let orders = [order(OrderSide::Buy, 10, 10), order(OrderSide::Buy, 20, 10)];
        let outcome = match_auction(auction(), &pair(), &orders).unwrap();
        assert_eq!(outcome.clearing_price, None);
    }

    #[test]
    fn long_side_is_rationed_and_flows_net_out() {
        // Two buyers want 300 BTC in total, one seller has 100.
        let orders = [
            order(OrderSide::Buy, 200, 100),
            order(OrderSide::Buy, 400, 200),
            order(OrderSide::Sell, 100, 100),
        ];
        let outcome = match_auction(auction(), &pair(), &orders).unwrap();
        let price = outcome.clearing_price.unwrap();
        // (200 + 400 + 100) / (100 + 200 + 100)
        assert_eq!(price, Decimal::new(175, 2));

        let sell_id = orders[2].id();
        let sell_exec = outcome
            .order_executions
            .iter()
            .find(|e| e.order_id == sell_id)
            .unwrap();
        assert!(sell_exec.filled);
        assert_eq!(sell_exec.debited.amount, 100);
        assert_eq!(sell_exec.credited.amount, 175);

        let buy_base: u64 = outcome
            .order_executions
            .iter()
            .filter(|e| e.order_id != sell_id)
            .map(|e| e.credited.amount)
            .sum();
        assert_eq!(buy_base, 100);
        assert_eq!(outcome.base_volume(), 100);
        assert!(
            outcome
                .order_executions
                .iter()
                .filter(|e| e.order_id != sell_id)
                .all(|e| !e.filled)
        );

        for (asset, delta) in net_flows(&outcome) {
            assert_eq!(delta, 0, "{asset} not conserved");
        }
    }

    #[test]
    fn orders_outside_the_price_sit_out() {
        // Sell at 10 is far above any bid.
        let far_sell = order(OrderSide::Sell, 10, 100);
        let orders = [
            order(OrderSide::Buy, 30, 10),
            order(OrderSide::Sell, 10, 10),
            far_sell.clone(),
        ];
        let outcome = match_auction(auction(), &pair(), &orders).unwrap();
        assert_eq!(outcome.clearing_price, Some(Decimal::TWO));
        assert!(outcome.order_executions.iter().all(|e| e.order_id != far_sell.id()));
    }

    #[test]
    fn input_order_does_not_matter() {
        let orders = vec![
            order(OrderSide::Buy, 200, 100),
            order(OrderSide::Buy, 333, 170),
            order(OrderSide::Sell, 100, 90),
            order(OrderSide::Sell, 57, 40),
        ];
        let mut reversed = orders.clone();
        reversed.reverse();

        let a = match_auction(auction(), &pair(), &orders).unwrap();
        let b = match_auction(auction(), &pair(), &reversed).unwrap();
        assert_eq!(a, b);
        assert!(verify_root(&a));
    }

    #[test]
    fn wrong_pair_orders_are_skipped() {
        let mut stray = order(OrderSide::Sell, 10, 10);
        stray.pair = MarketPair::new("ETH", "LTC");
        let orders = [order(OrderSide::Buy, 10, 10), stray];
        let outcome = match_auction(auction(), &pair(), &orders).unwrap();
        assert!(!outcome.has_trades());
    }

    #[test]
    fn executions_list_buys_before_sells() {
        let orders = [
            order(OrderSide::Sell, 50, 50),
            order(OrderSide::Buy, 50, 50),
            order(OrderSide::Sell, 50, 50),
            order(OrderSide::Buy, 50, 50),
        ];
        let outcome = match_auction(auction(), &pair(), &orders).unwrap();
        let sides: Vec<OrderSide> = outcome
            .order_executions
            .iter()
            .map(|e| side_of(e, &pair()))
            .collect();
        assert_eq!(
            sides,
            vec![OrderSide::Buy, OrderSide::Buy, OrderSide::Sell, OrderSide::Sell]
        );
    }

    fn side_of(exec: &OrderExecution, pair: &MarketPair) -> OrderSide {
        if exec.credited.asset == pair.base {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        }
    }

    fn verify_root(outcome: &AuctionOutcome) -> bool {
        crate::determinism::verify_execution_root(
            &outcome.auction_id,
            outcome.clearing_price,
            &outcome.order_executions,
            &outcome.execution_root,
        )
    }

    #[test]
    fn seller_at_a_repeating_price_gets_its_full_want() {
        // 7 LTC for 3 BTC on both sides: the price 7/3 has no exact decimal.
        let orders = vec![
            order(OrderSide::Buy, 7, 3),
            order(OrderSide::Sell, 3, 7),
        ];
        let outcome = match_auction(auction(), &pair(), &orders).unwrap();
        assert!(outcome.order_executions.iter().all(|e| e.filled));
        let sell = outcome
            .order_executions
            .iter()
            .find(|e| e.credited.asset == "LTC")
            .unwrap();
        assert_eq!(sell.credited.amount, 7);
        assert_eq!(sell.debited.amount, 3);
    }
}
