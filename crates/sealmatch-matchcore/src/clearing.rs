//! Clearing price computation for sealed-bid auctions.
//!
//! 1. Find the crossing boundary: the lowest buy price that still meets the
//!    best ask, and the highest sell price the best bid still meets.
//! 2. Sum both sides of every order inside that region and divide:
//!
//! ```text
//!                  Σ buy.have + Σ sell.want      (QUOTE)
//! clearing_price = ────────────────────────
//!                  Σ buy.want + Σ sell.have      (BASE)
//! ```
//!
//! The result is a volume-weighted mediant of the crossing prices, so it
//! always lies between the best ask and the best bid.

use rust_decimal::Decimal;
use sealmatch_types::{Result, SealmatchError};

use crate::OrderBook;

/// Result of clearing price computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearingResult {
    /// The uniform clearing price.
    pub clearing_price: Decimal,
    /// Lowest buy price at or above the best ask.
    pub lowest_intersecting_price: Decimal,
    /// Highest sell price at or below the best bid.
    pub highest_intersecting_price: Decimal,
    /// QUOTE volume inside the crossing region.
    pub quote_volume: u128,
    /// BASE volume inside the crossing region.
    pub base_volume: u128,
}

impl ClearingResult {
    /// QUOTE owed for `base` units at the clearing price, rounded down.
    ///
    /// Uses the exact ratio `quote_volume / base_volume` rather than the
    /// decimal price, which is truncated for ratios like 7/3.
    pub fn quote_for(&self, base: u64) -> Result<u64> {
        match u128::from(base).checked_mul(self.quote_volume) {
            Some(numerator) => u64::try_from(numerator / self.base_volume).map_err(|_| {
                SealmatchError::MatchingFailed {
                    reason: format!("{base} x {} overflows", self.clearing_price),
                }
            }),
            None => crate::fill::quote_for(base, self.clearing_price),
        }
    }
}

/// Compute the uniform clearing price for `book`.
///
/// Returns `Ok(None)` when nothing crosses (either side empty, or best bid
/// below best ask). That is a normal outcome, not an error.
pub fn compute_clearing_price(book: &OrderBook) -> Result<Option<ClearingResult>> {
    let (Some(best_bid), Some(best_ask)) = (book.best_bid(), book.best_ask()) else {
        return Ok(None);
    };
    if best_bid < best_ask {
        return Ok(None);
    }

    let mut lowest_intersecting_price = Decimal::MAX;
    let mut highest_intersecting_price = Decimal::ZERO;
    let mut quote_volume: u128 = 0;
    let mut base_volume: u128 = 0;

    for level in book.bid_levels() {
        if level.price >= best_ask {
            lowest_intersecting_price = lowest_intersecting_price.min(level.price);
            quote_volume += level.total_quote();
            base_volume += level.total_base();
        }
    }
    for level in book.ask_levels() {
        if level.price <= best_bid {
            highest_intersecting_price = highest_intersecting_price.max(level.price);
            quote_volume += level.total_quote();
            base_volume += level.total_base();
        }
    }

    let clearing_price = price_from_totals(quote_volume, base_volume)?;

    tracing::debug!(
        market = %book.market,
        %best_bid,
        %best_ask,
        %clearing_price,
        quote_volume,
        base_volume,
        "clearing price computed"
    );

    Ok(Some(ClearingResult {
        clearing_price,
        lowest_intersecting_price,
        highest_intersecting_price,
        quote_volume,
        base_volume,
    }))
}

/// `quote / base` as a decimal. Zero `base` is reported, never divided by.
pub fn price_from_totals(quote: u128, base: u128) -> Result<Decimal> {
    if base == 0 {
        return Err(SealmatchError::ClearingPriceUndefined {
            reason: "no BASE volume in crossing region".into(),
        });
    }
    let quote = to_decimal(quote)?;
    let base = to_decimal(base)?;
    quote
        .checked_div(base)
        .ok_or_else(|| SealmatchError::ClearingPriceUndefined {
            reason: format!("{quote} / {base} out of range"),
        })
}

fn to_decimal(value: u128) -> Result<Decimal> {
    i128::try_from(value)
        .ok()
        .and_then(|v| Decimal::try_from_i128_with_scale(v, 0).ok())
        .ok_or_else(|| SealmatchError::MatchingFailed {
            reason: format!("volume {value} exceeds decimal range"),
        })
}

#[cfg(test)]
mod tests {
    use sealmatch_types::*;

    use super::*;

    fn book_with(orders: Vec<RestingOrder>) -> OrderBook {
        let mut book = OrderBook::new(MarketPair::new("BTC", "LTC"));
        for order in orders {
            book.insert_order(order).unwrap();
        }
        book
    }

    #[test]
    fn no_crossing_when_empty() {
        let book = OrderBook::new(MarketPair::new("BTC", "LTC"));
        assert!(compute_clearing_price(&book).unwrap().is_none());
    }

    #[test]
    fn no_crossing_when_one_side_empty() {
        let book = book_with(vec![RestingOrder::dummy(OrderSide::Buy, 10, 10, 0)]);
        assert!(compute_clearing_price(&book).unwrap().is_none());
    }

    #[test]
    fn no_crossing_when_bid_below_ask() {
        // buy at 0.5, sell at 2.0
        let book = book_with(vec![
            RestingOrder::dummy(OrderSide::Buy, 50, 100, 0),
            RestingOrder::dummy(OrderSide::Sell, 100, 200, 1),
        ]);
        assert!(compute_clearing_price(&book).unwrap().is_none());
    }

    #[test]
    fn crossing_at_exact_price() {
        let book = book_with(vec![
            RestingOrder::dummy(OrderSide::Buy, 100_000_000, 100_000_000, 0),
            RestingOrder::dummy(OrderSide::Sell, 100_000_000, 100_000_000, 1),
        ]);
        let result = compute_clearing_price(&book).unwrap().unwrap();
        assert_eq!(result.clearing_price, Decimal::ONE);
        assert_eq!(result.lowest_intersecting_price, Decimal::ONE);
        assert_eq!(result.highest_intersecting_price, Decimal::ONE);
    }

    #[test]
    fn weighted_price_lies_between_best_ask_and_bid() {
        // buy 10 BASE @ 3 (30 QUOTE), sell 10 BASE @ 1 (10 QUOTE)
        let book = book_with(vec![
            RestingOrder::dummy(OrderSide::Buy, 30, 10, 0),
            RestingOrder::dummy(OrderSide::Sell, 10, 10, 1),
        ]);
        let result = compute_clearing_price(&book).unwrap().unwrap();
        assert_eq!(result.clearing_price, Decimal::TWO);
        assert_eq!(result.quote_volume, 40);
        assert_eq!(result.base_volume, 20);
    }

    #[test]
    fn orders_outside_region_are_ignored() {
        // Buy at 0.5 does not reach the best ask at 1; sell at 5 is above the best bid at 3.
        let book = book_with(vec![
            RestingOrder::dummy(OrderSide::Buy, 30, 10, 0),
            RestingOrder::dummy(OrderSide::Buy, 5, 10, 1),
            RestingOrder::dummy(OrderSide::Sell, 10, 10, 2),
            RestingOrder::dummy(OrderSide::Sell, 10, 50, 3),
        ]);
        let result = compute_clearing_price(&book).unwrap().unwrap();
        assert_eq!(result.clearing_price, Decimal::TWO);
        assert_eq!(result.lowest_intersecting_price, Decimal::new(3, 0));
        assert_eq!(result.highest_intersecting_price, Decimal::ONE);
    }

    #[test]
    fn zero_base_is_undefined() {
        assert!(matches!(
            price_from_totals(10, 0),
            Err(SealmatchError::ClearingPriceUndefined { .. })
        ));
    }

    #[test]
    fn price_from_totals_divides() {
        assert_eq!(price_from_totals(1, 4).unwrap(), Decimal::new(25, 2));
    }

    #[test]
    fn quote_uses_exact_ratio() {
        // Both at 7/3: the decimal price truncates, the ratio does not.
        let book = book_with(vec![
            RestingOrder::dummy(OrderSide::Buy, 7, 3, 0),
            RestingOrder::dummy(OrderSide::Sell, 3, 7, 1),
        ]);
        let result = compute_clearing_price(&book).unwrap().unwrap();
        assert!(Decimal::from(3) * result.clearing_price < Decimal::from(7));
        assert_eq!(result.quote_for(3).unwrap(), 7);
        assert_eq!(result.quote_for(1).unwrap(), 2);
    }
}
