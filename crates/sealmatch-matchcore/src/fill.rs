//! Turning an executed (BASE, QUOTE) amount into an [`OrderExecution`].
//!
//! Shared by the auction matcher and the limit book.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sealmatch_types::{
    Entry, OrderExecution, OrderId, OrderSide, RestingOrder, Result, SealmatchError,
};

/// QUOTE owed for `base` units at `price`, rounded down.
pub fn quote_for(base: u64, price: Decimal) -> Result<u64> {
    Decimal::from(base)
        .checked_mul(price)
        .and_then(|q| q.floor().to_u64())
        .ok_or_else(|| SealmatchError::MatchingFailed {
            reason: format!("{base} x {price} overflows"),
        })
}

/// `lhs - rhs`, clamped at zero. Clamping is logged: it means an order was
/// charged more than it had left, which only rounding should ever cause.
pub fn clamp_sub(lhs: u64, rhs: u64, order_id: &OrderId, field: &'static str) -> u64 {
    lhs.checked_sub(rhs).unwrap_or_else(|| {
        tracing::warn!(order = %order_id, field, lhs, rhs, "remainder underflow clamped to zero");
        0
    })
}

/// Execution for `order` receiving or giving `base` against `quote`.
///
/// An order whose `have` or `want` reaches zero is filled; any dust on the
/// other side is dropped and both remainders are reported as zero.
#[must_use]
pub fn fill_order(order: &RestingOrder, base: u64, quote: u64) -> OrderExecution {
    let (debit, credit) = match order.side {
        OrderSide::Buy => (quote, base),
        OrderSide::Sell => (base, quote),
    };

    let new_have = clamp_sub(order.amount_have, debit, &order.id, "amount_have");
    // Receiving more than asked is price improvement, not an accounting error.
    let new_want = order.amount_want.saturating_sub(credit);

    let filled = new_have == 0 || new_want == 0;
    if filled && (new_have != 0 || new_want != 0) {
        tracing::debug!(order = %order.id, new_have, new_want, "dust remainder dropped on fill");
    }

    OrderExecution {
        order_id: order.id,
        debited: Entry::new(order.have_asset().clone(), debit),
        credited: Entry::new(order.want_asset().clone(), credit),
        new_amount_want: if filled { 0 } else { new_want },
        new_amount_have: if filled { 0 } else { new_have },
        filled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_rounds_down() {
        assert_eq!(quote_for(10, Decimal::new(17, 2)).unwrap(), 1);
        assert_eq!(quote_for(100, Decimal::new(17, 2)).unwrap(), 17);
        assert_eq!(quote_for(0, Decimal::TEN).unwrap(), 0);
    }

    #[test]
    fn clamp_sub_never_wraps() {
        let id = OrderId([0u8; 32]);
        assert_eq!(clamp_sub(5, 3, &id, "amount_have"), 2);
        assert_eq!(clamp_sub(3, 5, &id, "amount_have"), 0);
        assert_eq!(clamp_sub(0, u64::MAX, &id, "amount_have"), 0);
    }

    #[test]
    fn full_buy_fill() {
        let order = RestingOrder::dummy(OrderSide::Buy, 100, 100, 0);
        let exec = fill_order(&order, 100, 100);
        assert!(exec.filled);
        assert_eq!(exec.debited, Entry::new("LTC", 100));
        assert_eq!(exec.credited, Entry::new("BTC", 100));
        assert_eq!((exec.new_amount_have, exec.new_amount_want), (0, 0));
    }

    #[test]
    fn partial_sell_fill_keeps_remainder() {
        let order = RestingOrder::dummy(OrderSide::Sell, 100, 50, 0);
        let exec = fill_order(&order, 40, 20);
        assert!(!exec.filled);
        assert_eq!(exec.debited, Entry::new("BTC", 40));
        assert_eq!(exec.credited, Entry::new("LTC", 20));
        assert_eq!(exec.new_amount_have, 60);
        assert_eq!(exec.new_amount_want, 30);
    }

    #[test]
    fn overcharge_clamps_instead_of_wrapping() {
        let order = RestingOrder::dummy(OrderSide::Buy, 10, 100, 0);
        let exec = fill_order(&order, 50, 11);
        assert!(exec.filled);
        assert_eq!(exec.new_amount_have, 0);
        assert_eq!(exec.new_amount_want, 0);
    }

    #[test]
    fn buy_filled_below_limit_leaves_no_remainder() {
        // Wanted 100 BASE for up to 200 QUOTE, got them for 150.
        let order = RestingOrder::dummy(OrderSide::Buy, 200, 100, 0);
        let exec = fill_order(&order, 100, 150);
        assert!(exec.filled);
        assert_eq!(exec.debited.amount, 150);
        assert_eq!((exec.new_amount_have, exec.new_amount_want), (0, 0));
    }
}
