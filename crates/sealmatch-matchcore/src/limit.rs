//! Continuous price/time limit book.
//!
//! Orders rest at their own price and trade whenever the book crosses. The
//! best bid meets the best ask; the trade happens at the price of whichever
//! of the two arrived first. Within a price level, earlier orders go first.

use rust_decimal::Decimal;
use sealmatch_types::{
    LimitOrder, MarketPair, OrderBookView, OrderExecution, OrderId, OrderSide, Pubkey,
    RestingOrder, Result, SealmatchError, SettlementExecution,
};

use crate::OrderBook;
use crate::fill::{fill_order, quote_for};

/// Executions produced by one [`LimitBook::match_crossed`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LimitMatch {
    pub order_executions: Vec<OrderExecution>,
    pub settlement_executions: Vec<SettlementExecution>,
}

impl LimitMatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order_executions.is_empty()
    }
}

/// A market's standing limit orders.
#[derive(Debug, Clone)]
pub struct LimitBook {
    book: OrderBook,
    next_sequence: u64,
}

impl LimitBook {
    #[must_use]
    pub fn new(pair: MarketPair) -> Self {
        Self {
            book: OrderBook::new(pair),
            next_sequence: 0,
        }
    }

    #[must_use]
    pub fn pair(&self) -> &MarketPair {
        &self.book.market
    }

    /// Rest `order` in the book. Call [`match_crossed`](Self::match_crossed)
    /// afterwards to trade it.
    pub fn place(&mut self, order: &LimitOrder) -> Result<OrderId> {
        if order.amount_have == 0 || order.amount_want == 0 {
            return Err(SealmatchError::InvalidOrder {
                reason: "zero amount".into(),
            });
        }
        let resting = RestingOrder::from_limit(order, self.next_sequence)?;
        let id = resting.id;
        self.book.insert_order(resting)?;
        self.next_sequence += 1;
        tracing::debug!(
            order = %id,
            side = %order.side,
            market = %self.book.market,
            "limit order placed"
        );
        Ok(id)
    }

    /// Place `order`, trade the book, and hand the result to `settle`.
    ///
    /// The book only changes if `settle` succeeds. On any error the order is
    /// not resting and every order that would have traded is back where it
    /// was, so the book never shows a trade the ledger refused.
    pub fn place_and_match<F>(
        &mut self,
        order: &LimitOrder,
        settle: F,
    ) -> Result<(OrderId, LimitMatch)>
    where
        F: FnOnce(&LimitMatch) -> Result<()>,
    {
        let mut staged = self.clone();
        let id = staged.place(order)?;
        let matched = staged.match_crossed()?;
        settle(&matched)?;
        *self = staged;
        Ok((id, matched))
    }

    /// Sum of `asset` that `pubkey`'s resting orders have offered to pay.
    #[must_use]
    pub fn committed(&self, pubkey: Pubkey, asset: &str) -> u64 {
        self.book
            .orders()
            .filter(|o| o.pubkey == pubkey && o.have_asset() == asset)
            .fold(0u64, |acc, o| acc.saturating_add(o.amount_have))
    }

    pub fn cancel(&mut self, order_id: &OrderId) -> Result<RestingOrder> {
        self.book.cancel_order(order_id)
    }

    /// Trade the book until it no longer crosses.
    pub fn match_crossed(&mut self) -> Result<LimitMatch> {
        let mut matched = LimitMatch::default();

        while self.book.is_crossed() {
            let (Some(buy), Some(sell)) = (
                self.book.best_front(OrderSide::Buy).cloned(),
                self.book.best_front(OrderSide::Sell).cloned(),
            ) else {
                break;
            };

            let price = if buy.sequence < sell.sequence {
                buy.price
            } else {
                sell.price
            };
            let base = buy.amount_want.min(sell.amount_have);
            let quote = quote_for(base, price)?;

            let buy_exec = fill_order(&buy, base, quote);
            let sell_exec = fill_order(&sell, base, quote);
            if !buy_exec.filled && !sell_exec.filled {
                return Err(SealmatchError::MatchingFailed {
                    reason: format!("crossing {} and {} filled neither", buy.id, sell.id),
                });
            }

            tracing::debug!(
                buy = %buy.id,
                sell = %sell.id,
                %price,
                base,
                quote,
                "limit orders crossed"
            );

            self.apply(OrderSide::Buy, &buy_exec);
            self.apply(OrderSide::Sell, &sell_exec);

            matched.settlement_executions.extend(buy_exec.settlement_pair(buy.pubkey));
            matched.settlement_executions.extend(sell_exec.settlement_pair(sell.pubkey));
            matched.order_executions.push(buy_exec);
            matched.order_executions.push(sell_exec);
        }

        Ok(matched)
    }

    /// Remove a filled front order or shrink it in place. A partially
    /// filled order keeps its original price level and queue position.
    fn apply(&mut self, side: OrderSide, exec: &OrderExecution) {
        if exec.filled {
            self.book.pop_best(side);
        } else if let Some(front) = self.book.best_front_mut(side) {
            front.amount_have = exec.new_amount_have;
            front.amount_want = exec.new_amount_want;
        }
    }

    #[must_use]
    pub fn view(&self) -> OrderBookView {
        self.book.view()
    }

    #[must_use]
    pub fn get(&self, order_id: &OrderId) -> Option<&RestingOrder> {
        self.book.get(order_id)
    }

    #[must_use]
    pub fn order_count(&self) -> usize {
        self.book.order_count()
    }

    #[must_use]
    pub fn best_bid(&self) -> Option<Decimal> {
        self.book.best_bid()
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<Decimal> {
        self.book.best_ask()
    }
}
