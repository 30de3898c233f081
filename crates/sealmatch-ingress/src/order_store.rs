//! In-memory [`OrderbookStore`]: a record of every admitted auction order
//! and how much of it is left.

use std::collections::HashMap;

use sealmatch_matchcore::OrderBook;
use sealmatch_types::{
    AuctionOrder, MarketPair, OrderBookView, OrderExecution, OrderId, OrderbookStore, RestingOrder,
    Result, SealmatchError,
};

/// Orders per pair, held in price-bucketed books.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    books: HashMap<MarketPair, OrderBook>,
    locations: HashMap<OrderId, MarketPair>,
    next_sequence: u64,
}

impl MemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &OrderId) -> Option<&RestingOrder> {
        let pair = self.locations.get(id)?;
        self.books.get(pair)?.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

impl OrderbookStore for MemoryOrderStore {
    fn place_auction_order(&mut self, order: &AuctionOrder) -> Result<()> {
        let resting = RestingOrder::from_auction(order, self.next_sequence)?;
        let id = resting.id;
        self.books
            .entry(order.pair.clone())
            .or_insert_with(|| OrderBook::new(order.pair.clone()))
            .insert_order(resting)?;
        self.locations.insert(id, order.pair.clone());
        self.next_sequence += 1;
        Ok(())
    }

    fn cancel_order(&mut self, id: &OrderId) -> Result<()> {
        let pair = self
            .locations
            .remove(id)
            .ok_or(SealmatchError::OrderNotFound(*id))?;
        let book = self
            .books
            .get_mut(&pair)
            .ok_or(SealmatchError::OrderNotFound(*id))?;
        book.cancel_order(id)?;
        Ok(())
    }

    fn view_order_book(&self, pair: &MarketPair) -> Result<OrderBookView> {
        Ok(self.books.get(pair).map(OrderBook::view).unwrap_or_default())
    }

    fn record_executions(&mut self, execs: &[OrderExecution]) -> Result<()> {
        for exec in execs {
            if !self.locations.contains_key(&exec.order_id) {
                tracing::debug!(order = %exec.order_id, "execution for unrecorded order");
                continue;
            }
            if exec.filled {
                self.cancel_order(&exec.order_id)?;
                continue;
            }
            let pair = &self.locations[&exec.order_id];
            if let Some(order) = self
                .books
                .get_mut(pair)
                .and_then(|book| book.get_mut(&exec.order_id))
            {
                order.amount_have = exec.new_amount_have;
                order.amount_want = exec.new_amount_want;
            }
        }
        Ok(())
    }
}
