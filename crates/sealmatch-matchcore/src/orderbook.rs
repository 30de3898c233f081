//! The order book for a single market pair.
//!
//! Uses `BTreeMap` for price-level ordering:
//! - **Bids** (buys): `BTreeMap<Reverse<Decimal>, PriceLevel>` -- highest price first
//! - **Asks** (sells): `BTreeMap<Decimal, PriceLevel>` -- lowest price first
//!
//! An auxiliary `HashMap<OrderId, (Side, Price)>` enables O(log N) cancellation.
//! Both the auction matcher and the continuous limit book sit on top of it.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, VecDeque};

use rust_decimal::Decimal;
use sealmatch_types::*;

/// All orders resting at one price, oldest first.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    pub price: Decimal,
    pub orders: VecDeque<RestingOrder>,
}

impl PriceLevel {
    fn new(price: Decimal) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
        }
    }

    /// BASE across the level, widened so a full level cannot overflow.
    #[must_use]
    pub fn total_base(&self) -> u128 {
        self.orders.iter().map(|o| u128::from(o.base_amount())).sum()
    }

    #[must_use]
    pub fn total_quote(&self) -> u128 {
        self.orders.iter().map(|o| u128::from(o.quote_amount())).sum()
    }

    fn remove(&mut self, order_id: &OrderId) -> Option<RestingOrder> {
        let pos = self.orders.iter().position(|o| o.id == *order_id)?;
        self.orders.remove(pos)
    }
}

/// The order book for a single market pair.
#[derive(Debug, Clone)]
pub struct OrderBook {
    /// The market this book serves (e.g., BTC/LTC).
    pub market: MarketPair,
    /// Buy side: highest price first (`Reverse` key).
    bids: BTreeMap<Reverse<Decimal>, PriceLevel>,
    /// Sell side: lowest price first.
    asks: BTreeMap<Decimal, PriceLevel>,
    /// Fast lookup: `OrderId -> (side, price)` for O(log N) cancel.
    index: HashMap<OrderId, (OrderSide, Decimal)>,
}

impl OrderBook {
    /// Create a new empty order book for the given market.
    #[must_use]
    pub fn new(market: MarketPair) -> Self {
        Self {
            market,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    // =================================================================
    // Insertion / cancellation
    // =================================================================

    /// Insert a single order at the back of its price level.
    pub fn insert_order(&mut self, order: RestingOrder) -> Result<()> {
        if order.pair != self.market {
            return Err(SealmatchError::InvalidOrder {
                reason: format!("order for {} inserted into {} book", order.pair, self.market),
            });
        }
        if self.index.contains_key(&order.id) {
            return Err(SealmatchError::DuplicateOrder(order.id));
        }

        let price = order.price;
        self.index.insert(order.id, (order.side, price));

        let level = match order.side {
            OrderSide::Buy => self
                .bids
                .entry(Reverse(price))
                .or_insert_with(|| PriceLevel::new(price)),
            OrderSide::Sell => self
                .asks
                .entry(price)
                .or_insert_with(|| PriceLevel::new(price)),
        };
        level.orders.push_back(order);
        Ok(())
    }

    /// Cancel an order by ID. Returns the removed order.
    pub fn cancel_order(&mut self, order_id: &OrderId) -> Result<RestingOrder> {
        let (side, price) = self
            .index
            .remove(order_id)
            .ok_or(SealmatchError::OrderNotFound(*order_id))?;

        let removed = match side {
            OrderSide::Buy => take_from(&mut self.bids, Reverse(price), order_id),
            OrderSide::Sell => take_from(&mut self.asks, price, order_id),
        };
        removed.ok_or(SealmatchError::OrderNotFound(*order_id))
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Best (highest) bid price, or `None` if no bids.
    #[must_use]
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next().map(|r| r.0)
    }

    /// Best (lowest) ask price, or `None` if no asks.
    #[must_use]
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    /// `true` when the best bid is at or above the best ask.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        matches!((self.best_bid(), self.best_ask()), (Some(bid), Some(ask)) if bid >= ask)
    }

    /// Total number of orders currently in the book.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    /// Look up a resting order by ID.
    #[must_use]
    pub fn get(&self, order_id: &OrderId) -> Option<&RestingOrder> {
        let (side, price) = self.index.get(order_id)?;
        let level = match side {
            OrderSide::Buy => self.bids.get(&Reverse(*price))?,
            OrderSide::Sell => self.asks.get(price)?,
        };
        level.orders.iter().find(|o| o.id == *order_id)
    }

    /// Mutable lookup. Only remaining amounts may change; price and side
    /// key the order's level.
    pub fn get_mut(&mut self, order_id: &OrderId) -> Option<&mut RestingOrder> {
        let (side, price) = *self.index.get(order_id)?;
        let level = match side {
            OrderSide::Buy => self.bids.get_mut(&Reverse(price))?,
            OrderSide::Sell => self.asks.get_mut(&price)?,
        };
        level.orders.iter_mut().find(|o| o.id == *order_id)
    }

    // =================================================================
    // Iteration (for the matchers)
    // =================================================================

    /// Iterate bid levels from best (highest) to worst.
    pub fn bid_levels(&self) -> impl Iterator<Item = &PriceLevel> {
        self.bids.values()
    }

    /// Iterate ask levels from best (lowest) to worst.
    pub fn ask_levels(&self) -> impl Iterator<Item = &PriceLevel> {
        self.asks.values()
    }

    /// Every resting order, bids first.
    pub fn orders(&self) -> impl Iterator<Item = &RestingOrder> {
        self.bid_levels()
            .chain(self.ask_levels())
            .flat_map(|level| level.orders.iter())
    }

    /// Oldest order at the best price on `side`.
    #[must_use]
    pub fn best_front(&self, side: OrderSide) -> Option<&RestingOrder> {
        match side {
            OrderSide::Buy => self.bids.values().next()?.orders.front(),
            OrderSide::Sell => self.asks.values().next()?.orders.front(),
        }
    }

    pub fn best_front_mut(&mut self, side: OrderSide) -> Option<&mut RestingOrder> {
        match side {
            OrderSide::Buy => self.bids.values_mut().next()?.orders.front_mut(),
            OrderSide::Sell => self.asks.values_mut().next()?.orders.front_mut(),
        }
    }

    /// Remove the oldest order at the best price on `side`.
    pub fn pop_best(&mut self, side: OrderSide) -> Option<RestingOrder> {
        let order = match side {
            OrderSide::Buy => pop_first(&mut self.bids),
            OrderSide::Sell => pop_first(&mut self.asks),
        }?;
        self.index.remove(&order.id);
        Some(order)
    }

    /// Snapshot for the orderbook store.
    #[must_use]
    pub fn view(&self) -> OrderBookView {
        OrderBookView {
            buys: self.bid_levels().flat_map(|l| l.orders.iter().cloned()).collect(),
            sells: self.ask_levels().flat_map(|l| l.orders.iter().cloned()).collect(),
        }
    }
}

/// Remove `order_id` from the level at `key`, dropping the level once empty.
fn take_from<K: Ord>(
    side: &mut BTreeMap<K, PriceLevel>,
    key: K,
    order_id: &OrderId,
) -> Option<RestingOrder> {
    let level = side.get_mut(&key)?;
    let order = level.remove(order_id)?;
    if level.orders.is_empty() {
        side.remove(&key);
    }
    Some(order)
}

fn pop_first<K: Ord>(side: &mut BTreeMap<K, PriceLevel>) -> Option<RestingOrder> {
    let mut entry = side.first_entry()?;
    let order = entry.get_mut().orders.pop_front();
    if entry.get().orders.is_empty() {
        entry.remove();
    }
    order
}
