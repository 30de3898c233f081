//! Exchange facade: the calls a transport layer makes.
//!
//! ## Auction flow
//!
//! ```text
//! get_public_parameters ─▶ client seals order ─▶ submit_puzzled_order
//!     ─▶ close_auction: end ─▶ await batch ─▶ validate ─▶ drop unfunded
//!                       ─▶ match ─▶ settle ─▶ record ─▶ next auction
//! ```
//!
//! Limit orders bypass the batcher: each placement is matched against the
//! pair's standing book and settled right away.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::{Mutex, MutexGuard};
use sealmatch_matchcore::{
    AuctionOutcome, LimitBook, LimitMatch, Rejection, match_auction, validate_batch,
};
use sealmatch_timelock::PuzzleEncoder;
use sealmatch_types::{
    Asset, AuctionId, AuctionOrder, AuctionParameters, EncryptedAuctionOrder, Entry,
    ExchangeConfig, LimitOrder, MarketPair, OrderBookView, OrderId, OrderbookStore, Pubkey,
    RestingOrder, Result, SealmatchError, SettlementEngine, SettlementExecution, have_asset,
};

use crate::AuctionBatcher;

/// What closing one auction produced.
#[derive(Debug)]
pub struct AuctionReport {
    pub outcome: AuctionOutcome,
    /// Orders left out before matching, with the reason.
    pub rejections: Vec<Rejection>,
    /// Orders that reached matching.
    pub accepted: usize,
    /// The auction that replaced this one.
    pub next: AuctionParameters,
    /// Set when matching, settlement or recording failed. Balances are
    /// untouched and `outcome` is empty, but the funded orders are still
    /// in the store.
    pub failure: Option<SealmatchError>,
}

impl AuctionReport {
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.failure.is_none()
    }
}

/// Result of placing a limit order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitPlacement {
    pub order_id: OrderId,
    pub matched: LimitMatch,
}

struct MarketState {
    current: Option<AuctionParameters>,
    next_sequence: u64,
    limit_book: LimitBook,
}

impl MarketState {
    fn new(pair: MarketPair) -> Self {
        Self {
            current: None,
            next_sequence: 0,
            limit_book: LimitBook::new(pair),
        }
    }
}

/// Front-running resistant exchange over a settlement engine `S` and an
/// order store `O`.
pub struct AuctionExchange<S, O> {
    config: ExchangeConfig,
    batcher: AuctionBatcher,
    markets: Mutex<HashMap<MarketPair, MarketState>>,
    settlement: Mutex<S>,
    store: Mutex<O>,
}

impl<S, O> std::fmt::Debug for AuctionExchange<S, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuctionExchange")
            .field("markets", &self.config.markets)
            .field("batcher", &self.batcher)
            .finish_non_exhaustive()
    }
}

impl<S: SettlementEngine, O: OrderbookStore> AuctionExchange<S, O> {
    /// Must be called inside a tokio runtime.
    pub fn new(config: ExchangeConfig, settlement: S, store: O) -> Result<Self> {
        config.validate()?;
        let batcher = AuctionBatcher::new(config.batcher.clone())?;
        let markets = config
            .markets
            .iter()
            .map(|pair| (pair.clone(), MarketState::new(pair.clone())))
            .collect();
        tracing::info!(markets = config.markets.len(), "exchange started");
        Ok(Self {
            config,
            batcher,
            markets: Mutex::new(markets),
            settlement: Mutex::new(settlement),
            store: Mutex::new(store),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Encoder matching the exchange's puzzle settings.
    #[must_use]
    pub fn puzzle_encoder(&self) -> PuzzleEncoder {
        self.config.puzzle.encoder()
    }

    #[must_use]
    pub fn batcher(&self) -> &AuctionBatcher {
        &self.batcher
    }

    /// Direct access to the settlement engine. Do not hold across an await.
    pub fn settlement(&self) -> MutexGuard<'_, S> {
        self.settlement.lock()
    }

    /// Direct access to the order store. Do not hold across an await.
    pub fn store(&self) -> MutexGuard<'_, O> {
        self.store.lock()
    }

    // =================================================================
    // Auctions
    // =================================================================

    /// Parameters of `pair`'s current auction, opening one if none is open.
    pub fn get_public_parameters(&self, pair: &MarketPair) -> Result<AuctionParameters> {
        let mut markets = self.markets.lock();
        let market = markets
            .get_mut(pair)
            .ok_or_else(|| SealmatchError::UnknownMarket(pair.clone()))?;
        self.ensure_open(pair, market)
    }

    /// Admit a sealed order into its pair's current auction.
    pub fn submit_puzzled_order(&self, order: EncryptedAuctionOrder) -> Result<()> {
        {
            let markets = self.markets.lock();
            let market = markets
                .get(&order.intended_pair)
                .ok_or_else(|| SealmatchError::UnknownMarket(order.intended_pair.clone()))?;
            let Some(current) = &market.current else {
                return Err(SealmatchError::UnregisteredAuction(order.intended_auction));
            };
            if current.auction_id != order.intended_auction {
                return Err(SealmatchError::WrongAuction {
                    pair: order.intended_pair.clone(),
                    expected: current.auction_id,
                    actual: order.intended_auction,
                });
            }
        }
        tracing::debug!(auction = %order.intended_auction, "sealed order submitted");
        self.batcher.add_encrypted(order)
    }

    /// End `pair`'s current auction, match it and settle it.
    ///
    /// The next auction opens as soon as the current one ends, so new
    /// orders are accepted while this one is being solved.
    ///
    /// Once the batch is delivered the auction always produces a report.
    /// A failure to match, settle or record lands in
    /// [`AuctionReport::failure`] rather than an `Err`. The settlement lock
    /// is held from the funding check through settlement, so no limit
    /// trade can spend the checked balances in between.
    pub async fn close_auction(&self, pair: &MarketPair) -> Result<AuctionReport> {
        let (closing, delivery, next) = {
            let mut markets = self.markets.lock();
            let market = markets
                .get_mut(pair)
                .ok_or_else(|| SealmatchError::UnknownMarket(pair.clone()))?;
            let closing = self.ensure_open(pair, market)?;
            let delivery = self.batcher.end_auction(closing.auction_id)?;
            market.current = None;
            let next = self.ensure_open(pair, market)?;
            (closing, delivery, next)
        };
        let auction_id = closing.auction_id;

        let batch = delivery
            .await
            .map_err(|_| SealmatchError::BatchAbandoned(auction_id))?;
        self.batcher.forget_auction(auction_id);

        let mut validated = validate_batch(batch, pair);
        let (funded, settled) = {
            let mut settlement = self.settlement.lock();
            let funded = drop_unfunded(&*settlement, validated.orders, &mut validated.rejections);
            let settled = match_auction(auction_id, pair, &funded).and_then(|outcome| {
                settlement
                    .settle_auction(auction_id, &outcome.settlement_executions)
                    .map(|()| outcome)
            });
            (funded, settled)
        };

        let (outcome, mut failure) = match settled {
            Ok(outcome) => (outcome, None),
            Err(e) => {
                tracing::error!(
                    auction = %auction_id,
                    market = %pair,
                    error = %e,
                    "auction not settled"
                );
                (AuctionOutcome::empty(auction_id, pair.clone()), Some(e))
            }
        };

        let recorded = {
            let mut store = self.store.lock();
            funded
                .iter()
                .try_for_each(|order| store.place_auction_order(order))
                .and_then(|()| store.record_executions(&outcome.order_executions))
        };
        if let Err(e) = recorded {
            tracing::error!(auction = %auction_id, error = %e, "auction not recorded");
            failure.get_or_insert(e);
        }

        tracing::info!(
            auction = %auction_id,
            market = %pair,
            accepted = funded.len(),
            rejected = validated.rejections.len(),
            executions = outcome.order_executions.len(),
            next = %next.auction_id,
            settled = failure.is_none(),
            "auction closed"
        );

        Ok(AuctionReport {
            outcome,
            rejections: validated.rejections,
            accepted: funded.len(),
            next,
            failure,
        })
    }

    fn ensure_open(
        &self,
        pair: &MarketPair,
        market: &mut MarketState,
    ) -> Result<AuctionParameters> {
        if let Some(current) = &market.current {
            return Ok(current.clone());
        }
        let auction_id = AuctionId::derive(pair, market.next_sequence);
        self.batcher.register_auction(auction_id)?;
        market.next_sequence += 1;
        let params = AuctionParameters {
            auction_id,
            pair: pair.clone(),
            auction_time: Utc::now(),
            difficulty: self.config.puzzle.difficulty,
        };
        market.current = Some(params.clone());
        Ok(params)
    }

    // =================================================================
    // Limit orders
    // =================================================================

    /// Rest a limit order and trade whatever now crosses.
    ///
    /// The owner must be able to cover `amount_have` on top of everything
    /// their resting limit orders already offer in the same asset, across
    /// all markets. Funds are not reserved, so an auction or withdrawal can
    /// still drain a resting order's owner. When that makes a match
    /// unsettleable the placement fails with `SettlementFailed` and the
    /// book is left exactly as it was.
    pub fn place_limit_order(&self, order: &LimitOrder) -> Result<LimitPlacement> {
        let mut markets = self.markets.lock();
        let asset = have_asset(order.side, &order.pair);
        let resting = markets
            .values()
            .map(|m| m.limit_book.committed(order.pubkey, asset))
            .fold(0u64, u64::saturating_add);
        let market = markets
            .get_mut(&order.pair)
            .ok_or_else(|| SealmatchError::UnknownMarket(order.pair.clone()))?;

        let needed = resting.saturating_add(order.amount_have);
        let debit = SettlementExecution::debit(order.pubkey, &Entry::new(asset.clone(), needed));
        let mut settlement = self.settlement.lock();
        if !settlement.check_valid(&debit)? {
            return Err(SealmatchError::SettlementFailed {
                reason: format!("{} cannot cover {needed} {asset}", order.pubkey),
            });
        }

        let (order_id, matched) = market.limit_book.place_and_match(order, |matched| {
            if matched.is_empty() {
                return Ok(());
            }
            settlement.settle_executions(&matched.settlement_executions)
        })?;
        drop(settlement);
        drop(markets);

        if !matched.is_empty() {
            tracing::info!(
                order = %order_id,
                market = %order.pair,
                executions = matched.order_executions.len(),
                "limit order matched"
            );
        }
        Ok(LimitPlacement { order_id, matched })
    }

    pub fn cancel_limit_order(
        &self,
        pair: &MarketPair,
        order_id: &OrderId,
    ) -> Result<RestingOrder> {
        let mut markets = self.markets.lock();
        let market = markets
            .get_mut(pair)
            .ok_or_else(|| SealmatchError::UnknownMarket(pair.clone()))?;
        let removed = market.limit_book.cancel(order_id)?;
        tracing::debug!(order = %order_id, market = %pair, "limit order cancelled");
        Ok(removed)
    }

    pub fn view_limit_book(&self, pair: &MarketPair) -> Result<OrderBookView> {
        let markets = self.markets.lock();
        let market = markets
            .get(pair)
            .ok_or_else(|| SealmatchError::UnknownMarket(pair.clone()))?;
        Ok(market.limit_book.view())
    }
}

/// Keep orders whose owners can cover them, cumulatively per
/// `(pubkey, asset)` in `OrderId` order. The rest become rejections.
fn drop_unfunded<S: SettlementEngine + ?Sized>(
    settlement: &S,
    orders: Vec<AuctionOrder>,
    rejections: &mut Vec<Rejection>,
) -> Vec<AuctionOrder> {
    let mut committed: HashMap<(Pubkey, Asset), u64> = HashMap::new();
    let mut funded = Vec::with_capacity(orders.len());

    for order in orders {
        let key = (order.pubkey, order.have_asset().clone());
        let already = committed.get(&key).copied().unwrap_or(0);
        let Some(total) = already.checked_add(order.amount_have) else {
            rejections.push(unfunded(&order, u64::MAX));
            continue;
        };
        let debit = SettlementExecution::debit(order.pubkey, &Entry::new(key.1.clone(), total));
        match settlement.check_valid(&debit) {
            Ok(true) => {
                committed.insert(key, total);
                funded.push(order);
            }
            Ok(false) => {
                tracing::warn!(
                    order = %order.id(),
                    pubkey = %order.pubkey,
                    needed = total,
                    "dropping unfunded order"
                );
                rejections.push(unfunded(&order, total));
            }
            Err(reason) => rejections.push(Rejection {
                order_id: Some(order.id()),
                reason,
            }),
        }
    }
    funded
}

fn unfunded(order: &AuctionOrder, needed: u64) -> Rejection {
    Rejection {
        order_id: Some(order.id()),
        reason: SealmatchError::SettlementFailed {
            reason: format!("{} cannot cover {needed} {}", order.pubkey, order.have_asset()),
        },
    }
}
