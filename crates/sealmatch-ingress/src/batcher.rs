//! Auction batcher: solves sealed orders in parallel and delivers each
//! auction's results exactly once.
//!
//! ## Lifecycle of one auction id
//!
//! ```text
//! register_auction ─▶ Active ──end_auction──▶ Draining ──last solve──▶ Delivered
//!                       │  ▲                                              │
//!                       └──┘ add_encrypted                                └─▶ register again
//! ```
//!
//! Every admitted order gets its own solver task. Puzzle work runs on the
//! blocking pool, at most `max_concurrent_solves` at a time. Results flow
//! over an unbounded channel to a single collector task per auction, which
//! owns the delivery.
//!
//! ## Locking
//!
//! Two levels: the map of auctions, and one mutex per auction guarding
//! `{solved, pending, active, delivery}`. The map lock is always released
//! before a batch lock is taken. The pending decrement and the delivery check
//! happen under the same batch lock, so the batch is delivered precisely
//! once, on the transition to `!active && pending == 0`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use sealmatch_timelock::{PuzzleError, Timelock};
use sealmatch_types::{
    AuctionBatch, AuctionId, AuctionOrder, BatcherConfig, EncryptedAuctionOrder, OrderPuzzleResult,
    Result, SealmatchError,
};
use tokio::runtime::Handle;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Where an auction id is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuctionState {
    /// Accepting orders.
    Active,
    /// Ended; waiting for in-flight solves.
    Draining,
    /// Batch handed out. The id may be registered again.
    Delivered,
}

impl std::fmt::Display for AuctionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Draining => write!(f, "DRAINING"),
            Self::Delivered => write!(f, "DELIVERED"),
        }
    }
}

/// Mutable part of one auction, guarded by its own lock.
struct BatchState {
    solved: Vec<OrderPuzzleResult>,
    pending: usize,
    admitted: usize,
    active: bool,
    /// Taken on delivery. Dropping the last sender lets the collector exit.
    results: Option<mpsc::UnboundedSender<OrderPuzzleResult>>,
    delivery: Option<oneshot::Sender<AuctionBatch>>,
    /// Handed to the caller of `end_auction`.
    delivery_rx: Option<oneshot::Receiver<AuctionBatch>>,
}

struct IntermediateBatch {
    state: Mutex<BatchState>,
    /// Mirrors `BatchState` delivery so the map can be checked without
    /// taking the batch lock.
    delivered: AtomicBool,
    cancel: CancellationToken,
}

impl IntermediateBatch {
    fn current_state(&self) -> AuctionState {
        if self.delivered.load(Ordering::Acquire) {
            return AuctionState::Delivered;
        }
        if self.state.lock().active {
            AuctionState::Active
        } else {
            AuctionState::Draining
        }
    }

    /// Deliver if the auction has ended and nothing is pending. Must be
    /// called with the batch lock held; `state` is that guard.
    fn try_deliver(&self, auction_id: AuctionId, state: &mut BatchState) {
        if state.active || state.pending != 0 {
            return;
        }
        let Some(delivery) = state.delivery.take() else {
            let err = SealmatchError::ConcurrencyInvariant {
                reason: format!("second delivery attempted for {auction_id}"),
            };
            tracing::error!(auction = %auction_id, error = %err, "batch delivered twice");
            panic!("{err}");
        };
        state.results = None;
        self.delivered.store(true, Ordering::Release);

        let batch = AuctionBatch {
            auction_id,
            batch: std::mem::take(&mut state.solved),
        };
        let count = batch.len();
        if delivery.send(batch).is_err() {
            tracing::warn!(auction = %auction_id, count, "batch delivered to a dropped receiver");
        } else {
            tracing::info!(auction = %auction_id, count, "batch delivered");
        }
    }
}

/// Concurrency coordinator for sealed-order auctions.
///
/// One instance serves any number of auctions. Create it from inside a
/// tokio runtime (or hand it a [`Handle`]); all tasks are spawned there.
pub struct AuctionBatcher {
    runtime: Handle,
    config: BatcherConfig,
    solve_permits: Arc<Semaphore>,
    batches: Mutex<HashMap<AuctionId, Arc<IntermediateBatch>>>,
}

impl std::fmt::Debug for AuctionBatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuctionBatcher")
            .field("config", &self.config)
            .field("auctions", &self.batches.lock().len())
            .finish_non_exhaustive()
    }
}

impl AuctionBatcher {
    /// Create a batcher on the current tokio runtime.
    ///
    /// # Errors
    /// `NoAsyncRuntime` when called outside a runtime.
    pub fn new(config: BatcherConfig) -> Result<Self> {
        let runtime =
            Handle::try_current().map_err(|e| SealmatchError::NoAsyncRuntime(e.to_string()))?;
        Self::with_handle(config, runtime)
    }

    pub fn with_handle(config: BatcherConfig, runtime: Handle) -> Result<Self> {
        if config.max_concurrent_solves == 0 {
            return Err(SealmatchError::Configuration(
                "max_concurrent_solves must be at least 1".into(),
            ));
        }
        if config.max_orders_per_auction == 0 {
            return Err(SealmatchError::Configuration(
                "max_orders_per_auction must be at least 1".into(),
            ));
        }
        Ok(Self {
            runtime,
            solve_permits: Arc::new(Semaphore::new(config.max_concurrent_solves)),
            config,
            batches: Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn config(&self) -> &BatcherConfig {
        &self.config
    }

    // =================================================================
    // Lifecycle
    // =================================================================

    /// Open `auction_id` for orders and start its collector.
    ///
    /// # Errors
    /// `AuctionAlreadyRegistered` if the id is active or draining. A
    /// delivered id is replaced by a fresh auction.
    pub fn register_auction(&self, auction_id: AuctionId) -> Result<()> {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let (delivery_tx, delivery_rx) = oneshot::channel();
        let batch = Arc::new(IntermediateBatch {
            state: Mutex::new(BatchState {
                solved: Vec::new(),
                pending: 0,
                admitted: 0,
                active: true,
                results: Some(results_tx),
                delivery: Some(delivery_tx),
                delivery_rx: Some(delivery_rx),
            }),
            delivered: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        });

        {
            let mut batches = self.batches.lock();
            if let Some(existing) = batches.get(&auction_id) {
                if !existing.delivered.load(Ordering::Acquire) {
                    return Err(SealmatchError::AuctionAlreadyRegistered(auction_id));
                }
                tracing::debug!(auction = %auction_id, "replacing delivered auction");
            }
            batches.insert(auction_id, Arc::clone(&batch));
        }

        self.runtime.spawn(collect(auction_id, batch, results_rx));
        tracing::info!(auction = %auction_id, "auction registered");
        Ok(())
    }

    /// Admit a sealed order and start solving it. Returns immediately.
    ///
    /// # Errors
    /// - `UnregisteredAuction` if the order's auction was never registered
    /// - `InactiveAuction` if it has ended
    /// - `AuctionFull` past `max_orders_per_auction`
    pub fn add_encrypted(&self, order: EncryptedAuctionOrder) -> Result<()> {
        let auction_id = order.intended_auction;
        let batch = self.batch(&auction_id)?;

        let results = {
            let mut state = batch.state.lock();
            if !state.active {
                return Err(SealmatchError::InactiveAuction(auction_id));
            }
            if state.admitted >= self.config.max_orders_per_auction {
                return Err(SealmatchError::AuctionFull {
                    id: auction_id,
                    limit: self.config.max_orders_per_auction,
                });
            }
            let Some(results) = state.results.clone() else {
                return Err(SealmatchError::ConcurrencyInvariant {
                    reason: format!("active auction {auction_id} has no result channel"),
                });
            };
            state.pending += 1;
            state.admitted += 1;
            results
        };

        let permits = Arc::clone(&self.solve_permits);
        let cancel = batch.cancel.clone();
        self.runtime.spawn(async move {
            let outcome = solve(&order, permits, cancel).await;
            if results
                .send(OrderPuzzleResult {
                    encrypted: order,
                    outcome,
                })
                .is_err()
            {
                tracing::error!(auction = %auction_id, "collector gone before solve finished");
            }
        });
        Ok(())
    }

    /// Stop admitting orders. The batch arrives on the returned receiver
    /// once every admitted order has been solved, or right away if none
    /// are pending.
    ///
    /// # Errors
    /// `UnregisteredAuction`, or `InactiveAuction` if already ended.
    pub fn end_auction(&self, auction_id: AuctionId) -> Result<oneshot::Receiver<AuctionBatch>> {
        let batch = self.batch(&auction_id)?;
        let mut state = batch.state.lock();
        if !state.active {
            return Err(SealmatchError::InactiveAuction(auction_id));
        }
        let Some(delivery_rx) = state.delivery_rx.take() else {
            return Err(SealmatchError::ConcurrencyInvariant {
                reason: format!("active auction {auction_id} lost its delivery receiver"),
            });
        };
        state.active = false;
        tracing::info!(auction = %auction_id, pending = state.pending, "auction ended");
        batch.try_deliver(auction_id, &mut state);
        Ok(delivery_rx)
    }

    /// Cancel in-flight solves. Cancelled orders still come back as errored
    /// results, so the batch is delivered.
    pub fn cancel_solves(&self, auction_id: AuctionId) -> Result<()> {
        let batch = self.batch(&auction_id)?;
        tracing::warn!(auction = %auction_id, "cancelling solves");
        batch.cancel.cancel();
        Ok(())
    }

    // =================================================================
    // Queries
    // =================================================================

    pub fn auction_state(&self, auction_id: AuctionId) -> Result<AuctionState> {
        Ok(self.batch(&auction_id)?.current_state())
    }

    /// Admitted orders not yet solved.
    pub fn pending_count(&self, auction_id: AuctionId) -> Result<usize> {
        let batch = self.batch(&auction_id)?;
        let pending = batch.state.lock().pending;
        Ok(pending)
    }

    /// Drop a delivered auction. Returns `false` if the id is unknown or
    /// still live.
    pub fn forget_auction(&self, auction_id: AuctionId) -> bool {
        let mut batches = self.batches.lock();
        match batches.get(&auction_id) {
            Some(batch) if batch.delivered.load(Ordering::Acquire) => {
                batches.remove(&auction_id);
                true
            }
            _ => false,
        }
    }

    /// Clone the batch handle out of the map; the map lock is released on return.
    fn batch(&self, auction_id: &AuctionId) -> Result<Arc<IntermediateBatch>> {
        self.batches
            .lock()
            .get(auction_id)
            .cloned()
            .ok_or(SealmatchError::UnregisteredAuction(*auction_id))
    }
}

/// Solve one sealed order on the blocking pool. Never fails: every error
/// becomes the result's outcome.
async fn solve(
    order: &EncryptedAuctionOrder,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
) -> Result<AuctionOrder> {
    let permit = tokio::select! {
        permit = permits.acquire_owned() => {
            permit.map_err(|e| SealmatchError::Internal(e.to_string()))?
        }
        () = cancel.cancelled() => {
            return Err(PuzzleError::Cancelled {
                completed: 0,
                difficulty: order.order_puzzle.difficulty(),
            }
            .into());
        }
    };

    let sealed = order.clone();
    let started = std::time::Instant::now();
    let outcome = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        sealed.decode_cancellable(&cancel)
    })
    .await
    .map_err(|e| SealmatchError::Internal(format!("solver task failed: {e}")))?;

    tracing::debug!(
        auction = %order.intended_auction,
        difficulty = order.order_puzzle.difficulty(),
        elapsed_ms = started.elapsed().as_millis(),
        ok = outcome.is_ok(),
        "puzzle solved"
    );
    outcome
}

/// Per-auction collector: appends results and delivers once.
async fn collect(
    auction_id: AuctionId,
    batch: Arc<IntermediateBatch>,
    mut results: mpsc::UnboundedReceiver<OrderPuzzleResult>,
) {
    while let Some(result) = results.recv().await {
        let mut state = batch.state.lock();
        if state.pending == 0 {
            let err = SealmatchError::ConcurrencyInvariant {
                reason: format!("result for {auction_id} arrived with nothing pending"),
            };
            tracing::error!(auction = %auction_id, error = %err, "unexpected result");
            panic!("{err}");
        }
        state.solved.push(result);
        state.pending -= 1;
        batch.try_deliver(auction_id, &mut state);
    }
    tracing::debug!(auction = %auction_id, "collector finished");
}
