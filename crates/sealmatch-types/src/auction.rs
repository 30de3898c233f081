//! Sealed auction orders and the batches they are solved into.
//!
//! Flow of one order through an auction:
//!
//! ```text
//! AuctionOrder ──seal──▶ EncryptedAuctionOrder ──solve──▶ OrderPuzzleResult
//!                                                              │
//!                         AuctionBatch { results… } ◀──collect─┘
//! ```

use chrono::{DateTime, Utc};
use sealmatch_timelock::{CancellationToken, Puzzle, PuzzleEncoder};
use serde::{Deserialize, Serialize};

use crate::{AuctionId, AuctionOrder, MarketPair, Result, SealmatchError};

// ---------------------------------------------------------------------------
// EncryptedAuctionOrder
// ---------------------------------------------------------------------------

/// An [`AuctionOrder`] sealed under a timelock puzzle, plus the routing
/// metadata the exchange needs before anyone can read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedAuctionOrder {
    pub order_ciphertext: Vec<u8>,
    pub order_puzzle: Puzzle,
    pub intended_auction: AuctionId,
    pub intended_pair: MarketPair,
}

impl EncryptedAuctionOrder {
    /// Serialize `order` and seal it with a fresh puzzle of `difficulty`.
    pub fn seal(order: &AuctionOrder, encoder: &PuzzleEncoder, difficulty: u64) -> Result<Self> {
        let plaintext = serde_json::to_vec(order)?;
        let (order_ciphertext, order_puzzle) = encoder.seal(difficulty, &plaintext)?;
        Ok(Self {
            order_ciphertext,
            order_puzzle,
            intended_auction: order.auction_id,
            intended_pair: order.pair.clone(),
        })
    }

    /// Solve the puzzle and decode the order. Blocks for `O(t)`.
    pub fn decode(&self) -> Result<AuctionOrder> {
        self.decode_cancellable(&CancellationToken::new())
    }

    pub fn decode_cancellable(&self, cancel: &CancellationToken) -> Result<AuctionOrder> {
        let plaintext = sealmatch_timelock::open_cancellable(
            &self.order_ciphertext,
            &self.order_puzzle,
            cancel,
        )?;
        serde_json::from_slice(&plaintext).map_err(|e| SealmatchError::Decode {
            reason: e.to_string(),
        })
    }

    /// Self-describing wire encoding. The puzzle carries its own `kind` tag.
    pub fn to_wire(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_wire(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

// ---------------------------------------------------------------------------
// OrderPuzzleResult / AuctionBatch
// ---------------------------------------------------------------------------

/// Outcome of solving one sealed order. Failures are data, not panics.
#[derive(Debug)]
pub struct OrderPuzzleResult {
    pub encrypted: EncryptedAuctionOrder,
    pub outcome: Result<AuctionOrder>,
}

impl OrderPuzzleResult {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    #[must_use]
    pub fn order(&self) -> Option<&AuctionOrder> {
        self.outcome.as_ref().ok()
    }
}

/// Every result admitted to one auction, in solve-completion order.
#[derive(Debug)]
pub struct AuctionBatch {
    pub auction_id: AuctionId,
    pub batch: Vec<OrderPuzzleResult>,
}

impl AuctionBatch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.batch.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// Number of results that failed to solve or decode.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.batch.iter().filter(|r| !r.is_ok()).count()
    }
}

// ---------------------------------------------------------------------------
// AuctionParameters
// ---------------------------------------------------------------------------

/// What a client needs to seal an order for the current auction on a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionParameters {
    pub auction_id: AuctionId,
    pub pair: MarketPair,
    /// When the auction was opened.
    pub auction_time: DateTime<Utc>,
    /// Puzzle difficulty clients must use.
    pub difficulty: u64,
}
