//! Error types for SealMatch.
//!
//! All errors use the `SM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order / validation errors
//! - 2xx: Balance errors
//! - 3xx: Puzzle / decode errors
//! - 4xx: Auction batch state errors
//! - 5xx: Matching errors
//! - 6xx: Settlement errors
//! - 8xx: Concurrency invariant violations
//! - 9xx: General / internal errors

use sealmatch_timelock::PuzzleError;
use thiserror::Error;

use crate::{AuctionId, MarketPair, OrderId};

/// Central error enum for all SealMatch operations.
#[derive(Debug, Error)]
pub enum SealmatchError {
    // =================================================================
    // Order Errors (1xx)
    // =================================================================
    /// The order failed validation (zero amounts, wrong routing, etc.).
    #[error("SM_ERR_100: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    /// Price denominator is zero.
    #[error("SM_ERR_101: Indeterminate price: {side} order has zero {denominator}")]
    IndeterminatePrice {
        side: crate::OrderSide,
        denominator: &'static str,
    },

    /// The ed25519 signature on the order didn't verify.
    #[error("SM_ERR_102: Order signature verification failed")]
    SignatureInvalid,

    /// The requested order was not found in the book.
    #[error("SM_ERR_103: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// An order with this ID already exists.
    #[error("SM_ERR_104: Order already exists: {0}")]
    DuplicateOrder(OrderId),

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// Not enough balance to cover a debit.
    #[error("SM_ERR_200: Insufficient balance of {asset}: need {needed}, have {available}")]
    InsufficientBalance {
        asset: String,
        needed: u64,
        available: u64,
    },

    /// A credit would overflow `u64`.
    #[error("SM_ERR_201: Balance overflow on {asset}")]
    BalanceOverflow { asset: String },

    // =================================================================
    // Puzzle / Decode Errors (3xx)
    // =================================================================
    /// Puzzle setup, solve, or decryption failed.
    #[error("SM_ERR_300: Puzzle error: {0}")]
    Puzzle(#[from] PuzzleError),

    /// Decrypted payload is not a well-formed order.
    #[error("SM_ERR_301: Decode error: {reason}")]
    Decode { reason: String },

    // =================================================================
    // Auction Batch State Errors (4xx)
    // =================================================================
    /// No batch has been registered for this auction.
    #[error("SM_ERR_400: Unregistered auction: {0}")]
    UnregisteredAuction(AuctionId),

    /// The auction has ended and no longer accepts orders.
    #[error("SM_ERR_401: Cannot modify inactive auction: {0}")]
    InactiveAuction(AuctionId),

    /// The auction is still active or draining.
    #[error("SM_ERR_402: Auction already registered: {0}")]
    AuctionAlreadyRegistered(AuctionId),

    /// Admission limit reached for this auction.
    #[error("SM_ERR_403: Auction {id} full: {limit} orders")]
    AuctionFull { id: AuctionId, limit: usize },

    /// Order routed to an auction on a different pair.
    #[error("SM_ERR_404: Wrong auction for {pair}: expected {expected}, got {actual}")]
    WrongAuction {
        pair: MarketPair,
        expected: AuctionId,
        actual: AuctionId,
    },

    /// The pair is not configured on this exchange.
    #[error("SM_ERR_405: Unknown market: {0}")]
    UnknownMarket(MarketPair),

    /// The batcher was used outside a tokio runtime.
    #[error("SM_ERR_406: No async runtime available: {0}")]
    NoAsyncRuntime(String),

    /// The collector task went away before delivering.
    #[error("SM_ERR_407: Auction {0} batch was abandoned before delivery")]
    BatchAbandoned(AuctionId),

    // =================================================================
    // Matching Errors (5xx)
    // =================================================================
    /// The matching algorithm encountered an error.
    #[error("SM_ERR_500: Matching failed: {reason}")]
    MatchingFailed { reason: String },

    /// No volume in the crossing region to divide by.
    #[error("SM_ERR_501: Clearing price undefined: {reason}")]
    ClearingPriceUndefined { reason: String },

    // =================================================================
    // Settlement Errors (6xx)
    // =================================================================
    /// Settlement of an execution failed.
    #[error("SM_ERR_600: Settlement failed: {reason}")]
    SettlementFailed { reason: String },

    /// This auction's executions were already applied (idempotency guard).
    #[error("SM_ERR_601: Auction already settled: {0}")]
    AuctionAlreadySettled(AuctionId),

    /// Supply conservation invariant violated. Critical.
    #[error("SM_ERR_602: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // Concurrency (8xx)
    // =================================================================
    /// A synchronization invariant was broken. Never caused by bad input.
    #[error("SM_ERR_800: Concurrency invariant violated: {reason}")]
    ConcurrencyInvariant { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("SM_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("SM_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid values, missing fields, etc.).
    #[error("SM_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, SealmatchError>;

impl From<serde_json::Error> for SealmatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
