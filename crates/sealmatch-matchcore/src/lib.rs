//! # sealmatch-matchcore
//!
//! **Pure deterministic matching for Sealmatch.**
//!
//! MatchCore is the compute plane. It takes decoded orders and produces
//! executions. It has:
//!
//! - **Zero side effects**: no balance checks, no storage writes
//! - **Deterministic output**: same set of orders -> same executions on every node
//! - **Two disciplines**: a uniform-price batch auction for sealed orders and
//!   a continuous price/time book for limit orders
//! - **Market sharding**: each market has its own independent book

pub mod allocation;
pub mod clearing;
pub mod determinism;
pub mod fill;
pub mod limit;
pub mod matcher;
pub mod orderbook;
pub mod validation;

pub use allocation::apportion;
pub use clearing::{ClearingResult, compute_clearing_price};
pub use determinism::{compute_execution_root, verify_execution_root};
pub use limit::{LimitBook, LimitMatch};
pub use matcher::{AuctionOutcome, match_auction, match_validated};
pub use orderbook::{OrderBook, PriceLevel};
pub use validation::{Rejection, ValidatedBatch, validate_batch, validate_order};
