//! # sealmatch-ingress
//!
//! **Order ingress for Sealmatch**: everything between a client's sealed
//! order and the matcher.
//!
//! ## Architecture
//!
//! 1. **AuctionBatcher**: admits sealed orders, solves their puzzles in
//!    parallel and delivers each auction's batch exactly once
//! 2. **AuctionExchange**: the transport-facing facade; opens and closes
//!    auctions, runs validation, matching and settlement, and serves the
//!    continuous limit books
//! 3. **MemoryOrderStore**: in-memory record of auction orders
//!
//! ## Order Flow
//!
//! ```text
//! submit_puzzled_order → AuctionBatcher.add_encrypted → solver task
//!     → collector → AuctionBatch → validate → match → settle
//! ```
//!
//! Nobody reads an order before the auction it belongs to has ended: the
//! only way in is solving its puzzle.

pub mod batcher;
pub mod exchange;
pub mod order_store;

pub use batcher::{AuctionBatcher, AuctionState};
pub use exchange::{AuctionExchange, AuctionReport, LimitPlacement};
pub use order_store::MemoryOrderStore;
