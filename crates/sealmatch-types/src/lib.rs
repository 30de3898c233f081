//! # sealmatch-types
//!
//! Shared types, errors, and configuration for **SealMatch**.
//!
//! Every crate above the timelock layer depends on this one. It defines:
//!
//! - **Identifiers**: [`AuctionId`], [`OrderId`], [`Pubkey`], [`MarketPair`]
//! - **Order model**: [`AuctionOrder`], [`LimitOrder`], [`RestingOrder`], [`OrderSide`]
//! - **Auction model**: [`EncryptedAuctionOrder`], [`OrderPuzzleResult`], [`AuctionBatch`],
//!   [`AuctionParameters`]
//! - **Executions**: [`OrderExecution`], [`SettlementExecution`], [`Entry`]
//! - **Collaborators**: [`SettlementEngine`], [`OrderbookStore`]
//! - **Configuration**: [`ExchangeConfig`], [`PuzzleConfig`], [`BatcherConfig`]
//! - **Errors**: [`SealmatchError`] with `SM_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod auction;
pub mod config;
pub mod constants;
pub mod error;
pub mod execution;
pub mod ids;
pub mod order;
pub mod store;

// Re-export all primary types at crate root for ergonomic imports:
//   use sealmatch_types::{AuctionOrder, OrderSide, SettlementExecution, ...};

pub use auction::*;
pub use config::*;
pub use error::*;
pub use execution::*;
pub use ids::*;
pub use order::*;
pub use store::*;

// Constants are accessed via `sealmatch_types::constants::FOO`
// (not re-exported to avoid name collisions).
