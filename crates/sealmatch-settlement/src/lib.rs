//! # sealmatch-settlement
//!
//! **Reference settlement engine**: applies the debit/credit instructions
//! produced by matching.
//!
//! ## Architecture
//!
//! [`Ledger`] implements [`SettlementEngine`](sealmatch_types::SettlementEngine) and:
//! 1. Validates idempotency (each auction settles once)
//! 2. Checks every trader can cover their summed debits
//! 3. Applies balance changes, rolling back on failure
//! 4. Checks the supply conservation invariant

pub mod idempotency;
pub mod ledger;
pub mod supply_conservation;

pub use idempotency::IdempotencyGuard;
pub use ledger::Ledger;
pub use supply_conservation::SupplyConservation;
