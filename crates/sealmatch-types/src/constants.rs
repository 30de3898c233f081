//! System-wide constants for SealMatch.

/// Default puzzle difficulty (sequential steps per order).
pub const DEFAULT_PUZZLE_DIFFICULTY: u64 = 100_000;

/// Default RSW modulus size in bits.
pub const DEFAULT_MODULUS_BITS: usize = sealmatch_timelock::puzzle::DEFAULT_MODULUS_BITS;

/// Smallest RSW modulus accepted by configuration.
pub const MIN_MODULUS_BITS: usize = sealmatch_timelock::puzzle::MIN_MODULUS_BITS;

/// Maximum orders admitted to a single auction.
pub const MAX_ORDERS_PER_AUCTION: usize = 100_000;

/// Settlement idempotency cache size (number of auction ids to remember).
pub const SETTLEMENT_IDEMPOTENCY_CACHE_SIZE: usize = 10_000;
