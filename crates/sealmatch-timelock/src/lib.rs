//! # sealmatch-timelock
//!
//! Timelock puzzles and the puzzle encoder used to seal orders.
//!
//! An order sealed here can be read by anyone, but only after `t` sequential
//! steps of work. Nobody, including the exchange, can peek at its contents
//! before the auction closes without paying that cost.
//!
//! ## Modules
//!
//! - [`puzzle`]: RSW repeated squaring and iterated SHA-256 timelocks
//! - [`encoder`]: seal/open payloads under a fresh puzzle
//! - [`error`]: [`PuzzleError`]

pub mod encoder;
pub mod error;
pub mod puzzle;

pub use encoder::{CipherSuite, PuzzleEncoder, open, open_cancellable};
pub use error::{PuzzleError, Result};
pub use puzzle::{
    HashChainPuzzle, Puzzle, PuzzleKind, PuzzleSecret, RswPuzzle, Timelock, setup,
};

/// Re-exported so callers can cancel solves without naming `tokio_util`.
pub use tokio_util::sync::CancellationToken;
