//! Timelock puzzles.
//!
//! A puzzle hides a secret behind `t` inherently sequential steps. Two
//! constructions are provided:
//!
//! | Kind | Creator cost | Solver cost | Secret |
//! |------|--------------|-------------|--------|
//! | [`RswPuzzle`] | `O(log t)` with the trapdoor | `t` modular squarings | `a^(2^t) mod n` |
//! | [`HashChainPuzzle`] | `t` hashes | `t` hashes | `SHA-256^t(seed)` |
//!
//! Solving is synchronous and CPU-bound. Callers on an async runtime must
//! move it onto a blocking thread.

pub mod hash_chain;
pub mod rsw;

pub use hash_chain::HashChainPuzzle;
pub use rsw::RswPuzzle;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Steps between cancellation checks inside a solve loop.
pub const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// Smallest accepted RSW modulus.
pub const MIN_MODULUS_BITS: usize = 256;

/// Default RSW modulus size.
pub const DEFAULT_MODULUS_BITS: usize = 1024;

// ============================================================================
// Capability
// ============================================================================

/// A puzzle that can be solved by sequential work.
pub trait Timelock {
    /// Number of sequential steps `t`.
    fn difficulty(&self) -> u64;

    /// Solve, checking `cancel` every [`CANCEL_CHECK_INTERVAL`] steps.
    fn solve_cancellable(&self, cancel: &CancellationToken) -> Result<PuzzleSecret>;

    /// Solve to completion.
    fn solve(&self) -> Result<PuzzleSecret> {
        self.solve_cancellable(&CancellationToken::new())
    }
}

// ============================================================================
// Secret
// ============================================================================

/// Canonical byte encoding of a solved puzzle.
///
/// Used only as key-derivation input. `Debug` never prints the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct PuzzleSecret(Vec<u8>);

impl PuzzleSecret {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for PuzzleSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PuzzleSecret(<{} bytes>)", self.0.len())
    }
}

// ============================================================================
// Tagged union
// ============================================================================

/// Which construction to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PuzzleKind {
    #[default]
    Rsw,
    HashChain,
}

impl std::fmt::Display for PuzzleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsw => write!(f, "rsw"),
            Self::HashChain => write!(f, "hash_chain"),
        }
    }
}

/// Public puzzle state of either kind, tagged on the wire by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Puzzle {
    Rsw(RswPuzzle),
    HashChain(HashChainPuzzle),
}

impl Puzzle {
    #[must_use]
    pub fn kind(&self) -> PuzzleKind {
        match self {
            Self::Rsw(_) => PuzzleKind::Rsw,
            Self::HashChain(_) => PuzzleKind::HashChain,
        }
    }
}

impl Timelock for Puzzle {
    fn difficulty(&self) -> u64 {
        match self {
            Self::Rsw(p) => p.difficulty(),
            Self::HashChain(p) => p.difficulty(),
        }
    }

    fn solve_cancellable(&self, cancel: &CancellationToken) -> Result<PuzzleSecret> {
        match self {
            Self::Rsw(p) => p.solve_cancellable(cancel),
            Self::HashChain(p) => p.solve_cancellable(cancel),
        }
    }
}

/// Create a puzzle of the given kind and difficulty.
///
/// `modulus_bits` is ignored for [`PuzzleKind::HashChain`].
pub fn setup(
    kind: PuzzleKind,
    difficulty: u64,
    modulus_bits: usize,
) -> Result<(Puzzle, PuzzleSecret)> {
    if difficulty == 0 {
        tracing::warn!(
            %kind,
            "timelock created with zero difficulty; secret is immediately recoverable"
        );
    }
    let (puzzle, secret) = match kind {
        PuzzleKind::Rsw => {
            let (p, s) = RswPuzzle::setup(difficulty, modulus_bits)?;
            (Puzzle::Rsw(p), s)
        }
        PuzzleKind::HashChain => {
            let (p, s) = HashChainPuzzle::setup(difficulty)?;
            (Puzzle::HashChain(p), s)
        }
    };
    tracing::debug!(%kind, difficulty, "timelock puzzle created");
    Ok((puzzle, secret))
}
