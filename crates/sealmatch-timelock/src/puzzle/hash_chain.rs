//! Iterated SHA-256 timelock.
//!
//! `secret = H^t(seed)`. There is no trapdoor: the creator pays the same
//! `t` sequential hashes as the solver. Cheap to reason about and handy for
//! fast tests; with small `t` it offers no front-running protection at all.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use super::{CANCEL_CHECK_INTERVAL, PuzzleSecret, Timelock};
use crate::error::{PuzzleError, Result};

/// Public state of a hash-chain puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashChainPuzzle {
    /// Starting point of the chain.
    pub seed: [u8; 32],
    /// Number of hash iterations `t`.
    pub difficulty: u64,
}

impl HashChainPuzzle {
    /// Build a puzzle from a random seed. The creator walks the full chain.
    pub fn setup(difficulty: u64) -> Result<(Self, PuzzleSecret)> {
        let puzzle = Self {
            seed: rand::random(),
            difficulty,
        };
        let secret = puzzle.solve()?;
        Ok((puzzle, secret))
    }
}

impl Timelock for HashChainPuzzle {
    fn difficulty(&self) -> u64 {
        self.difficulty
    }

    fn solve_cancellable(&self, cancel: &CancellationToken) -> Result<PuzzleSecret> {
        let mut state = self.seed;
        for step in 0..self.difficulty {
            if step % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return Err(PuzzleError::Cancelled {
                    completed: step,
                    difficulty: self.difficulty,
                });
            }
            state = Sha256::digest(state).into();
        }
        Ok(PuzzleSecret::new(state.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_difficulty_returns_seed() {
        let (puzzle, secret) = HashChainPuzzle::setup(0).unwrap();
        assert_eq!(secret.as_bytes(), &puzzle.seed);
    }

    #[test]
    fn one_step_is_single_digest() {
        let puzzle = HashChainPuzzle {
            seed: [7u8; 32],
            difficulty: 1,
        };
        let expected: [u8; 32] = Sha256::digest([7u8; 32]).into();
        assert_eq!(puzzle.solve().unwrap().as_bytes(), &expected);
    }

    #[test]
    fn setup_secret_matches_solve() {
        for t in [0u64, 1, 10, 1000] {
            let (puzzle, secret) = HashChainPuzzle::setup(t).unwrap();
            assert_eq!(puzzle.solve().unwrap(), secret, "mismatch at t={t}");
        }
    }

    #[test]
    fn different_seeds_different_secrets() {
        let (_, a) = HashChainPuzzle::setup(10).unwrap();
        let (_, b) = HashChainPuzzle::setup(10).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn cancellation_is_observed() {
        let puzzle = HashChainPuzzle {
            seed: [1u8; 32],
            difficulty: 10_000,
        };
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            puzzle.solve_cancellable(&token),
            Err(PuzzleError::Cancelled { .. })
        ));
    }
}
