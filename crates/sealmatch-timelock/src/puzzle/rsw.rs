//! Rivest–Shamir–Wagner (1996) repeated-squaring timelock.
//!
//! The creator knows `φ(n)` and reduces the exponent `2^t` modulo it, so
//! building a puzzle costs two modular exponentiations. A solver without the
//! factors of `n` has no such shortcut and must perform `t` sequential
//! squarings of the base modulo `n`.
//!
//! ```text
//! creator:  e = 2^t mod φ(n),  b = a^e mod n          O(log t)
//! solver:   b = a^(2^t) mod n  by t squarings          O(t)
//! ```
//!
//! The factors are dropped as soon as setup returns. No proof of work is
//! attached; this is the plain RSW96 puzzle, not a VDF.

use num_bigint::{BigUint, RandBigInt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{CANCEL_CHECK_INTERVAL, MIN_MODULUS_BITS, PuzzleSecret, Timelock};
use crate::error::{PuzzleError, Result};

/// Public state of an RSW puzzle. Safe to broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RswPuzzle {
    /// RSA modulus `n = p·q`.
    pub modulus: BigUint,
    /// Base `a`, coprime to `n`.
    pub base: BigUint,
    /// Number of sequential squarings `t`.
    pub difficulty: u64,
}

impl RswPuzzle {
    /// Build a puzzle of difficulty `t` over a fresh modulus of
    /// `modulus_bits` bits. Returns the creator-side secret as well.
    pub fn setup(difficulty: u64, modulus_bits: usize) -> Result<(Self, PuzzleSecret)> {
        if modulus_bits < MIN_MODULUS_BITS {
            return Err(PuzzleError::Setup {
                reason: format!("modulus of {modulus_bits} bits is below {MIN_MODULUS_BITS}"),
            });
        }

        let half = modulus_bits / 2;
        let p = generate_prime(half)?;
        let mut q = generate_prime(half)?;
        while q == p {
            q = generate_prime(half)?;
        }

        let one = BigUint::from(1u32);
        let two = BigUint::from(2u32);
        let modulus = &p * &q;
        let phi = (&p - &one) * (&q - &one);

        let mut rng = rand::thread_rng();
        let base = loop {
            let candidate = rng.gen_biguint_range(&two, &modulus);
            // Euler's shortcut needs gcd(a, n) = 1.
            if (&candidate % &p).bits() != 0 && (&candidate % &q).bits() != 0 {
                break candidate;
            }
        };

        let exponent = two.modpow(&BigUint::from(difficulty), &phi);
        let answer = base.modpow(&exponent, &modulus);

        let puzzle = Self {
            modulus,
            base,
            difficulty,
        };
        let secret = puzzle.encode_answer(&answer);
        Ok((puzzle, secret))
    }

    fn check_well_formed(&self) -> Result<()> {
        let two = BigUint::from(2u32);
        if self.modulus < two {
            return Err(PuzzleError::MalformedPuzzle {
                reason: "modulus must be at least 2".to_string(),
            });
        }
        if self.base < two || self.base >= self.modulus {
            return Err(PuzzleError::MalformedPuzzle {
                reason: "base must lie in [2, n)".to_string(),
            });
        }
        Ok(())
    }

    /// Fixed-width big-endian encoding, so creator and solver agree byte for byte.
    fn encode_answer(&self, answer: &BigUint) -> PuzzleSecret {
        let width = self.modulus.to_bytes_be().len();
        let raw = answer.to_bytes_be();
        let mut bytes = vec![0u8; width.saturating_sub(raw.len())];
        bytes.extend_from_slice(&raw);
        PuzzleSecret::new(bytes)
    }
}

impl Timelock for RswPuzzle {
    fn difficulty(&self) -> u64 {
        self.difficulty
    }

    fn solve_cancellable(&self, cancel: &CancellationToken) -> Result<PuzzleSecret> {
        self.check_well_formed()?;

        let mut value = self.base.clone();
        for step in 0..self.difficulty {
            if step % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return Err(PuzzleError::Cancelled {
                    completed: step,
                    difficulty: self.difficulty,
                });
            }
            value = &value * &value % &self.modulus;
        }
        Ok(self.encode_answer(&value))
    }
}

fn generate_prime(bits: usize) -> Result<BigUint> {
    glass_pumpkin::prime::new(bits).map_err(|e| PuzzleError::Setup {
        reason: format!("prime generation failed: {e}"),
    })
}
