//! Errors raised while building, solving, or opening timelock puzzles.
//!
//! Every variant is recoverable: a bad puzzle or ciphertext fails the single
//! order it belongs to and nothing else.

use thiserror::Error;

/// Failure modes of the timelock layer.
#[derive(Debug, Error)]
pub enum PuzzleError {
    /// Prime or key generation failed while creating a puzzle.
    #[error("puzzle setup failed: {reason}")]
    Setup { reason: String },

    /// The puzzle state cannot be solved (zero modulus, base out of range).
    #[error("malformed puzzle: {reason}")]
    MalformedPuzzle { reason: String },

    /// Solving was cancelled before all sequential steps completed.
    #[error("puzzle solve cancelled after {completed} of {difficulty} steps")]
    Cancelled { completed: u64, difficulty: u64 },

    /// The ciphertext is shorter than the cipher suite's fixed overhead.
    #[error("ciphertext too short: {len} bytes, need at least {min}")]
    CiphertextTooShort { len: usize, min: usize },

    /// The leading cipher suite tag is not one this build understands.
    #[error("unknown cipher suite tag 0x{0:02x}")]
    UnknownCipherSuite(u8),

    /// Key material could not be rebuilt from the puzzle secret.
    #[error("key derivation failed: {reason}")]
    KeyDerivation { reason: String },

    /// Encryption failed while sealing.
    #[error("encryption failed")]
    Encryption,

    /// Authenticated decryption failed (wrong key or corrupted ciphertext).
    #[error("decryption failed: wrong key or corrupted ciphertext")]
    Decryption,
}

/// Crate-local `Result` alias.
pub type Result<T> = std::result::Result<T, PuzzleError>;
