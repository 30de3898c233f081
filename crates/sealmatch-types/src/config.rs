//! Configuration for a SealMatch exchange.
//!
//! Plain serde structs. The caller decides where values come from; the only
//! loader provided parses JSON.

use sealmatch_timelock::{CipherSuite, PuzzleEncoder, PuzzleKind};
use serde::{Deserialize, Serialize};

use crate::{MarketPair, Result, SealmatchError, constants};

/// Top-level exchange configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub puzzle: PuzzleConfig,
    pub batcher: BatcherConfig,
    /// Pairs this exchange runs auctions and limit books for.
    pub markets: Vec<MarketPair>,
}

impl ExchangeConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| SealmatchError::Configuration(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.puzzle.kind == PuzzleKind::Rsw
            && self.puzzle.modulus_bits < constants::MIN_MODULUS_BITS
        {
            return Err(SealmatchError::Configuration(format!(
                "modulus_bits {} below minimum {}",
                self.puzzle.modulus_bits,
                constants::MIN_MODULUS_BITS
            )));
        }
        if self.batcher.max_orders_per_auction == 0 {
            return Err(SealmatchError::Configuration(
                "max_orders_per_auction must be positive".into(),
            ));
        }
        if self.batcher.max_concurrent_solves == 0 {
            return Err(SealmatchError::Configuration(
                "max_concurrent_solves must be positive".into(),
            ));
        }
        for market in &self.markets {
            if market.base.is_empty() || market.quote.is_empty() || market.base == market.quote {
                return Err(SealmatchError::Configuration(format!(
                    "invalid market {market}"
                )));
            }
        }
        Ok(())
    }
}

/// How orders are sealed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PuzzleConfig {
    pub kind: PuzzleKind,
    pub cipher: CipherSuite,
    /// Sequential steps per order puzzle.
    pub difficulty: u64,
    /// RSW modulus size. Ignored for hash chains.
    pub modulus_bits: usize,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            kind: PuzzleKind::Rsw,
            cipher: CipherSuite::Aes256Gcm,
            difficulty: constants::DEFAULT_PUZZLE_DIFFICULTY,
            modulus_bits: constants::DEFAULT_MODULUS_BITS,
        }
    }
}

impl PuzzleConfig {
    #[must_use]
    pub fn encoder(&self) -> PuzzleEncoder {
        PuzzleEncoder::new(self.kind, self.cipher, self.modulus_bits)
    }
}

/// Auction batcher limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatcherConfig {
    pub max_orders_per_auction: usize,
    /// Upper bound on puzzles solved at once.
    pub max_concurrent_solves: usize,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            max_orders_per_auction: constants::MAX_ORDERS_PER_AUCTION,
            max_concurrent_solves: num_cpus::get(),
        }
    }
}
