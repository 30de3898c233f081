//! Identifiers used throughout SealMatch.
//!
//! Everything is content-addressed: auction ids hash the pair and an
//! opening sequence, order ids hash the signed order. No id depends on wall
//! clock or randomness, so every node derives the same value.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// AuctionId
// ---------------------------------------------------------------------------

/// 32-byte identifier of one auction round on one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AuctionId(pub [u8; 32]);

impl AuctionId {
    /// Deterministic id for the `sequence`-th auction opened on `pair`.
    #[must_use]
    pub fn derive(pair: &MarketPair, sequence: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"sealmatch:auction_id:v1:");
        hasher.update(pair.base.as_bytes());
        hasher.update(b"/");
        hasher.update(pair.quote.as_bytes());
        hasher.update(sequence.to_le_bytes());
        Self(hasher.finalize().into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First four bytes in hex, for log lines.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for AuctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "auction:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// OrderId
// ---------------------------------------------------------------------------

/// Content hash of a signed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OrderId(pub [u8; 32]);

impl OrderId {
    /// Hash `payload` under a domain tag. Callers pass canonical order bytes.
    #[must_use]
    pub fn from_payload(domain: &[u8], payload: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        hasher.update(payload);
        Self(hasher.finalize().into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// Pubkey
// ---------------------------------------------------------------------------

/// A trader's identity: the raw ed25519 verifying key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Pubkey(pub [u8; 32]);

impl Pubkey {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl From<&ed25519_dalek::VerifyingKey> for Pubkey {
    fn from(key: &ed25519_dalek::VerifyingKey) -> Self {
        Self(key.to_bytes())
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pk:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// MarketPair
// ---------------------------------------------------------------------------

/// Type alias for asset identifiers (e.g., "BTC", "LTC").
pub type Asset = String;

/// A trading pair. Prices are quoted in `quote` per unit of `base`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MarketPair {
    pub base: Asset,
    pub quote: Asset,
}

impl MarketPair {
    #[must_use]
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    #[must_use]
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }
}

impl fmt::Display for MarketPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auction_id_deterministic() {
        let pair = MarketPair::new("BTC", "LTC");
        assert_eq!(AuctionId::derive(&pair, 7), AuctionId::derive(&pair, 7));
        assert_ne!(AuctionId::derive(&pair, 7), AuctionId::derive(&pair, 8));
    }

    #[test]
    fn auction_id_differs_by_pair() {
        let a = AuctionId::derive(&MarketPair::new("BTC", "LTC"), 0);
        let b = AuctionId::derive(&MarketPair::new("LTC", "BTC"), 0);
        assert_ne!(a, b);
    }

    #[test]
    fn order_id_domain_separated() {
        let a = OrderId::from_payload(b"a:", b"payload");
        let b = OrderId::from_payload(b"b:", b"payload");
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_short_hex() {
        let id = AuctionId([0xab; 32]);
        assert_eq!(id.to_string(), "auction:abababababababab");
        assert_eq!(id.short(), "abababab");
    }

    #[test]
    fn market_pair_symbol() {
        let pair = MarketPair::new("BTC", "LTC");
        assert_eq!(pair.symbol(), "BTC/LTC");
        assert_eq!(pair.to_string(), "BTC/LTC");
    }

    #[test]
    fn serde_roundtrips() {
        let id = AuctionId::derive(&MarketPair::new("BTC", "LTC"), 1);
        let json = serde_json::to_string(&id).unwrap();
        let back: AuctionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);

        let pk = Pubkey([3u8; 32]);
        let json = serde_json::to_string(&pk).unwrap();
        let back: Pubkey = serde_json::from_str(&json).unwrap();
        assert_eq!(pk, back);
    }
}
