//! Order types.
//!
//! Every order states what it *has* and what it *wants*. On a `BASE/QUOTE`
//! pair a buy has QUOTE and wants BASE, a sell has BASE and wants QUOTE.
//! Prices are always QUOTE per BASE:
//!
//! ```text
//! buy  price = amount_have / amount_want
//! sell price = amount_want / amount_have
//! ```
//!
//! so a buy crosses a sell exactly when `buy.price >= sell.price`.
//!
//! Orders are immutable once signed. Matching tracks remaining amounts on
//! [`RestingOrder`] and reports them through executions.

use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Asset, AuctionId, MarketPair, OrderId, Pubkey, Result, SealmatchError};

/// Which side of the book this order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

impl OrderSide {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    fn tag(self) -> u8 {
        match self {
            Self::Buy => 0,
            Self::Sell => 1,
        }
    }
}

/// QUOTE-per-BASE price of an order with the given side and amounts.
///
/// Both sides share one orientation so bids and asks compare directly:
///
/// | side | pays  | receives | price                        |
/// |------|-------|----------|------------------------------|
/// | Buy  | QUOTE | BASE     | `amount_have / amount_want`  |
/// | Sell | BASE  | QUOTE    | `amount_want / amount_have`  |
///
/// A higher price is a more generous buyer or a greedier seller. A buy of
/// 17 LTC for 100 BTC on BTC/LTC is priced at 0.17, as is a sell of
/// 100 BTC for 17 LTC.
pub fn order_price(side: OrderSide, amount_have: u64, amount_want: u64) -> Result<Decimal> {
    let (quote, base, denominator) = match side {
        OrderSide::Buy => (amount_have, amount_want, "amount_want"),
        OrderSide::Sell => (amount_want, amount_have, "amount_have"),
    };
    if base == 0 {
        return Err(SealmatchError::IndeterminatePrice { side, denominator });
    }
    Decimal::from(quote)
        .checked_div(Decimal::from(base))
        .ok_or_else(|| SealmatchError::InvalidOrder {
            reason: format!("price {quote}/{base} out of range"),
        })
}

/// Asset an order pays with.
#[must_use]
pub fn have_asset(side: OrderSide, pair: &MarketPair) -> &Asset {
    match side {
        OrderSide::Buy => &pair.quote,
        OrderSide::Sell => &pair.base,
    }
}

/// Asset an order receives.
#[must_use]
pub fn want_asset(side: OrderSide, pair: &MarketPair) -> &Asset {
    match side {
        OrderSide::Buy => &pair.base,
        OrderSide::Sell => &pair.quote,
    }
}

// ---------------------------------------------------------------------------
// AuctionOrder
// ---------------------------------------------------------------------------

/// A signed order for one sealed-bid auction. This is the plaintext that
/// gets sealed under a timelock puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionOrder {
    pub pubkey: Pubkey,
    pub side: OrderSide,
    pub pair: MarketPair,
    pub amount_have: u64,
    pub amount_want: u64,
    pub auction_id: AuctionId,
    pub nonce: [u8; 2],
    pub signature: Vec<u8>,
}

impl AuctionOrder {
    /// QUOTE-per-BASE price.
    pub fn price(&self) -> Result<Decimal> {
        order_price(self.side, self.amount_have, self.amount_want)
    }

    /// Canonical signing payload.
    ///
    /// Format: `"sealmatch:auction_order:v1:" || pubkey || side || base || quote ||
    /// have || want || auction_id || nonce`
    #[must_use]
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(160);
        payload.extend_from_slice(b"sealmatch:auction_order:v1:");
        payload.extend_from_slice(self.pubkey.as_bytes());
        payload.push(self.side.tag());
        push_asset(&mut payload, &self.pair.base);
        push_asset(&mut payload, &self.pair.quote);
        payload.extend_from_slice(&self.amount_have.to_le_bytes());
        payload.extend_from_slice(&self.amount_want.to_le_bytes());
        payload.extend_from_slice(self.auction_id.as_bytes());
        payload.extend_from_slice(&self.nonce);
        payload
    }

    /// Set `pubkey` from `key` and sign.
    pub fn sign(&mut self, key: &SigningKey) {
        self.pubkey = Pubkey::from(&key.verifying_key());
        self.signature = key.sign(&self.signing_bytes()).to_bytes().to_vec();
    }

    pub fn verify_signature(&self) -> Result<()> {
        let key = VerifyingKey::from_bytes(self.pubkey.as_bytes())
            .map_err(|_| SealmatchError::SignatureInvalid)?;
        let signature =
            Signature::from_slice(&self.signature).map_err(|_| SealmatchError::SignatureInvalid)?;
        key.verify(&self.signing_bytes(), &signature)
            .map_err(|_| SealmatchError::SignatureInvalid)
    }

    /// Content id over the signed payload and signature.
    #[must_use]
    pub fn id(&self) -> OrderId {
        let mut payload = self.signing_bytes();
        payload.extend_from_slice(&self.signature);
        OrderId::from_payload(b"sealmatch:order_id:v1:", &payload)
    }

    #[must_use]
    pub fn have_asset(&self) -> &Asset {
        have_asset(self.side, &self.pair)
    }

    #[must_use]
    pub fn want_asset(&self) -> &Asset {
        want_asset(self.side, &self.pair)
    }
}

fn push_asset(payload: &mut Vec<u8>, asset: &str) {
    let len = u16::try_from(asset.len()).unwrap_or(u16::MAX);
    payload.extend_from_slice(&len.to_le_bytes());
    payload.extend_from_slice(asset.as_bytes());
}

// ---------------------------------------------------------------------------
// LimitOrder
// ---------------------------------------------------------------------------

/// An order for the continuous price/time book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrder {
    pub pubkey: Pubkey,
    pub side: OrderSide,
    pub pair: MarketPair,
    pub amount_have: u64,
    pub amount_want: u64,
    pub placed_at: DateTime<Utc>,
}

impl LimitOrder {
    pub fn price(&self) -> Result<Decimal> {
        order_price(self.side, self.amount_have, self.amount_want)
    }

    #[must_use]
    pub fn id(&self) -> OrderId {
        let mut payload = Vec::with_capacity(128);
        payload.extend_from_slice(self.pubkey.as_bytes());
        payload.push(self.side.tag());
        push_asset(&mut payload, &self.pair.base);
        push_asset(&mut payload, &self.pair.quote);
        payload.extend_from_slice(&self.amount_have.to_le_bytes());
        payload.extend_from_slice(&self.amount_want.to_le_bytes());
        let nanos = self.placed_at.timestamp_nanos_opt().unwrap_or_default();
        payload.extend_from_slice(&nanos.to_le_bytes());
        OrderId::from_payload(b"sealmatch:limit_order_id:v1:", &payload)
    }
}

// ---------------------------------------------------------------------------
// RestingOrder
// ---------------------------------------------------------------------------

/// Book-level view of an order: terms, derived price and arrival sequence.
///
/// Remaining amounts shrink as the order is partially filled; the signed
/// order itself is never touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestingOrder {
    pub id: OrderId,
    pub pubkey: Pubkey,
    pub side: OrderSide,
    pub pair: MarketPair,
    pub amount_have: u64,
    pub amount_want: u64,
    pub price: Decimal,
    pub sequence: u64,
}

impl RestingOrder {
    pub fn from_auction(order: &AuctionOrder, sequence: u64) -> Result<Self> {
        Ok(Self {
            id: order.id(),
            pubkey: order.pubkey,
            side: order.side,
            pair: order.pair.clone(),
            amount_have: order.amount_have,
            amount_want: order.amount_want,
            price: order.price()?,
            sequence,
        })
    }

    pub fn from_limit(order: &LimitOrder, sequence: u64) -> Result<Self> {
        Ok(Self {
            id: order.id(),
            pubkey: order.pubkey,
            side: order.side,
            pair: order.pair.clone(),
            amount_have: order.amount_have,
            amount_want: order.amount_want,
            price: order.price()?,
            sequence,
        })
    }

    /// BASE amount this order still buys or sells.
    #[must_use]
    pub fn base_amount(&self) -> u64 {
        match self.side {
            OrderSide::Buy => self.amount_want,
            OrderSide::Sell => self.amount_have,
        }
    }

    /// QUOTE amount this order still pays or asks for.
    #[must_use]
    pub fn quote_amount(&self) -> u64 {
        match self.side {
            OrderSide::Buy => self.amount_have,
            OrderSide::Sell => self.amount_want,
        }
    }

    #[must_use]
    pub fn have_asset(&self) -> &Asset {
        have_asset(self.side, &self.pair)
    }

    #[must_use]
    pub fn want_asset(&self) -> &Asset {
        want_asset(self.side, &self.pair)
    }

    /// Either side exhausted.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.amount_have == 0 || self.amount_want == 0
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// A trader with a throwaway ed25519 key. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug)]
pub struct TestTrader {
    pub key: SigningKey,
}

#[cfg(any(test, feature = "test-helpers"))]
impl TestTrader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            key: SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    #[must_use]
    pub fn pubkey(&self) -> Pubkey {
        Pubkey::from(&self.key.verifying_key())
    }

    /// A signed auction order with a random nonce.
    #[must_use]
    pub fn auction_order(
        &self,
        side: OrderSide,
        pair: &MarketPair,
        amount_have: u64,
        amount_want: u64,
        auction_id: AuctionId,
    ) -> AuctionOrder {
        let mut order = AuctionOrder {
            pubkey: self.pubkey(),
            side,
            pair: pair.clone(),
            amount_have,
            amount_want,
            auction_id,
            nonce: rand::random(),
            signature: Vec::new(),
        };
        order.sign(&self.key);
        order
    }

    #[must_use]
    pub fn limit_order(
        &self,
        side: OrderSide,
        pair: &MarketPair,
        amount_have: u64,
        amount_want: u64,
    ) -> LimitOrder {
        LimitOrder {
            pubkey: self.pubkey(),
            side,
            pair: pair.clone(),
            amount_have,
            amount_want,
            placed_at: Utc::now(),
        }
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Default for TestTrader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl AuctionOrder {
    /// Signed BTC/LTC order from a fresh trader.
    pub fn dummy(
        side: OrderSide,
        amount_have: u64,
        amount_want: u64,
        auction_id: AuctionId,
    ) -> Self {
        TestTrader::new().auction_order(
            side,
            &MarketPair::new("BTC", "LTC"),
            amount_have,
            amount_want,
            auction_id,
        )
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl RestingOrder {
    /// Unsigned resting order with a synthetic id.
    pub fn dummy(side: OrderSide, amount_have: u64, amount_want: u64, sequence: u64) -> Self {
        let price = order_price(side, amount_have, amount_want).unwrap_or(Decimal::ZERO);
        Self {
            id: OrderId::from_payload(b"dummy:", &sequence.to_le_bytes()),
            pubkey: Pubkey([0u8; 32]),
            side,
            pair: MarketPair::new("BTC", "LTC"),
            amount_have,
            amount_want,
            price,
            sequence,
        }
    }
}
