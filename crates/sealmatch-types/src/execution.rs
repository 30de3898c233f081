//! Execution records produced by matching.
//!
//! An [`OrderExecution`] says what happened to one order. The matching
//! [`SettlementExecution`]s are the balance instructions handed to the
//! settlement engine: exactly one debit and one credit per execution.

use serde::{Deserialize, Serialize};

use crate::{Asset, OrderId, Pubkey};

/// An amount of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    pub asset: Asset,
    pub amount: u64,
}

impl Entry {
    #[must_use]
    pub fn new(asset: impl Into<Asset>, amount: u64) -> Self {
        Self {
            asset: asset.into(),
            amount,
        }
    }
}

/// Result of matching one order.
///
/// When `filled` is set both remaining amounts are zero and the order
/// leaves every book. Otherwise they hold the reduced remainder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderExecution {
    pub order_id: OrderId,
    pub debited: Entry,
    pub credited: Entry,
    pub new_amount_want: u64,
    pub new_amount_have: u64,
    pub filled: bool,
}

impl OrderExecution {
    /// Debit/credit pair for the order's owner.
    #[must_use]
    pub fn settlement_pair(&self, pubkey: Pubkey) -> [SettlementExecution; 2] {
        [
            SettlementExecution::debit(pubkey, &self.debited),
            SettlementExecution::credit(pubkey, &self.credited),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementType {
    Debit,
    Credit,
}

impl std::fmt::Display for SettlementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debit => write!(f, "DEBIT"),
            Self::Credit => write!(f, "CREDIT"),
        }
    }
}

/// Instruction to move `amount` of `asset` into or out of `pubkey`'s balance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SettlementExecution {
    pub pubkey: Pubkey,
    pub amount: u64,
    pub asset: Asset,
    pub kind: SettlementType,
}

impl SettlementExecution {
    #[must_use]
    pub fn debit(pubkey: Pubkey, entry: &Entry) -> Self {
        Self {
            pubkey,
            amount: entry.amount,
            asset: entry.asset.clone(),
            kind: SettlementType::Debit,
        }
    }

    #[must_use]
    pub fn credit(pubkey: Pubkey, entry: &Entry) -> Self {
        Self {
            pubkey,
            amount: entry.amount,
            asset: entry.asset.clone(),
            kind: SettlementType::Credit,
        }
    }
}
