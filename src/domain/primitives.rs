//! Domain primitives: Address, Ticker, PerpetualId, LiquidityTierId, BlockHeight, PositionSide.

use crate::domain::Decimal;
use serde::{Deserialize, Serialize};

/// Wallet address (bech32 string).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    /// Create an Address from a string.
    pub fn new(addr: impl Into<String>) -> Self {
        Address(addr.into())
    }

    /// Get the address as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Market ticker (e.g., "BTC-USD").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ticker(pub String);

impl Ticker {
    pub fn new(ticker: impl Into<String>) -> Self {
        Ticker(ticker.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a perpetual market.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PerpetualId(pub u32);

impl std::fmt::Display for PerpetualId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a liquidity tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LiquidityTierId(pub u32);

impl std::fmt::Display for LiquidityTierId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chain block height.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BlockHeight(pub u64);

impl BlockHeight {
    pub fn new(height: u64) -> Self {
        BlockHeight(height)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position side: Long or Short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Side implied by the sign of a signed amount. Zero maps to Short.
    pub fn from_signed(amount: Decimal) -> Self {
        if amount.is_positive() {
            PositionSide::Long
        } else {
            PositionSide::Short
        }
    }

    /// Apply this side's sign to an unsigned magnitude.
    pub fn signed(&self, magnitude: Decimal) -> Decimal {
        match self {
            PositionSide::Long => magnitude,
            PositionSide::Short => -magnitude,
        }
    }

    /// Whether a signed size agrees with this side. Zero agrees with both.
    pub fn agrees_with(&self, signed_size: Decimal) -> bool {
        match self {
            PositionSide::Long => !signed_size.is_negative(),
            PositionSide::Short => !signed_size.is_positive(),
        }
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}
