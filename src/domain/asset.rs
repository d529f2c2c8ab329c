//! Asset (collateral) positions.

use crate::domain::{Decimal, PositionSide, SubaccountId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An asset balance held by a subaccount. `size` is an unsigned magnitude.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPosition {
    pub subaccount_id: SubaccountId,
    pub subaccount_number: u32,
    pub symbol: String,
    pub side: PositionSide,
    pub size: Decimal,
}

impl AssetPosition {
    /// Build a position from a signed balance.
    pub fn from_signed(
        subaccount_id: SubaccountId,
        subaccount_number: u32,
        symbol: impl Into<String>,
        signed_size: Decimal,
    ) -> Self {
        Self {
            subaccount_id,
            subaccount_number,
            symbol: symbol.into(),
            side: PositionSide::from_signed(signed_size),
            size: signed_size.abs(),
        }
    }

    pub fn signed_size(&self) -> Decimal {
        self.side.signed(self.size)
    }
}

/// Asset positions keyed by symbol.
pub type AssetPositionsMap = BTreeMap<String, AssetPosition>;
