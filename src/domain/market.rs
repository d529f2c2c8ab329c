//! Reference data: perpetual markets and liquidity tiers.

use crate::domain::{Decimal, LiquidityTierId, PerpetualId, Ticker};
use serde::{Deserialize, Serialize};

/// A perpetual market together with its current oracle price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerpetualMarket {
    pub perpetual_id: PerpetualId,
    pub ticker: Ticker,
    pub clob_pair_id: u32,
    pub liquidity_tier_id: LiquidityTierId,
    pub oracle_price: Decimal,
    pub tick_size: Decimal,
    pub step_size: Decimal,
}

/// Risk bucket defining the margin-fraction curve by notional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityTier {
    pub id: LiquidityTierId,
    pub name: String,
    pub initial_margin_ppm: u32,
    /// Maintenance margin as a fraction of initial margin, in ppm.
    pub maintenance_fraction_ppm: u32,
    /// Notional up to which the base fraction applies.
    pub base_position_notional: Decimal,
    /// Notional width of one margin step above the base notional.
    pub step_notional: Decimal,
    pub open_interest_lower_cap: Option<Decimal>,
    pub open_interest_upper_cap: Option<Decimal>,
}
