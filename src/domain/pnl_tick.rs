//! Periodic PnL snapshots and chain blocks.

use crate::domain::{BlockHeight, Decimal, SubaccountId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pre-computed equity/PnL/transfers record for one subaccount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlTick {
    pub subaccount_id: SubaccountId,
    pub equity: Decimal,
    pub total_pnl: Decimal,
    pub net_transfers: Decimal,
    pub created_at: DateTime<Utc>,
    pub block_height: BlockHeight,
    pub block_time: DateTime<Utc>,
}

/// A chain block (height and time).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub height: BlockHeight,
    pub time: DateTime<Utc>,
}

/// Bounds applied to a raw tick series before bucketing. All bounds are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub created_on_or_after: Option<DateTime<Utc>>,
    pub created_before_or_at: Option<DateTime<Utc>>,
    pub created_on_or_after_height: Option<BlockHeight>,
    pub created_before_or_at_height: Option<BlockHeight>,
}

impl TimeRange {
    pub fn contains(&self, tick: &PnlTick) -> bool {
        self.created_on_or_after.map_or(true, |t| tick.created_at >= t)
            && self.created_before_or_at.map_or(true, |t| tick.created_at <= t)
            && self
                .created_on_or_after_height
                .map_or(true, |h| tick.block_height >= h)
            && self
                .created_before_or_at_height
                .map_or(true, |h| tick.block_height <= h)
    }
}
