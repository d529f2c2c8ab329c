//! Perpetual positions as materialized by the upstream ledger.

use crate::domain::{BlockHeight, Decimal, PerpetualId, PositionSide, SubaccountId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a perpetual position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionStatus {
    Open,
    Closed,
    Liquidated,
}

impl PositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Open => "OPEN",
            PositionStatus::Closed => "CLOSED",
            PositionStatus::Liquidated => "LIQUIDATED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(PositionStatus::Open),
            "CLOSED" => Some(PositionStatus::Closed),
            "LIQUIDATED" => Some(PositionStatus::Liquidated),
            _ => None,
        }
    }
}

impl std::fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 96-bit chain event id: (block height, transaction index, event index).
///
/// Orders chronologically.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EventId {
    pub block_height: u32,
    pub transaction_index: u32,
    pub event_index: u32,
}

impl EventId {
    pub fn new(block_height: u32, transaction_index: u32, event_index: u32) -> Self {
        Self {
            block_height,
            transaction_index,
            event_index,
        }
    }

    /// Hex encoding of the big-endian 12-byte id.
    pub fn to_hex(&self) -> String {
        format!(
            "{:08x}{:08x}{:08x}",
            self.block_height, self.transaction_index, self.event_index
        )
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != 24 || !s.is_ascii() {
            return None;
        }
        let part = |range: std::ops::Range<usize>| u32::from_str_radix(&s[range], 16).ok();
        Some(Self {
            block_height: part(0..8)?,
            transaction_index: part(8..16)?,
            event_index: part(16..24)?,
        })
    }
}

/// A perpetual position row.
///
/// `size` is signed: positive for LONG, negative for SHORT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerpetualPosition {
    pub subaccount_id: SubaccountId,
    pub perpetual_id: PerpetualId,
    pub side: PositionSide,
    pub status: PositionStatus,
    pub size: Decimal,
    pub max_size: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Option<Decimal>,
    pub sum_open: Decimal,
    pub sum_close: Decimal,
    pub settled_funding: Decimal,
    pub created_at: DateTime<Utc>,
    pub created_at_height: BlockHeight,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_at_height: Option<BlockHeight>,
    pub last_event_id: EventId,
}

impl PerpetualPosition {
    pub fn is_open(&self) -> bool {
        matches!(self.status, PositionStatus::Open)
    }
}
