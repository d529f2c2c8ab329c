//! Funding index log entries and per-perpetual index maps.

use crate::domain::{BlockHeight, Decimal, PerpetualId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of the append-only per-perpetual funding index log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingIndexUpdate {
    pub perpetual_id: PerpetualId,
    pub funding_index: Decimal,
    pub effective_at_height: BlockHeight,
}

/// Which point of the funding log to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundingIndexAt {
    /// Most recent index effective at or before the height.
    Height(BlockHeight),
    Latest,
}

/// Cumulative funding index per perpetual at one point in time.
///
/// A perpetual without recorded funding history reads as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FundingIndexMap(BTreeMap<PerpetualId, Decimal>);

impl FundingIndexMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, perpetual_id: PerpetualId) -> Decimal {
        self.0.get(&perpetual_id).copied().unwrap_or_default()
    }

    pub fn insert(&mut self, perpetual_id: PerpetualId, index: Decimal) {
        self.0.insert(perpetual_id, index);
    }

    pub fn with(mut self, perpetual_id: PerpetualId, index: Decimal) -> Self {
        self.insert(perpetual_id, index);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve the map at `at` from a raw update log.
    pub fn from_updates(updates: &[FundingIndexUpdate], at: FundingIndexAt) -> Self {
        let mut best: BTreeMap<PerpetualId, &FundingIndexUpdate> = BTreeMap::new();
        for update in updates {
            if let FundingIndexAt::Height(height) = at {
                if update.effective_at_height > height {
                    continue;
                }
            }
            match best.get(&update.perpetual_id) {
                Some(current) if current.effective_at_height >= update.effective_at_height => {}
                _ => {
                    best.insert(update.perpetual_id, update);
                }
            }
        }
        FundingIndexMap(
            best.into_iter()
                .map(|(id, update)| (id, update.funding_index))
                .collect(),
        )
    }
}

impl FromIterator<(PerpetualId, Decimal)> for FundingIndexMap {
    fn from_iter<T: IntoIterator<Item = (PerpetualId, Decimal)>>(iter: T) -> Self {
        FundingIndexMap(iter.into_iter().collect())
    }
}
