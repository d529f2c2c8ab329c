//! Re-bucketing of a subaccount's PnL ticks into hourly or daily series.
//!
//! Hourly passes ticks through. Daily keeps one tick per UTC calendar day:
//! the LAST tick of the most recent day present (still in progress) and the
//! FIRST tick of every earlier day. Output is always newest first.

use crate::domain::{BlockHeight, Decimal, PnlTick, TimeRange};
use crate::error::ValuationError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PnlResolution {
    #[default]
    Hourly,
    Daily,
}

impl FromStr for PnlResolution {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(PnlResolution::Hourly),
            "daily" => Ok(PnlResolution::Daily),
            other => Err(ValuationError::InvalidParameter(format!(
                "unknown PnL resolution '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page_size: u32,
    pub offset: u32,
    pub total: u32,
}

impl Pagination {
    /// Slice already-bucketed points. Reports page info only when `page` is set.
    pub fn apply<T>(&self, items: Vec<T>) -> (Vec<T>, Option<PageInfo>) {
        let total = items.len() as u32;
        match (self.page, self.limit) {
            (Some(page), limit) => {
                let page_size = limit.unwrap_or(total);
                let offset = (page.max(1) - 1).saturating_mul(page_size);
                let sliced = items
                    .into_iter()
                    .skip(offset as usize)
                    .take(page_size as usize)
                    .collect();
                (
                    sliced,
                    Some(PageInfo {
                        page_size,
                        offset,
                        total,
                    }),
                )
            }
            (None, Some(limit)) => (items.into_iter().take(limit as usize).collect(), None),
            (None, None) => (items, None),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PnlQuery {
    pub range: TimeRange,
    pub resolution: PnlResolution,
    pub pagination: Pagination,
}

/// One point of a historical PnL series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlPoint {
    pub equity: Decimal,
    pub total_pnl: Decimal,
    pub net_transfers: Decimal,
    pub created_at: DateTime<Utc>,
    pub block_height: BlockHeight,
    pub block_time: DateTime<Utc>,
    /// Number of subaccounts summed into this point; absent for a single subaccount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributors: Option<u32>,
}

impl From<&PnlTick> for PnlPoint {
    fn from(tick: &PnlTick) -> Self {
        Self {
            equity: tick.equity,
            total_pnl: tick.total_pnl,
            net_transfers: tick.net_transfers,
            created_at: tick.created_at,
            block_height: tick.block_height,
            block_time: tick.block_time,
            contributors: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPnlSeries {
    /// Newest first.
    pub points: Vec<PnlPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageInfo>,
}

impl HistoricalPnlSeries {
    pub fn new(points: Vec<PnlPoint>) -> Self {
        Self { points, page: None }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One point per UTC day, newest day first. `ascending` must be in time order.
pub fn select_daily<'a>(ascending: impl IntoIterator<Item = &'a PnlPoint>) -> Vec<&'a PnlPoint> {
    let mut days: BTreeMap<NaiveDate, (&PnlPoint, &PnlPoint)> = BTreeMap::new();
    for point in ascending {
        days.entry(point.created_at.date_naive())
            .and_modify(|(_, last)| *last = point)
            .or_insert((point, point));
    }

    let most_recent = days.keys().next_back().copied();
    days.into_iter()
        .rev()
        .map(|(day, (first, last))| if Some(day) == most_recent { last } else { first })
        .collect()
}

/// Bucket points at `resolution`, newest first. Input order does not matter.
pub fn bucket(mut points: Vec<PnlPoint>, resolution: PnlResolution) -> Vec<PnlPoint> {
    points.sort_by_key(|p| (p.created_at, p.block_height));
    match resolution {
        PnlResolution::Hourly => {
            points.reverse();
            points
        }
        PnlResolution::Daily => select_daily(&points).into_iter().cloned().collect(),
    }
}

/// Filter, bucket and paginate one subaccount's ticks.
pub fn rollup(ticks: &[PnlTick], query: &PnlQuery) -> HistoricalPnlSeries {
    let in_range: Vec<PnlPoint> = ticks
        .iter()
        .filter(|t| query.range.contains(t))
        .map(PnlPoint::from)
        .collect();
    let (points, page) = query.pagination.apply(bucket(in_range, query.resolution));
    HistoricalPnlSeries { points, page }
}
