//! Aggregation of per-subaccount PnL series across a group of subaccounts.
//!
//! Members are aligned by bucket: the exact timestamp for hourly series, the
//! UTC calendar day for daily series. Members without a point at a bucket
//! simply do not contribute to it.

use crate::domain::{Block, Decimal, SubaccountId};
use crate::engine::rollup::{HistoricalPnlSeries, PnlPoint, PnlResolution};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// One member's rolled-up series, optionally labelled (e.g. by market ticker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSeries {
    pub subaccount_id: SubaccountId,
    pub label: Option<String>,
    /// Newest first.
    pub points: Vec<PnlPoint>,
}

/// A member whose series could not be computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberFailure {
    pub subaccount_id: SubaccountId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPnlSeries {
    pub pooled: HistoricalPnlSeries,
    pub per_group: BTreeMap<String, HistoricalPnlSeries>,
    /// Members left out of every series above.
    pub failures: Vec<MemberFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum BucketKey {
    Instant(DateTime<Utc>),
    Day(NaiveDate),
}

fn bucket_key(point: &PnlPoint, resolution: PnlResolution) -> BucketKey {
    match resolution {
        PnlResolution::Hourly => BucketKey::Instant(point.created_at),
        PnlResolution::Daily => BucketKey::Day(point.created_at.date_naive()),
    }
}

/// Sum equity, total PnL and net transfers per bucket.
///
/// The aggregated point carries the latest creation time, block height and
/// block time among its contributors. Output is newest bucket first.
pub fn aggregate<'a>(
    series: impl IntoIterator<Item = &'a [PnlPoint]>,
    resolution: PnlResolution,
) -> HistoricalPnlSeries {
    let mut buckets: BTreeMap<BucketKey, PnlPoint> = BTreeMap::new();
    for points in series {
        for point in points {
            let weight = point.contributors.unwrap_or(1);
            buckets
                .entry(bucket_key(point, resolution))
                .and_modify(|acc| {
                    acc.equity += point.equity;
                    acc.total_pnl += point.total_pnl;
                    acc.net_transfers += point.net_transfers;
                    acc.created_at = acc.created_at.max(point.created_at);
                    acc.block_height = acc.block_height.max(point.block_height);
                    acc.block_time = acc.block_time.max(point.block_time);
                    acc.contributors = acc.contributors.map(|c| c + weight);
                })
                .or_insert_with(|| PnlPoint {
                    contributors: Some(weight),
                    ..point.clone()
                });
        }
    }
    HistoricalPnlSeries::new(buckets.into_values().rev().collect())
}

/// Pooled series over all members plus one series per label.
///
/// Unlabelled members contribute to the pooled series only.
pub fn aggregate_group(members: &[MemberSeries], resolution: PnlResolution) -> GroupPnlSeries {
    let pooled = aggregate(members.iter().map(|m| m.points.as_slice()), resolution);

    let mut by_label: BTreeMap<&str, Vec<&[PnlPoint]>> = BTreeMap::new();
    for member in members {
        if let Some(label) = &member.label {
            by_label
                .entry(label.as_str())
                .or_default()
                .push(member.points.as_slice());
        }
    }
    let per_group = by_label
        .into_iter()
        .map(|(label, series)| (label.to_string(), aggregate(series, resolution)))
        .collect();

    GroupPnlSeries {
        pooled,
        per_group,
        failures: Vec::new(),
    }
}

/// Drop buckets with fewer contributors than vaults created at or before the bucket time.
pub fn filter_incomplete_buckets(
    series: HistoricalPnlSeries,
    created_at: &[DateTime<Utc>],
) -> HistoricalPnlSeries {
    let mut created: Vec<DateTime<Utc>> = created_at.to_vec();
    created.sort();
    let points = series
        .points
        .into_iter()
        .filter(|point| {
            let expected = created.partition_point(|t| *t <= point.created_at) as u32;
            point.contributors.unwrap_or(1) >= expected
        })
        .collect();
    HistoricalPnlSeries {
        points,
        page: series.page,
    }
}

/// Re-base a member's points on `start`.
///
/// Points before `start` are dropped and the total PnL of the earliest
/// remaining point is subtracted from every remaining point.
pub fn apply_baseline(points: &[PnlPoint], start: DateTime<Utc>) -> Vec<PnlPoint> {
    let kept: Vec<&PnlPoint> = points.iter().filter(|p| p.created_at >= start).collect();
    let Some(baseline) = kept.iter().min_by_key(|p| (p.created_at, p.block_height)) else {
        return Vec::new();
    };
    let base_pnl: Decimal = baseline.total_pnl;
    kept.into_iter()
        .map(|p| PnlPoint {
            total_pnl: p.total_pnl - base_pnl,
            ..p.clone()
        })
        .collect()
}

/// Prepend a live point: the most recent point's PnL and transfers with the
/// current `equity`, stamped at `latest_block`. Empty input stays empty.
pub fn with_current_point(points: &[PnlPoint], equity: Decimal, latest_block: Block) -> Vec<PnlPoint> {
    let Some(latest) = points.iter().max_by_key(|p| p.block_time) else {
        return Vec::new();
    };
    let current = PnlPoint {
        equity,
        created_at: latest_block.time,
        block_height: latest_block.height,
        block_time: latest_block.time,
        ..latest.clone()
    };
    std::iter::once(current).chain(points.iter().cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, BlockHeight};
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, day, hour, 0, 0).unwrap()
    }

    fn point(time: DateTime<Utc>, height: u64, equity: i64, pnl: i64) -> PnlPoint {
        PnlPoint {
            equity: Decimal::from(equity),
            total_pnl: Decimal::from(pnl),
            net_transfers: Decimal::from(10),
            created_at: time,
            block_height: BlockHeight::new(height),
            block_time: time,
            contributors: None,
        }
    }

    fn member(n: u32, label: Option<&str>, points: Vec<PnlPoint>) -> MemberSeries {
        MemberSeries {
            subaccount_id: SubaccountId::new(&Address::new("dydx1group"), n),
            label: label.map(str::to_string),
            points,
        }
    }

    #[test]
    fn test_hourly_sums_matching_timestamps() {
        let a = vec![point(at(1, 1), 11, 100, 5), point(at(1, 0), 10, 90, 4)];
        let b = vec![point(at(1, 1), 12, 50, -2)];
        let series = aggregate([a.as_slice(), b.as_slice()], PnlResolution::Hourly);

        assert_eq!(series.points.len(), 2);
        let newest = &series.points[0];
        assert_eq!(newest.equity, Decimal::from(150));
        assert_eq!(newest.total_pnl, Decimal::from(3));
        assert_eq!(newest.net_transfers, Decimal::from(20));
        assert_eq!(newest.block_height, BlockHeight::new(12));
        assert_eq!(newest.contributors, Some(2));
        assert_eq!(series.points[1].equity, Decimal::from(90));
        assert_eq!(series.points[1].contributors, Some(1));
    }

    #[test]
    fn test_daily_aligns_by_calendar_day() {
        let a = vec![point(at(2, 23), 50, 100, 1)];
        let b = vec![point(at(2, 5), 30, 100, 1)];
        let series = aggregate([a.as_slice(), b.as_slice()], PnlResolution::Daily);
        assert_eq!(series.points.len(), 1);
        assert_eq!(series.points[0].equity, Decimal::from(200));
        assert_eq!(series.points[0].created_at, at(2, 23));
    }

    #[test]
    fn test_group_by_label() {
        let members = vec![
            member(0, Some("BTC-USD"), vec![point(at(1, 0), 1, 100, 1)]),
            member(1, Some("ETH-USD"), vec![point(at(1, 0), 1, 40, 2)]),
            member(2, Some("BTC-USD"), vec![point(at(1, 0), 1, 60, 3)]),
        ];
        let group = aggregate_group(&members, PnlResolution::Hourly);
        assert_eq!(group.pooled.points[0].equity, Decimal::from(200));
        assert_eq!(group.per_group["BTC-USD"].points[0].equity, Decimal::from(160));
        assert_eq!(group.per_group["ETH-USD"].points[0].total_pnl, Decimal::from(2));
        assert!(group.failures.is_empty());
    }

    #[test]
    fn test_filter_incomplete_buckets() {
        let a = vec![point(at(1, 2), 3, 1, 1), point(at(1, 0), 1, 1, 1)];
        let b = vec![point(at(1, 2), 3, 1, 1)];
        let series = aggregate([a.as_slice(), b.as_slice()], PnlResolution::Hourly);
        // one vault at 00:00, two from 01:00
        let filtered = filter_incomplete_buckets(series.clone(), &[at(1, 0), at(1, 1)]);
        assert_eq!(filtered.points.len(), 2);

        let stricter = filter_incomplete_buckets(series, &[at(1, 0), at(1, 0)]);
        assert_eq!(stricter.points.len(), 1);
        assert_eq!(stricter.points[0].created_at, at(1, 2));
    }

    #[test]
    fn test_apply_baseline() {
        let points = vec![
            point(at(3, 0), 30, 0, 25),
            point(at(2, 0), 20, 0, 15),
            point(at(1, 0), 10, 0, 5),
        ];
        let adjusted = apply_baseline(&points, at(2, 0));
        assert_eq!(adjusted.len(), 2);
        assert_eq!(adjusted[0].total_pnl, Decimal::from(10));
        assert_eq!(adjusted[1].total_pnl, Decimal::zero());
    }

    #[test]
    fn test_with_current_point() {
        let points = vec![point(at(1, 1), 11, 100, 7), point(at(1, 0), 10, 90, 4)];
        let block = Block {
            height: BlockHeight::new(99),
            time: at(1, 1) + chrono::Duration::minutes(20),
        };
        let extended = with_current_point(&points, Decimal::from(123), block);
        assert_eq!(extended.len(), 3);
        assert_eq!(extended[0].equity, Decimal::from(123));
        assert_eq!(extended[0].total_pnl, Decimal::from(7));
        assert_eq!(extended[0].block_height, BlockHeight::new(99));
        assert_eq!(extended[0].created_at, block.time);

        assert!(with_current_point(&[], Decimal::one(), block).is_empty());
    }
}
