use chrono::{DateTime, Duration, TimeZone, Utc};
use perp_valuation::domain::{Address, BlockHeight, Decimal, PnlTick, SubaccountId, TimeRange};
use perp_valuation::engine::{rollup, Pagination, PnlQuery, PnlResolution};
use perp_valuation::{
    MockLedgerStore, ReferenceCache, ServiceSettings, Subaccount, ValuationService,
};
use std::sync::Arc;

fn address() -> Address {
    Address::new("dydx1hourly")
}

fn jan(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, day, hour, 0, 0).unwrap()
}

/// 72 hourly ticks from 2023-01-01T00:00Z, height 1000+i for hour i.
fn three_days(id: SubaccountId) -> Vec<PnlTick> {
    (0..72)
        .map(|i| {
            let at = jan(1, 0) + Duration::hours(i);
            PnlTick {
                subaccount_id: id,
                equity: Decimal::from(10_000 + i),
                total_pnl: Decimal::from(i * 3),
                net_transfers: Decimal::from(10_000),
                created_at: at,
                block_height: BlockHeight::new(1000 + i as u64),
                block_time: at,
            }
        })
        .collect()
}

fn heights_and_times(points: &[perp_valuation::engine::PnlPoint]) -> Vec<(u64, DateTime<Utc>)> {
    points
        .iter()
        .map(|p| (p.block_height.as_u64(), p.created_at))
        .collect()
}

#[test]
fn test_daily_three_day_scenario() {
    let ticks = three_days(SubaccountId::new(&address(), 0));
    let series = rollup(
        &ticks,
        &PnlQuery {
            resolution: PnlResolution::Daily,
            ..Default::default()
        },
    );

    assert_eq!(
        heights_and_times(&series.points),
        vec![(1071, jan(3, 23)), (1024, jan(2, 0)), (1000, jan(1, 0))]
    );
    assert!(series.page.is_none());
}

#[test]
fn test_hourly_keeps_every_tick_newest_first() {
    let ticks = three_days(SubaccountId::new(&address(), 0));
    let series = rollup(&ticks, &PnlQuery::default());

    assert_eq!(series.points.len(), 72);
    assert_eq!(series.points[0].block_height, BlockHeight::new(1071));
    assert_eq!(series.points[71].block_height, BlockHeight::new(1000));
}

#[test]
fn test_daily_range_ending_mid_day_reports_last_tick_of_that_day() {
    let ticks = three_days(SubaccountId::new(&address(), 0));
    let series = rollup(
        &ticks,
        &PnlQuery {
            range: TimeRange {
                created_before_or_at: Some(jan(2, 15)),
                ..Default::default()
            },
            resolution: PnlResolution::Daily,
            ..Default::default()
        },
    );

    assert_eq!(
        heights_and_times(&series.points),
        vec![(1039, jan(2, 15)), (1000, jan(1, 0))]
    );
}

#[test]
fn test_daily_second_page() {
    let ticks = three_days(SubaccountId::new(&address(), 0));
    let series = rollup(
        &ticks,
        &PnlQuery {
            resolution: PnlResolution::Daily,
            pagination: Pagination {
                page: Some(2),
                limit: Some(2),
            },
            ..Default::default()
        },
    );

    assert_eq!(heights_and_times(&series.points), vec![(1000, jan(1, 0))]);
    let page = series.page.unwrap();
    assert_eq!(page.offset, 2);
    assert_eq!(page.page_size, 2);
    assert_eq!(page.total, 3);
}

#[tokio::test]
async fn test_service_applies_default_limit() {
    let sub = Subaccount::new(address(), 0, BlockHeight::new(1071));
    let store = Arc::new(
        MockLedgerStore::new()
            .with_subaccount(sub.clone())
            .with_ticks(three_days(sub.id)),
    );
    let service = ValuationService::new(
        store,
        Arc::new(ReferenceCache::default()),
        ServiceSettings {
            quote_symbol: "USDC".to_string(),
            api_limit: 10,
            vaults: vec![],
            vault_pnl_start_date: None,
        },
    );

    let hourly = service
        .historical_pnl(&address(), 0, PnlQuery::default())
        .await
        .unwrap();
    assert_eq!(hourly.points.len(), 10);
    assert_eq!(hourly.points[0].block_height, BlockHeight::new(1071));

    let daily = service
        .historical_pnl(
            &address(),
            0,
            PnlQuery {
                resolution: PnlResolution::Daily,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        heights_and_times(&daily.points),
        vec![(1071, jan(3, 23)), (1024, jan(2, 0)), (1000, jan(1, 0))]
    );
}
