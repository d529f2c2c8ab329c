use chrono::{Duration, TimeZone, Utc};
use perp_valuation::domain::{
    Address, AssetPosition, Block, BlockHeight, Decimal, EventId, FundingIndexAt,
    FundingIndexUpdate, LiquidityTier, LiquidityTierId, PerpetualId, PerpetualMarket,
    PerpetualPosition, PnlTick, PositionSide, PositionStatus, Subaccount, Ticker, TimeRange,
};
use perp_valuation::engine::{PnlQuery, PnlResolution};
use perp_valuation::{
    init_db, LedgerFixtures, LedgerStore, ReferenceCache, Repository, ServiceSettings,
    ValuationService,
};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::TempDir;

async fn setup_repo() -> (Repository, LedgerFixtures, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("ledger.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let fixtures = LedgerFixtures::new(pool.clone());
    (Repository::new(pool), fixtures, temp_dir)
}

fn address() -> Address {
    Address::new("dydx1sqlite")
}

fn subaccount() -> Subaccount {
    Subaccount::new(address(), 0, BlockHeight::new(10))
}

fn btc_market() -> PerpetualMarket {
    PerpetualMarket {
        perpetual_id: PerpetualId(0),
        ticker: Ticker::new("BTC-USD"),
        clob_pair_id: 0,
        liquidity_tier_id: LiquidityTierId(0),
        oracle_price: Decimal::from(15_000),
        tick_size: Decimal::one(),
        step_size: Decimal::from(dec!(0.0001)),
    }
}

fn large_cap() -> LiquidityTier {
    LiquidityTier {
        id: LiquidityTierId(0),
        name: "Large-Cap".to_string(),
        initial_margin_ppm: 50_000,
        maintenance_fraction_ppm: 600_000,
        base_position_notional: Decimal::from(1_000_000),
        step_notional: Decimal::from(1_000_000),
        open_interest_lower_cap: Some(Decimal::zero()),
        open_interest_upper_cap: None,
    }
}

fn open_long(event: EventId) -> PerpetualPosition {
    PerpetualPosition {
        subaccount_id: subaccount().id,
        perpetual_id: PerpetualId(0),
        side: PositionSide::Long,
        status: PositionStatus::Open,
        size: Decimal::from(10),
        max_size: Decimal::from(10),
        entry_price: Decimal::from(20_000),
        exit_price: None,
        sum_open: Decimal::from(10),
        sum_close: Decimal::zero(),
        settled_funding: Decimal::from(200_000),
        created_at: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
        created_at_height: BlockHeight::new(2),
        closed_at: None,
        closed_at_height: None,
        last_event_id: event,
    }
}

fn funding(index: i64, height: u64) -> FundingIndexUpdate {
    FundingIndexUpdate {
        perpetual_id: PerpetualId(0),
        funding_index: Decimal::from(index),
        effective_at_height: BlockHeight::new(height),
    }
}

async fn load_canonical(fixtures: &LedgerFixtures) {
    fixtures.upsert_subaccount(&subaccount()).await.unwrap();
    fixtures.upsert_perpetual_market(&btc_market()).await.unwrap();
    fixtures.upsert_liquidity_tier(&large_cap()).await.unwrap();

    // An older, since-closed row for the same perpetual must be ignored.
    let mut stale = open_long(EventId::new(1, 0, 0));
    stale.status = PositionStatus::Closed;
    stale.size = Decimal::zero();
    stale.closed_at = Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
    stale.closed_at_height = Some(BlockHeight::new(1));
    fixtures.insert_perpetual_position(&stale).await.unwrap();
    fixtures
        .insert_perpetual_position(&open_long(EventId::new(2, 0, 0)))
        .await
        .unwrap();

    for update in [funding(9_000, 1), funding(10_000, 5), funding(10_050, 20)] {
        assert!(fixtures.insert_funding_update(&update).await.unwrap());
    }
}

fn service(repo: Repository) -> (ValuationService, Arc<ReferenceCache>, Arc<dyn LedgerStore>) {
    let store: Arc<dyn LedgerStore> = Arc::new(repo);
    let cache = Arc::new(ReferenceCache::default());
    let service = ValuationService::new(
        store.clone(),
        cache.clone(),
        ServiceSettings {
            quote_symbol: "USDC".to_string(),
            api_limit: 1000,
            vaults: vec![],
            vault_pnl_start_date: None,
        },
    );
    (service, cache, store)
}

#[tokio::test]
async fn test_rows_round_trip_through_store() {
    let (repo, fixtures, _temp) = setup_repo().await;
    load_canonical(&fixtures).await;
    let sub = subaccount();

    assert_eq!(repo.subaccount(&sub.id).await.unwrap(), Some(sub.clone()));
    let positions = repo.list_open_and_closed_positions(&sub.id).await.unwrap();
    assert_eq!(positions.len(), 2);
    assert_eq!(positions[0].last_event_id, EventId::new(2, 0, 0));
    assert_eq!(positions[1].status, PositionStatus::Closed);

    assert_eq!(repo.liquidity_tiers().await.unwrap(), vec![large_cap()]);
    assert_eq!(repo.perpetual_markets().await.unwrap(), vec![btc_market()]);
}

#[tokio::test]
async fn test_funding_index_lookups() {
    let (repo, fixtures, _temp) = setup_repo().await;
    load_canonical(&fixtures).await;

    let at = |h| FundingIndexAt::Height(BlockHeight::new(h));
    assert_eq!(
        repo.funding_index_at(PerpetualId(0), at(10)).await.unwrap(),
        Some(Decimal::from(10_000))
    );
    assert_eq!(
        repo.funding_index_at(PerpetualId(0), FundingIndexAt::Latest)
            .await
            .unwrap(),
        Some(Decimal::from(10_050))
    );
    assert_eq!(
        repo.funding_index_at(PerpetualId(7), FundingIndexAt::Latest)
            .await
            .unwrap(),
        None
    );

    let map = repo.funding_index_map(at(4)).await.unwrap();
    assert_eq!(map.get(PerpetualId(0)), Decimal::from(9_000));
    assert!(repo.funding_index_map(at(0)).await.unwrap().is_empty());

    // Duplicate (perpetual, height) is ignored.
    assert!(!fixtures.insert_funding_update(&funding(1, 20)).await.unwrap());
}

#[tokio::test]
async fn test_subaccount_state_from_sqlite() {
    let (repo, fixtures, _temp) = setup_repo().await;
    load_canonical(&fixtures).await;
    fixtures
        .upsert_asset_position(&AssetPosition::from_signed(
            subaccount().id,
            0,
            "USDC",
            Decimal::from(1_000),
        ))
        .await
        .unwrap();

    let (service, cache, store) = service(repo);
    cache.refresh(store.as_ref()).await.unwrap();

    let state = service.subaccount_state(&address(), 0).await.unwrap();
    assert_eq!(state.positions.len(), 1);
    let view = &state.positions[0];
    assert_eq!(view.unsettled_funding, Decimal::from(-500));
    assert_eq!(view.realized_pnl, Decimal::from(199_500));
    assert_eq!(view.unrealized_pnl, Decimal::from(-50_000));

    assert_eq!(state.asset_positions[0].size, Decimal::from(500));
    assert_eq!(state.asset_positions[0].side, PositionSide::Long);
    assert_eq!(state.equity, Decimal::from(150_500));
}

#[tokio::test]
async fn test_pnl_ticks_range_and_rollup() {
    let (repo, fixtures, _temp) = setup_repo().await;
    let sub = subaccount();
    fixtures.upsert_subaccount(&sub).await.unwrap();

    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    let ticks: Vec<PnlTick> = (0..72)
        .map(|i| {
            let at = start + Duration::hours(i);
            PnlTick {
                subaccount_id: sub.id,
                equity: Decimal::from(dec!(1000.25)),
                total_pnl: Decimal::from(i),
                net_transfers: Decimal::zero(),
                created_at: at,
                block_height: BlockHeight::new(1000 + i as u64),
                block_time: at,
            }
        })
        .collect();
    assert_eq!(fixtures.insert_pnl_ticks(&ticks).await.unwrap(), 72);
    // Re-inserting is a no-op.
    assert_eq!(fixtures.insert_pnl_ticks(&ticks[..3]).await.unwrap(), 0);
    fixtures
        .insert_block(&Block {
            height: BlockHeight::new(1071),
            time: start + Duration::hours(71),
        })
        .await
        .unwrap();

    let ranged = repo
        .pnl_ticks(
            &sub.id,
            &TimeRange {
                created_on_or_after_height: Some(BlockHeight::new(1010)),
                created_before_or_at_height: Some(BlockHeight::new(1019)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(ranged.len(), 10);
    assert_eq!(ranged[0], ticks[10]);
    assert_eq!(
        repo.latest_block().await.unwrap().map(|b| b.height),
        Some(BlockHeight::new(1071))
    );

    let (service, _cache, _store) = service(repo);
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
    let heights: Vec<u64> = daily.points.iter().map(|p| p.block_height.as_u64()).collect();
    assert_eq!(heights, vec![1071, 1024, 1000]);
}

#[tokio::test]
async fn test_fixture_writes_visible_to_second_reader() {
    let (repo, fixtures, _temp) = setup_repo().await;
    let reader: Arc<dyn LedgerStore> = Arc::new(Repository::new(repo.pool().clone()));
    assert!(reader.subaccount(&subaccount().id).await.unwrap().is_none());

    load_canonical(&fixtures).await;
    // Later upserts replace the earlier row for the same key.
    let mut repriced = btc_market();
    repriced.oracle_price = Decimal::from(16_000);
    fixtures.upsert_perpetual_market(&repriced).await.unwrap();

    assert_eq!(
        reader.subaccount(&subaccount().id).await.unwrap(),
        Some(subaccount())
    );
    assert_eq!(reader.perpetual_markets().await.unwrap(), vec![repriced]);
    assert_eq!(
        reader
            .list_open_and_closed_positions(&subaccount().id)
            .await
            .unwrap()
            .len(),
        2
    );
}
