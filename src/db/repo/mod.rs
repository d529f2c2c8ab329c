//! Repository layer over materialized ledger rows.
//!
//! This module provides the `Repository` struct and its `LedgerStore` impl.
//! Queries are organized across submodules by table group:
//! - `positions.rs` - Subaccounts, perpetual positions, asset positions
//! - `reference.rs` - Markets, liquidity tiers, funding index updates
//! - `pnl.rs` - PnL ticks and blocks
//!
//! Decimals are stored as TEXT and parsed losslessly; timestamps are INTEGER
//! milliseconds since the epoch.

mod pnl;
mod positions;
mod reference;

use crate::datasource::{LedgerStore, StoreError};
use crate::domain::{
    AssetPosition, Block, BlockHeight, Decimal, FundingIndexAt, FundingIndexMap, LiquidityTier,
    PerpetualId, PerpetualMarket, PerpetualPosition, PnlTick, PositionSide, Subaccount,
    SubaccountId, TimeRange,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

/// Repository for ledger-row queries.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// =========================================================================
// Row decoding helpers
// =========================================================================

fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str_canonical(raw)
        .map_err(|e| StoreError::Parse(format!("{} '{}': {}", column, raw, e)))
}

fn parse_optional_decimal(column: &str, raw: Option<String>) -> Result<Option<Decimal>, StoreError> {
    raw.map(|r| parse_decimal(column, &r)).transpose()
}

fn parse_side(raw: &str) -> Result<PositionSide, StoreError> {
    match raw {
        "LONG" => Ok(PositionSide::Long),
        "SHORT" => Ok(PositionSide::Short),
        other => Err(StoreError::Parse(format!("side '{}'", other))),
    }
}

fn parse_subaccount_id(raw: &str) -> Result<SubaccountId, StoreError> {
    Uuid::parse_str(raw)
        .map(SubaccountId)
        .map_err(|e| StoreError::Parse(format!("subaccount id '{}': {}", raw, e)))
}

fn ms_to_datetime(column: &str, ms: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StoreError::Parse(format!("{} {} out of range", column, ms)))
}

fn height(raw: i64) -> BlockHeight {
    BlockHeight::new(raw.max(0) as u64)
}

fn height_bound(at: FundingIndexAt) -> i64 {
    match at {
        FundingIndexAt::Height(h) => h.as_u64().min(i64::MAX as u64) as i64,
        FundingIndexAt::Latest => i64::MAX,
    }
}

#[async_trait]
impl LedgerStore for Repository {
    async fn subaccount(&self, id: &SubaccountId) -> Result<Option<Subaccount>, StoreError> {
        self.query_subaccount(id).await
    }

    async fn list_open_and_closed_positions(
        &self,
        id: &SubaccountId,
    ) -> Result<Vec<PerpetualPosition>, StoreError> {
        self.query_perpetual_positions(id).await
    }

    async fn list_asset_positions(
        &self,
        id: &SubaccountId,
    ) -> Result<Vec<AssetPosition>, StoreError> {
        self.query_asset_positions(id).await
    }

    async fn funding_index_at(
        &self,
        perpetual_id: PerpetualId,
        at: FundingIndexAt,
    ) -> Result<Option<Decimal>, StoreError> {
        self.query_funding_index(perpetual_id, at).await
    }

    async fn funding_index_map(&self, at: FundingIndexAt) -> Result<FundingIndexMap, StoreError> {
        self.query_funding_index_map(at).await
    }

    async fn perpetual_markets(&self) -> Result<Vec<PerpetualMarket>, StoreError> {
        self.query_perpetual_markets().await
    }

    async fn liquidity_tiers(&self) -> Result<Vec<LiquidityTier>, StoreError> {
        self.query_liquidity_tiers().await
    }

    async fn pnl_ticks(
        &self,
        id: &SubaccountId,
        range: &TimeRange,
    ) -> Result<Vec<PnlTick>, StoreError> {
        self.query_pnl_ticks(id, range).await
    }

    async fn latest_block(&self) -> Result<Option<Block>, StoreError> {
        self.query_latest_block().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_reports_column() {
        let err = parse_decimal("equity", "12x").unwrap_err();
        assert!(err.to_string().contains("equity '12x'"));
        assert_eq!(parse_decimal("equity", "1.50").unwrap(), Decimal::from_str_canonical("1.5").unwrap());
    }

    #[test]
    fn test_ms_to_datetime() {
        let dt = ms_to_datetime("created_at", 1_672_531_200_000).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_side() {
        assert_eq!(parse_side("LONG").unwrap(), PositionSide::Long);
        assert!(parse_side("long").is_err());
    }
}
