//! Writers for seeding a ledger database in tests and local runs.
//!
//! The valuation path only reads through [`Repository`](super::Repository);
//! these inserts live apart from it so the store itself stays read-only.

use crate::datasource::StoreError;
use crate::domain::{
    AssetPosition, Block, FundingIndexUpdate, LiquidityTier, PerpetualMarket, PerpetualPosition,
    PnlTick, Subaccount,
};
use sqlx::sqlite::SqlitePool;

/// Inserts ledger rows into a database created by [`init_db`](super::init_db).
#[derive(Debug, Clone)]
pub struct LedgerFixtures {
    pool: SqlitePool,
}

impl LedgerFixtures {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerFixtures { pool }
    }

    /// Insert or replace a subaccount row.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn upsert_subaccount(&self, subaccount: &Subaccount) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO subaccounts (id, address, subaccount_number, updated_at_height)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET updated_at_height = excluded.updated_at_height
            "#,
        )
        .bind(subaccount.id.to_string())
        .bind(subaccount.address.as_str())
        .bind(subaccount.subaccount_number as i64)
        .bind(subaccount.updated_at_height.as_u64() as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a position row.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_perpetual_position(
        &self,
        position: &PerpetualPosition,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO perpetual_positions (
                subaccount_id, perpetual_id, side, status, size, max_size,
                entry_price, exit_price, sum_open, sum_close, settled_funding,
                created_at, created_at_height, closed_at, closed_at_height, last_event_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(position.subaccount_id.to_string())
        .bind(position.perpetual_id.0 as i64)
        .bind(position.side.to_string())
        .bind(position.status.as_str())
        .bind(position.size.to_canonical_string())
        .bind(position.max_size.to_canonical_string())
        .bind(position.entry_price.to_canonical_string())
        .bind(position.exit_price.map(|d| d.to_canonical_string()))
        .bind(position.sum_open.to_canonical_string())
        .bind(position.sum_close.to_canonical_string())
        .bind(position.settled_funding.to_canonical_string())
        .bind(position.created_at.timestamp_millis())
        .bind(position.created_at_height.as_u64() as i64)
        .bind(position.closed_at.map(|t| t.timestamp_millis()))
        .bind(position.closed_at_height.map(|h| h.as_u64() as i64))
        .bind(position.last_event_id.to_hex())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert or replace an asset position.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn upsert_asset_position(&self, asset: &AssetPosition) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO asset_positions (subaccount_id, subaccount_number, symbol, side, size)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(subaccount_id, symbol) DO UPDATE SET
                side = excluded.side,
                size = excluded.size
            "#,
        )
        .bind(asset.subaccount_id.to_string())
        .bind(asset.subaccount_number as i64)
        .bind(asset.symbol.as_str())
        .bind(asset.side.to_string())
        .bind(asset.size.to_canonical_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert or replace a market row.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn upsert_perpetual_market(&self, market: &PerpetualMarket) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO perpetual_markets (
                perpetual_id, ticker, clob_pair_id, liquidity_tier_id,
                oracle_price, tick_size, step_size
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(perpetual_id) DO UPDATE SET
                oracle_price = excluded.oracle_price,
                liquidity_tier_id = excluded.liquidity_tier_id
            "#,
        )
        .bind(market.perpetual_id.0 as i64)
        .bind(market.ticker.as_str())
        .bind(market.clob_pair_id as i64)
        .bind(market.liquidity_tier_id.0 as i64)
        .bind(market.oracle_price.to_canonical_string())
        .bind(market.tick_size.to_canonical_string())
        .bind(market.step_size.to_canonical_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert or replace a liquidity tier.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn upsert_liquidity_tier(&self, tier: &LiquidityTier) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO liquidity_tiers (
                id, name, initial_margin_ppm, maintenance_fraction_ppm,
                base_position_notional, step_notional,
                open_interest_lower_cap, open_interest_upper_cap
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(tier.id.0 as i64)
        .bind(tier.name.as_str())
        .bind(tier.initial_margin_ppm as i64)
        .bind(tier.maintenance_fraction_ppm as i64)
        .bind(tier.base_position_notional.to_canonical_string())
        .bind(tier.step_notional.to_canonical_string())
        .bind(tier.open_interest_lower_cap.map(|d| d.to_canonical_string()))
        .bind(tier.open_interest_upper_cap.map(|d| d.to_canonical_string()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Append a funding-index update. Duplicate (perpetual, height) pairs are ignored.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_funding_update(&self, update: &FundingIndexUpdate) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO funding_index_updates (perpetual_id, funding_index, effective_at_height)
            VALUES (?, ?, ?)
            ON CONFLICT(perpetual_id, effective_at_height) DO NOTHING
            "#,
        )
        .bind(update.perpetual_id.0 as i64)
        .bind(update.funding_index.to_canonical_string())
        .bind(update.effective_at_height.as_u64() as i64)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Insert ticks in one transaction; existing (subaccount, created_at) rows are kept.
    ///
    /// # Errors
    /// Returns an error if any insert fails; nothing is written in that case.
    pub async fn insert_pnl_ticks(&self, ticks: &[PnlTick]) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0usize;
        for tick in ticks {
            let result = sqlx::query(
                r#"
                INSERT INTO pnl_ticks (
                    subaccount_id, equity, total_pnl, net_transfers,
                    created_at, block_height, block_time
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(subaccount_id, created_at) DO NOTHING
                "#,
            )
            .bind(tick.subaccount_id.to_string())
            .bind(tick.equity.to_canonical_string())
            .bind(tick.total_pnl.to_canonical_string())
            .bind(tick.net_transfers.to_canonical_string())
            .bind(tick.created_at.timestamp_millis())
            .bind(tick.block_height.as_u64() as i64)
            .bind(tick.block_time.timestamp_millis())
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected() as usize;
        }
        tx.commit().await?;
        Ok(inserted)
    }

    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_block(&self, block: &Block) -> Result<(), StoreError> {
        sqlx::query("INSERT OR IGNORE INTO blocks (height, time) VALUES (?, ?)")
            .bind(block.height.as_u64() as i64)
            .bind(block.time.timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
