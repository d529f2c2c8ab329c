//! Markets, liquidity tiers and the funding-index log.

use crate::datasource::StoreError;
use crate::domain::{
    Decimal, FundingIndexAt, FundingIndexMap, LiquidityTier, LiquidityTierId,
    PerpetualId, PerpetualMarket, Ticker,
};
use sqlx::Row;

use super::{height_bound, parse_decimal, parse_optional_decimal, Repository};

impl Repository {
    pub(super) async fn query_perpetual_markets(&self) -> Result<Vec<PerpetualMarket>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT perpetual_id, ticker, clob_pair_id, liquidity_tier_id,
                   oracle_price, tick_size, step_size
            FROM perpetual_markets
            ORDER BY perpetual_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(PerpetualMarket {
                    perpetual_id: PerpetualId(row.get::<i64, _>("perpetual_id") as u32),
                    ticker: Ticker::new(row.get::<String, _>("ticker")),
                    clob_pair_id: row.get::<i64, _>("clob_pair_id") as u32,
                    liquidity_tier_id: LiquidityTierId(row.get::<i64, _>("liquidity_tier_id") as u32),
                    oracle_price: parse_decimal("oracle_price", &row.get::<String, _>("oracle_price"))?,
                    tick_size: parse_decimal("tick_size", &row.get::<String, _>("tick_size"))?,
                    step_size: parse_decimal("step_size", &row.get::<String, _>("step_size"))?,
                })
            })
            .collect()
    }

    pub(super) async fn query_liquidity_tiers(&self) -> Result<Vec<LiquidityTier>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, initial_margin_ppm, maintenance_fraction_ppm,
                   base_position_notional, step_notional,
                   open_interest_lower_cap, open_interest_upper_cap
            FROM liquidity_tiers
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(LiquidityTier {
                    id: LiquidityTierId(row.get::<i64, _>("id") as u32),
                    name: row.get::<String, _>("name"),
                    initial_margin_ppm: row.get::<i64, _>("initial_margin_ppm") as u32,
                    maintenance_fraction_ppm: row.get::<i64, _>("maintenance_fraction_ppm") as u32,
                    base_position_notional: parse_decimal(
                        "base_position_notional",
                        &row.get::<String, _>("base_position_notional"),
                    )?,
                    step_notional: parse_decimal("step_notional", &row.get::<String, _>("step_notional"))?,
                    open_interest_lower_cap: parse_optional_decimal(
                        "open_interest_lower_cap",
                        row.get::<Option<String>, _>("open_interest_lower_cap"),
                    )?,
                    open_interest_upper_cap: parse_optional_decimal(
                        "open_interest_upper_cap",
                        row.get::<Option<String>, _>("open_interest_upper_cap"),
                    )?,
                })
            })
            .collect()
    }

    pub(super) async fn query_funding_index(
        &self,
        perpetual_id: PerpetualId,
        at: FundingIndexAt,
    ) -> Result<Option<Decimal>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT funding_index
            FROM funding_index_updates
            WHERE perpetual_id = ? AND effective_at_height <= ?
            ORDER BY effective_at_height DESC
            LIMIT 1
            "#,
        )
        .bind(perpetual_id.0 as i64)
        .bind(height_bound(at))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| parse_decimal("funding_index", &row.get::<String, _>("funding_index")))
            .transpose()
    }

    pub(super) async fn query_funding_index_map(
        &self,
        at: FundingIndexAt,
    ) -> Result<FundingIndexMap, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT f.perpetual_id, f.funding_index
            FROM funding_index_updates f
            JOIN (
                SELECT perpetual_id, MAX(effective_at_height) AS height
                FROM funding_index_updates
                WHERE effective_at_height <= ?
                GROUP BY perpetual_id
            ) latest
              ON f.perpetual_id = latest.perpetual_id
             AND f.effective_at_height = latest.height
            "#,
        )
        .bind(height_bound(at))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok((
                    PerpetualId(row.get::<i64, _>("perpetual_id") as u32),
                    parse_decimal("funding_index", &row.get::<String, _>("funding_index"))?,
                ))
            })
            .collect()
    }
}
