//! PnL tick and block rows.

use crate::datasource::StoreError;
use crate::domain::{Block, PnlTick, SubaccountId, TimeRange};
use sqlx::Row;

use super::{height, ms_to_datetime, parse_decimal, parse_subaccount_id, Repository};

impl Repository {
    /// Ticks of one subaccount within `range`, ascending by (created_at, block_height).
    pub(super) async fn query_pnl_ticks(
        &self,
        id: &SubaccountId,
        range: &TimeRange,
    ) -> Result<Vec<PnlTick>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT subaccount_id, equity, total_pnl, net_transfers,
                   created_at, block_height, block_time
            FROM pnl_ticks
            WHERE subaccount_id = ?
              AND created_at >= ? AND created_at <= ?
              AND block_height >= ? AND block_height <= ?
            ORDER BY created_at ASC, block_height ASC
            "#,
        )
        .bind(id.to_string())
        .bind(range.created_on_or_after.map_or(i64::MIN, |t| t.timestamp_millis()))
        .bind(range.created_before_or_at.map_or(i64::MAX, |t| t.timestamp_millis()))
        .bind(range.created_on_or_after_height.map_or(0, |h| h.as_u64() as i64))
        .bind(range.created_before_or_at_height.map_or(i64::MAX, |h| h.as_u64() as i64))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(PnlTick {
                    subaccount_id: parse_subaccount_id(&row.get::<String, _>("subaccount_id"))?,
                    equity: parse_decimal("equity", &row.get::<String, _>("equity"))?,
                    total_pnl: parse_decimal("total_pnl", &row.get::<String, _>("total_pnl"))?,
                    net_transfers: parse_decimal("net_transfers", &row.get::<String, _>("net_transfers"))?,
                    created_at: ms_to_datetime("created_at", row.get::<i64, _>("created_at"))?,
                    block_height: height(row.get::<i64, _>("block_height")),
                    block_time: ms_to_datetime("block_time", row.get::<i64, _>("block_time"))?,
                })
            })
            .collect()
    }

    pub(super) async fn query_latest_block(&self) -> Result<Option<Block>, StoreError> {
        let row = sqlx::query("SELECT height, time FROM blocks ORDER BY height DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(Block {
                height: height(row.get::<i64, _>("height")),
                time: ms_to_datetime("time", row.get::<i64, _>("time"))?,
            })
        })
        .transpose()
    }
}
