//! Subaccount, perpetual-position and asset-position rows.

use crate::datasource::StoreError;
use crate::domain::{
    Address, AssetPosition, EventId, PerpetualId, PerpetualPosition, PositionStatus, Subaccount,
    SubaccountId,
};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{
    height, ms_to_datetime, parse_decimal, parse_optional_decimal, parse_side,
    parse_subaccount_id, Repository,
};

impl Repository {
    pub(super) async fn query_subaccount(
        &self,
        id: &SubaccountId,
    ) -> Result<Option<Subaccount>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, address, subaccount_number, updated_at_height
            FROM subaccounts
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(Subaccount {
                id: parse_subaccount_id(&row.get::<String, _>("id"))?,
                address: Address::new(row.get::<String, _>("address")),
                subaccount_number: row.get::<i64, _>("subaccount_number") as u32,
                updated_at_height: height(row.get::<i64, _>("updated_at_height")),
            })
        })
        .transpose()
    }

    /// All position rows of a subaccount, newest event first.
    pub(super) async fn query_perpetual_positions(
        &self,
        id: &SubaccountId,
    ) -> Result<Vec<PerpetualPosition>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT subaccount_id, perpetual_id, side, status, size, max_size,
                   entry_price, exit_price, sum_open, sum_close, settled_funding,
                   created_at, created_at_height, closed_at, closed_at_height, last_event_id
            FROM perpetual_positions
            WHERE subaccount_id = ?
            ORDER BY last_event_id DESC
            "#,
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(position_from_row).collect()
    }

    pub(super) async fn query_asset_positions(
        &self,
        id: &SubaccountId,
    ) -> Result<Vec<AssetPosition>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT subaccount_id, subaccount_number, symbol, side, size
            FROM asset_positions
            WHERE subaccount_id = ?
            ORDER BY symbol ASC
            "#,
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(AssetPosition {
                    subaccount_id: parse_subaccount_id(&row.get::<String, _>("subaccount_id"))?,
                    subaccount_number: row.get::<i64, _>("subaccount_number") as u32,
                    symbol: row.get::<String, _>("symbol"),
                    side: parse_side(&row.get::<String, _>("side"))?,
                    size: parse_decimal("size", &row.get::<String, _>("size"))?,
                })
            })
            .collect()
    }
}

fn position_from_row(row: &SqliteRow) -> Result<PerpetualPosition, StoreError> {
    let status_raw: String = row.get("status");
    let status = PositionStatus::parse(&status_raw)
        .ok_or_else(|| StoreError::Parse(format!("status '{}'", status_raw)))?;
    let event_raw: String = row.get("last_event_id");
    let last_event_id = EventId::from_hex(&event_raw)
        .ok_or_else(|| StoreError::Parse(format!("last_event_id '{}'", event_raw)))?;

    Ok(PerpetualPosition {
        subaccount_id: parse_subaccount_id(&row.get::<String, _>("subaccount_id"))?,
        perpetual_id: PerpetualId(row.get::<i64, _>("perpetual_id") as u32),
        side: parse_side(&row.get::<String, _>("side"))?,
        status,
        size: parse_decimal("size", &row.get::<String, _>("size"))?,
        max_size: parse_decimal("max_size", &row.get::<String, _>("max_size"))?,
        entry_price: parse_decimal("entry_price", &row.get::<String, _>("entry_price"))?,
        exit_price: parse_optional_decimal("exit_price", row.get::<Option<String>, _>("exit_price"))?,
        sum_open: parse_decimal("sum_open", &row.get::<String, _>("sum_open"))?,
        sum_close: parse_decimal("sum_close", &row.get::<String, _>("sum_close"))?,
        settled_funding: parse_decimal("settled_funding", &row.get::<String, _>("settled_funding"))?,
        created_at: ms_to_datetime("created_at", row.get::<i64, _>("created_at"))?,
        created_at_height: height(row.get::<i64, _>("created_at_height")),
        closed_at: row
            .get::<Option<i64>, _>("closed_at")
            .map(|ms| ms_to_datetime("closed_at", ms))
            .transpose()?,
        closed_at_height: row.get::<Option<i64>, _>("closed_at_height").map(height),
        last_event_id,
    })
}
