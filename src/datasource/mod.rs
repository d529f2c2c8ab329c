//! Ledger-store abstraction: read-only access to rows materialized by the upstream indexer.

use crate::domain::{
    AssetPosition, Block, Decimal, FundingIndexAt, FundingIndexMap, LiquidityTier,
    LiquidityTierId, PerpetualId, PerpetualMarket, PerpetualPosition, PnlTick, Subaccount,
    SubaccountId, TimeRange,
};
use async_trait::async_trait;
use std::fmt;

pub mod mock;

pub use mock::MockLedgerStore;

/// Read-only ledger store.
///
/// Implementations return rows already filtered to the requested subaccount,
/// perpetual, or time range. They never write.
#[async_trait]
pub trait LedgerStore: Send + Sync + fmt::Debug {
    async fn subaccount(&self, id: &SubaccountId) -> Result<Option<Subaccount>, StoreError>;

    /// OPEN and CLOSED positions of one subaccount. LIQUIDATED rows may be included.
    async fn list_open_and_closed_positions(
        &self,
        id: &SubaccountId,
    ) -> Result<Vec<PerpetualPosition>, StoreError>;

    async fn list_asset_positions(&self, id: &SubaccountId)
        -> Result<Vec<AssetPosition>, StoreError>;

    /// Funding index of one perpetual at a height (or the latest), `None` if it has no history.
    async fn funding_index_at(
        &self,
        perpetual_id: PerpetualId,
        at: FundingIndexAt,
    ) -> Result<Option<Decimal>, StoreError>;

    /// Funding indices of every perpetual with history at or before `at`.
    async fn funding_index_map(&self, at: FundingIndexAt) -> Result<FundingIndexMap, StoreError>;

    async fn perpetual_markets(&self) -> Result<Vec<PerpetualMarket>, StoreError>;

    async fn liquidity_tiers(&self) -> Result<Vec<LiquidityTier>, StoreError>;

    async fn market(&self, perpetual_id: PerpetualId) -> Result<Option<PerpetualMarket>, StoreError> {
        Ok(self
            .perpetual_markets()
            .await?
            .into_iter()
            .find(|m| m.perpetual_id == perpetual_id))
    }

    async fn liquidity_tier(&self, id: LiquidityTierId) -> Result<Option<LiquidityTier>, StoreError> {
        Ok(self.liquidity_tiers().await?.into_iter().find(|t| t.id == id))
    }

    /// PnL ticks of one subaccount within `range`, ascending by creation time.
    async fn pnl_ticks(
        &self,
        id: &SubaccountId,
        range: &TimeRange,
    ) -> Result<Vec<PnlTick>, StoreError>;

    async fn latest_block(&self) -> Result<Option<Block>, StoreError>;
}

/// Error type for ledger-store operations.
#[derive(Debug, Clone)]
pub enum StoreError {
    /// Query execution failed.
    Database(String),
    /// A stored row could not be decoded into a domain value.
    Parse(String),
    /// The store cannot serve requests (closed pool, injected failure).
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Database(msg) => write!(f, "Database error: {}", msg),
            StoreError::Parse(msg) => write!(f, "Parse error: {}", msg),
            StoreError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}
