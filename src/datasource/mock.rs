//! In-memory ledger store for tests and demos.

use super::{LedgerStore, StoreError};
use crate::domain::{
    AssetPosition, Block, Decimal, FundingIndexAt, FundingIndexMap, FundingIndexUpdate,
    LiquidityTier, PerpetualId, PerpetualMarket, PerpetualPosition, PnlTick, Subaccount,
    SubaccountId, TimeRange,
};
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Ledger store backed by vectors of predefined rows.
#[derive(Debug, Clone, Default)]
pub struct MockLedgerStore {
    subaccounts: Vec<Subaccount>,
    positions: Vec<PerpetualPosition>,
    asset_positions: Vec<AssetPosition>,
    funding_updates: Vec<FundingIndexUpdate>,
    markets: Vec<PerpetualMarket>,
    tiers: Vec<LiquidityTier>,
    ticks: Vec<PnlTick>,
    latest_block: Option<Block>,
    failing: BTreeSet<SubaccountId>,
    reference_unavailable: bool,
}

impl MockLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subaccount(mut self, subaccount: Subaccount) -> Self {
        self.subaccounts.push(subaccount);
        self
    }

    pub fn with_position(mut self, position: PerpetualPosition) -> Self {
        self.positions.push(position);
        self
    }

    pub fn with_asset_position(mut self, asset: AssetPosition) -> Self {
        self.asset_positions.push(asset);
        self
    }

    pub fn with_funding_update(mut self, update: FundingIndexUpdate) -> Self {
        self.funding_updates.push(update);
        self
    }

    pub fn with_market(mut self, market: PerpetualMarket) -> Self {
        self.markets.push(market);
        self
    }

    pub fn with_tier(mut self, tier: LiquidityTier) -> Self {
        self.tiers.push(tier);
        self
    }

    pub fn with_ticks(mut self, ticks: impl IntoIterator<Item = PnlTick>) -> Self {
        self.ticks.extend(ticks);
        self
    }

    pub fn with_latest_block(mut self, block: Block) -> Self {
        self.latest_block = Some(block);
        self
    }

    /// Every per-subaccount query for `id` fails with `StoreError::Unavailable`.
    pub fn with_failing_subaccount(mut self, id: SubaccountId) -> Self {
        self.failing.insert(id);
        self
    }

    /// Market and tier queries fail with `StoreError::Unavailable`.
    pub fn with_reference_unavailable(mut self) -> Self {
        self.reference_unavailable = true;
        self
    }

    fn check(&self, id: &SubaccountId) -> Result<(), StoreError> {
        if self.failing.contains(id) {
            return Err(StoreError::Unavailable(format!("subaccount {} is failing", id)));
        }
        Ok(())
    }

    fn check_reference(&self) -> Result<(), StoreError> {
        if self.reference_unavailable {
            return Err(StoreError::Unavailable("reference data offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MockLedgerStore {
    async fn subaccount(&self, id: &SubaccountId) -> Result<Option<Subaccount>, StoreError> {
        self.check(id)?;
        Ok(self.subaccounts.iter().find(|s| &s.id == id).cloned())
    }

    async fn list_open_and_closed_positions(
        &self,
        id: &SubaccountId,
    ) -> Result<Vec<PerpetualPosition>, StoreError> {
        self.check(id)?;
        Ok(self
            .positions
            .iter()
            .filter(|p| &p.subaccount_id == id)
            .cloned()
            .collect())
    }

    async fn list_asset_positions(
        &self,
        id: &SubaccountId,
    ) -> Result<Vec<AssetPosition>, StoreError> {
        self.check(id)?;
        Ok(self
            .asset_positions
            .iter()
            .filter(|a| &a.subaccount_id == id)
            .cloned()
            .collect())
    }

    async fn funding_index_at(
        &self,
        perpetual_id: PerpetualId,
        at: FundingIndexAt,
    ) -> Result<Option<Decimal>, StoreError> {
        let relevant: Vec<FundingIndexUpdate> = self
            .funding_updates
            .iter()
            .filter(|u| u.perpetual_id == perpetual_id)
            .cloned()
            .collect();
        let map = FundingIndexMap::from_updates(&relevant, at);
        Ok((!map.is_empty()).then(|| map.get(perpetual_id)))
    }

    async fn funding_index_map(&self, at: FundingIndexAt) -> Result<FundingIndexMap, StoreError> {
        Ok(FundingIndexMap::from_updates(&self.funding_updates, at))
    }

    async fn perpetual_markets(&self) -> Result<Vec<PerpetualMarket>, StoreError> {
        self.check_reference()?;
        Ok(self.markets.clone())
    }

    async fn liquidity_tiers(&self) -> Result<Vec<LiquidityTier>, StoreError> {
        self.check_reference()?;
        Ok(self.tiers.clone())
    }

    async fn pnl_ticks(
        &self,
        id: &SubaccountId,
        range: &TimeRange,
    ) -> Result<Vec<PnlTick>, StoreError> {
        self.check(id)?;
        let mut ticks: Vec<PnlTick> = self
            .ticks
            .iter()
            .filter(|t| &t.subaccount_id == id && range.contains(t))
            .cloned()
            .collect();
        ticks.sort_by_key(|t| (t.created_at, t.block_height));
        Ok(ticks)
    }

    async fn latest_block(&self) -> Result<Option<Block>, StoreError> {
        Ok(self.latest_block)
    }
}
