//! Market and liquidity-tier reference data.
//!
//! Computations read one immutable [`ReferenceSnapshot`] for their whole
//! duration. The [`ReferenceCache`] swaps in a freshly built snapshot
//! atomically, so readers never observe a partially refreshed generation.

use crate::datasource::{LedgerStore, StoreError};
use crate::domain::{LiquidityTier, LiquidityTierId, PerpetualId, PerpetualMarket, Ticker};
use crate::error::{ReferenceKind, ValuationError};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

pub mod refresher;

pub use refresher::spawn_refresher;

/// One consistent generation of markets and tiers.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSnapshot {
    generation: u64,
    loaded_at: Option<DateTime<Utc>>,
    markets: BTreeMap<PerpetualId, PerpetualMarket>,
    tiers: BTreeMap<LiquidityTierId, LiquidityTier>,
    by_ticker: HashMap<Ticker, PerpetualId>,
}

impl ReferenceSnapshot {
    pub fn new(markets: Vec<PerpetualMarket>, tiers: Vec<LiquidityTier>) -> Self {
        let by_ticker = markets
            .iter()
            .map(|m| (m.ticker.clone(), m.perpetual_id))
            .collect();
        Self {
            generation: 0,
            loaded_at: None,
            markets: markets.into_iter().map(|m| (m.perpetual_id, m)).collect(),
            tiers: tiers.into_iter().map(|t| (t.id, t)).collect(),
            by_ticker,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    pub fn market(&self, id: PerpetualId) -> Result<&PerpetualMarket, ValuationError> {
        self.markets
            .get(&id)
            .ok_or_else(|| ValuationError::missing(ReferenceKind::PerpetualMarket, id))
    }

    pub fn tier(&self, id: LiquidityTierId) -> Result<&LiquidityTier, ValuationError> {
        self.tiers
            .get(&id)
            .ok_or_else(|| ValuationError::missing(ReferenceKind::LiquidityTier, id))
    }

    pub fn market_by_ticker(&self, ticker: &Ticker) -> Result<&PerpetualMarket, ValuationError> {
        let id = self
            .by_ticker
            .get(ticker)
            .ok_or_else(|| ValuationError::missing(ReferenceKind::Ticker, ticker))?;
        self.market(*id)
    }

    /// Market of a perpetual together with its liquidity tier.
    pub fn market_and_tier(
        &self,
        id: PerpetualId,
    ) -> Result<(&PerpetualMarket, &LiquidityTier), ValuationError> {
        let market = self.market(id)?;
        let tier = self.tier(market.liquidity_tier_id)?;
        Ok((market, tier))
    }

    pub fn markets(&self) -> impl Iterator<Item = &PerpetualMarket> {
        self.markets.values()
    }

    pub fn tiers(&self) -> impl Iterator<Item = &LiquidityTier> {
        self.tiers.values()
    }
}

/// Atomically swappable handle to the current [`ReferenceSnapshot`].
#[derive(Debug)]
pub struct ReferenceCache {
    current: ArcSwap<ReferenceSnapshot>,
    generations: AtomicU64,
}

impl Default for ReferenceCache {
    fn default() -> Self {
        Self::new(ReferenceSnapshot::default())
    }
}

impl ReferenceCache {
    pub fn new(initial: ReferenceSnapshot) -> Self {
        Self {
            generations: AtomicU64::new(initial.generation),
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// Snapshot to use for one whole computation.
    pub fn load(&self) -> Arc<ReferenceSnapshot> {
        self.current.load_full()
    }

    /// Publish a new generation. Returns its generation number.
    pub fn publish(&self, mut snapshot: ReferenceSnapshot) -> u64 {
        let generation = self.generations.fetch_add(1, Ordering::AcqRel) + 1;
        snapshot.generation = generation;
        snapshot.loaded_at = Some(Utc::now());
        self.current.store(Arc::new(snapshot));
        generation
    }

    /// Load every market and tier from `store` and publish them as one generation.
    ///
    /// # Errors
    /// Returns the store error and leaves the current snapshot in place.
    pub async fn refresh(&self, store: &dyn LedgerStore) -> Result<u64, StoreError> {
        let markets = store.perpetual_markets().await?;
        let tiers = store.liquidity_tiers().await?;
        let (market_count, tier_count) = (markets.len(), tiers.len());
        let generation = self.publish(ReferenceSnapshot::new(markets, tiers));
        info!(generation, market_count, tier_count, "Published reference snapshot");
        Ok(generation)
    }
}
