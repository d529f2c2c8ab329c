use crate::config::Config;
use crate::datasource::LedgerStore;
use crate::domain::{
    child_subaccount_ids, Address, Block, FundingIndexAt, PnlTick, Subaccount, SubaccountId, TimeRange,
    Vault,
};
use crate::engine::equity::{value_subaccount, SubaccountLedger, SubaccountState};
use crate::engine::group::{
    aggregate_group, apply_baseline, filter_incomplete_buckets, with_current_point,
    GroupPnlSeries, MemberFailure, MemberSeries,
};
use crate::engine::rollup::{bucket, rollup, HistoricalPnlSeries, PnlPoint, PnlQuery, PnlResolution};
use crate::error::ValuationError;
use crate::reference::{ReferenceCache, ReferenceSnapshot};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Member series read from the store at once when aggregating a group.
pub const MEMBER_FETCH_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub quote_symbol: String,
    /// Limit applied to PnL queries that give none.
    pub api_limit: u32,
    pub vaults: Vec<Vault>,
    pub vault_pnl_start_date: Option<DateTime<Utc>>,
}

impl From<&Config> for ServiceSettings {
    fn from(config: &Config) -> Self {
        Self {
            quote_symbol: config.quote_symbol.clone(),
            api_limit: config.api_limit,
            vaults: config.vaults.clone(),
            vault_pnl_start_date: config.vault_pnl_start_date,
        }
    }
}

/// Fetches ledger rows, pins one reference snapshot per request and runs the engine.
#[derive(Clone)]
pub struct ValuationService {
    store: Arc<dyn LedgerStore>,
    reference: Arc<ReferenceCache>,
    settings: ServiceSettings,
}

type MemberResult = Result<MemberSeries, MemberFailure>;

impl ValuationService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        reference: Arc<ReferenceCache>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            reference,
            settings,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Current equity, free collateral and positions of one subaccount.
    ///
    /// # Errors
    /// `NotFound` if the subaccount has no ledger row; otherwise any valuation
    /// or store error.
    pub async fn subaccount_state(
        &self,
        address: &Address,
        subaccount_number: u32,
    ) -> Result<SubaccountState, ValuationError> {
        let subaccount = self.require_subaccount(address, subaccount_number).await?;
        let reference = self.reference.load();
        let state = self.value(&subaccount, &reference).await?;
        debug!(
            subaccount = %subaccount.id,
            generation = reference.generation(),
            equity = %state.equity,
            "Valued subaccount"
        );
        Ok(state)
    }

    /// Bucketed PnL history of one subaccount.
    pub async fn historical_pnl(
        &self,
        address: &Address,
        subaccount_number: u32,
        query: PnlQuery,
    ) -> Result<HistoricalPnlSeries, ValuationError> {
        let subaccount = self.require_subaccount(address, subaccount_number).await?;
        let ticks = self.store.pnl_ticks(&subaccount.id, &query.range).await?;
        Ok(rollup(&ticks, &self.with_default_limit(query)))
    }

    /// PnL history summed over the children of a parent subaccount.
    ///
    /// Children whose rows cannot be read are reported in `failures`.
    pub async fn parent_historical_pnl(
        &self,
        address: &Address,
        parent_number: u32,
        query: PnlQuery,
    ) -> Result<GroupPnlSeries, ValuationError> {
        let children = child_subaccount_ids(address, parent_number).ok_or_else(|| {
            ValuationError::InvalidParameter(format!(
                "subaccount {} is not a parent subaccount",
                parent_number
            ))
        })?;
        info!(address = %address, parent_number, "Aggregating parent subaccount PnL");

        let unpaged = PnlQuery {
            pagination: Default::default(),
            ..query
        };
        let results: Vec<MemberResult> = stream::iter(children)
            .map(|id| self.member_series(id, None, unpaged))
            .buffered(MEMBER_FETCH_CONCURRENCY)
            .collect()
            .await;

        let mut group = collect_group(results, query.resolution);
        let query = self.with_default_limit(query);
        let (points, page) = query.pagination.apply(group.pooled.points);
        group.pooled = HistoricalPnlSeries { points, page };
        Ok(group)
    }

    /// Pooled and per-market PnL of the configured vaults.
    ///
    /// Vaults whose ticker has no market are skipped; members that fail are
    /// reported in `failures`.
    pub async fn vaults_historical_pnl(
        &self,
        resolution: PnlResolution,
    ) -> Result<GroupPnlSeries, ValuationError> {
        let reference = self.reference.load();
        let vaults: Vec<&Vault> = self
            .settings
            .vaults
            .iter()
            .filter(|vault| match reference.market_by_ticker(&vault.ticker) {
                Ok(_) => true,
                Err(e) => {
                    warn!(address = %vault.address, ticker = %vault.ticker, error = %e, "Skipping vault mapping");
                    false
                }
            })
            .collect();
        info!(vaults = vaults.len(), "Aggregating vault PnL");

        let latest_block = self.store.latest_block().await?;
        let results: Vec<MemberResult> = stream::iter(&vaults)
            .map(|vault| self.vault_member_series(vault, &reference, latest_block, resolution))
            .buffered(MEMBER_FETCH_CONCURRENCY)
            .collect()
            .await;

        let mut group = collect_group(results, resolution);
        let created: Vec<DateTime<Utc>> = vaults.iter().filter_map(|v| v.created_at).collect();
        group.pooled = filter_incomplete_buckets(group.pooled, &created);
        Ok(group)
    }

    async fn require_subaccount(
        &self,
        address: &Address,
        subaccount_number: u32,
    ) -> Result<Subaccount, ValuationError> {
        let id = SubaccountId::new(address, subaccount_number);
        self.store.subaccount(&id).await?.ok_or_else(|| {
            ValuationError::NotFound(format!(
                "no subaccount found with address {} and subaccountNumber {}",
                address, subaccount_number
            ))
        })
    }

    async fn value(
        &self,
        subaccount: &Subaccount,
        reference: &ReferenceSnapshot,
    ) -> Result<SubaccountState, ValuationError> {
        let (positions, assets, last_applied, latest) = tokio::try_join!(
            self.store.list_open_and_closed_positions(&subaccount.id),
            self.store.list_asset_positions(&subaccount.id),
            self.store
                .funding_index_map(FundingIndexAt::Height(subaccount.updated_at_height)),
            self.store.funding_index_map(FundingIndexAt::Latest),
        )?;

        value_subaccount(
            SubaccountLedger {
                subaccount,
                positions: &positions,
                asset_positions: &assets,
                last_applied: &last_applied,
                latest: &latest,
            },
            reference,
            &self.settings.quote_symbol,
        )
    }

    async fn member_series(&self, id: SubaccountId, label: Option<String>, query: PnlQuery) -> MemberResult {
        match self.store.pnl_ticks(&id, &query.range).await {
            Ok(ticks) => Ok(MemberSeries {
                subaccount_id: id,
                label,
                points: rollup(&ticks, &query).points,
            }),
            Err(e) => Err(member_failure(id, label, e.into())),
        }
    }

    async fn vault_member_series(
        &self,
        vault: &Vault,
        reference: &ReferenceSnapshot,
        latest_block: Option<Block>,
        resolution: PnlResolution,
    ) -> MemberResult {
        let id = vault.subaccount_id();
        let label = Some(vault.ticker.to_string());
        self.vault_points(vault, reference, latest_block, resolution)
            .await
            .map(|points| MemberSeries {
                subaccount_id: id,
                label: label.clone(),
                points,
            })
            .map_err(|e| member_failure(id, label, e))
    }

    async fn vault_points(
        &self,
        vault: &Vault,
        reference: &ReferenceSnapshot,
        latest_block: Option<Block>,
        resolution: PnlResolution,
    ) -> Result<Vec<PnlPoint>, ValuationError> {
        let id = vault.subaccount_id();
        let ticks: Vec<PnlTick> = self.store.pnl_ticks(&id, &TimeRange::default()).await?;
        let mut points: Vec<PnlPoint> = ticks.iter().map(PnlPoint::from).collect();

        if let Some(start) = self.settings.vault_pnl_start_date {
            points = apply_baseline(&points, start);
        }

        if let (Some(block), Some(subaccount)) = (latest_block, self.store.subaccount(&id).await?) {
            let state = self.value(&subaccount, reference).await?;
            points = with_current_point(&points, state.equity, block);
        }

        Ok(bucket(points, resolution))
    }

    fn with_default_limit(&self, mut query: PnlQuery) -> PnlQuery {
        if query.pagination.limit.is_none() {
            query.pagination.limit = Some(self.settings.api_limit);
        }
        query
    }
}

fn member_failure(id: SubaccountId, label: Option<String>, error: ValuationError) -> MemberFailure {
    warn!(subaccount = %id, error = %error, "Group member failed; continuing without it");
    MemberFailure {
        subaccount_id: id,
        label,
        error: error.to_string(),
    }
}

fn collect_group(results: Vec<MemberResult>, resolution: PnlResolution) -> GroupPnlSeries {
    let mut members = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(member) => members.push(member),
            Err(failure) => failures.push(failure),
        }
    }
    let mut group = aggregate_group(&members, resolution);
    group.failures = failures;
    group
}
