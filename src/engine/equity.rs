//! Single-subaccount valuation: equity, free collateral and per-position PnL.

use crate::domain::{
    AssetPosition, AssetPositionsMap, BlockHeight, Decimal, FundingIndexMap, PerpetualId,
    PerpetualPosition, PositionSide, PositionStatus, Subaccount, SubaccountId, Ticker,
};
use crate::engine::funding::{
    adjust_quote_position, initialize_with_funding, settle_positions, PositionWithFunding,
};
use crate::engine::margin::{position_risk, MarginRequirement};
use crate::error::ValuationError;
use crate::reference::ReferenceSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Raw ledger rows for one subaccount plus the funding indices to settle against.
#[derive(Debug, Clone, Copy)]
pub struct SubaccountLedger<'a> {
    pub subaccount: &'a Subaccount,
    pub positions: &'a [PerpetualPosition],
    pub asset_positions: &'a [AssetPosition],
    /// Indices at the subaccount's last settlement.
    pub last_applied: &'a FundingIndexMap,
    pub latest: &'a FundingIndexMap,
}

/// One valued perpetual position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionView {
    pub ticker: Ticker,
    pub perpetual_id: PerpetualId,
    pub status: PositionStatus,
    pub side: PositionSide,
    pub size: Decimal,
    pub max_size: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Option<Decimal>,
    pub sum_open: Decimal,
    pub sum_close: Decimal,
    pub settled_funding: Decimal,
    pub unsettled_funding: Decimal,
    pub net_funding: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub signed_notional: Decimal,
    pub margin: MarginRequirement,
    pub created_at: DateTime<Utc>,
    pub created_at_height: BlockHeight,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_at_height: Option<BlockHeight>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubaccountState {
    pub subaccount_id: SubaccountId,
    pub address: String,
    pub subaccount_number: u32,
    pub equity: Decimal,
    pub free_collateral: Decimal,
    /// Sum of margin requirements over open positions.
    pub margin: MarginRequirement,
    pub positions: Vec<PositionView>,
    pub asset_positions: Vec<AssetPosition>,
    pub updated_at_height: BlockHeight,
}

/// Keep only the most recent position per perpetual, ordered newest event first.
pub fn latest_positions(positions: &[PerpetualPosition]) -> Vec<PerpetualPosition> {
    let mut latest: BTreeMap<PerpetualId, &PerpetualPosition> = BTreeMap::new();
    for position in positions {
        match latest.get(&position.perpetual_id) {
            Some(current) if current.last_event_id >= position.last_event_id => {}
            _ => {
                latest.insert(position.perpetual_id, position);
            }
        }
    }
    let mut out: Vec<PerpetualPosition> = latest.into_values().cloned().collect();
    out.sort_by(|a, b| b.last_event_id.cmp(&a.last_event_id));
    out
}

/// Realized PnL: closed-trade price difference on `sum_close` plus net funding.
pub fn realized_pnl(entry: &PositionWithFunding) -> Decimal {
    let position = &entry.position;
    let exit = position.exit_price.unwrap_or_default();
    let price_diff = match position.side {
        PositionSide::Long => exit - position.entry_price,
        PositionSide::Short => position.entry_price - exit,
    };
    price_diff * position.sum_close + entry.net_funding()
}

pub fn unrealized_pnl(position: &PerpetualPosition, oracle_price: Decimal) -> Decimal {
    position.size * (oracle_price - position.entry_price)
}

/// Value one subaccount.
///
/// Funding is settled for OPEN positions and netted into the `quote_symbol`
/// balance before equity is summed. Only the quote balance counts toward
/// equity; other assets are listed but carry no value.
///
/// # Errors
/// `MissingReferenceData` if a position's market or tier is absent from
/// `reference`; `InvariantViolation` on inconsistent position rows.
pub fn value_subaccount(
    ledger: SubaccountLedger<'_>,
    reference: &ReferenceSnapshot,
    quote_symbol: &str,
) -> Result<SubaccountState, ValuationError> {
    let positions = latest_positions(ledger.positions);
    let settled = settle_positions(
        &initialize_with_funding(&positions),
        ledger.latest,
        ledger.last_applied,
    )?;

    let total_unsettled: Decimal = settled
        .iter()
        .filter(|p| p.position.is_open())
        .map(|p| p.unsettled_funding)
        .sum();

    let assets: AssetPositionsMap = ledger
        .asset_positions
        .iter()
        .map(|a| (a.symbol.clone(), a.clone()))
        .collect();
    let adjusted = adjust_quote_position(&assets, quote_symbol, total_unsettled, ledger.subaccount);

    let mut equity = Decimal::zero();
    let mut initial = Decimal::zero();
    let mut maintenance = Decimal::zero();
    let mut views = Vec::with_capacity(settled.len());

    for entry in &settled {
        let view = value_position(entry, reference)?;
        match entry.position.status {
            PositionStatus::Open => {
                equity += view.signed_notional;
                initial += view.margin.initial;
                maintenance += view.margin.maintenance;
            }
            PositionStatus::Closed | PositionStatus::Liquidated => {}
        }
        views.push(view);
    }

    equity += adjusted.adjusted_quote_size;

    let asset_positions: Vec<AssetPosition> = adjusted
        .asset_positions
        .into_values()
        .filter(|a| !a.size.is_zero())
        .collect();

    Ok(SubaccountState {
        subaccount_id: ledger.subaccount.id,
        address: ledger.subaccount.address.to_string(),
        subaccount_number: ledger.subaccount.subaccount_number,
        equity,
        free_collateral: equity - initial,
        margin: MarginRequirement {
            initial,
            maintenance,
        },
        positions: views,
        asset_positions,
        updated_at_height: ledger.subaccount.updated_at_height,
    })
}

fn value_position(
    entry: &PositionWithFunding,
    reference: &ReferenceSnapshot,
) -> Result<PositionView, ValuationError> {
    let position = &entry.position;
    let (market, tier) = reference.market_and_tier(position.perpetual_id)?;

    let (signed_notional, margin) = match position.status {
        PositionStatus::Open => {
            let risk = position_risk(position.size, market.oracle_price, tier);
            (risk.signed_notional, risk.requirement)
        }
        PositionStatus::Closed | PositionStatus::Liquidated => (
            Decimal::zero(),
            MarginRequirement {
                initial: Decimal::zero(),
                maintenance: Decimal::zero(),
            },
        ),
    };

    Ok(PositionView {
        ticker: market.ticker.clone(),
        perpetual_id: position.perpetual_id,
        status: position.status,
        side: position.side,
        size: position.size,
        max_size: position.max_size,
        entry_price: position.entry_price,
        exit_price: position.exit_price,
        sum_open: position.sum_open,
        sum_close: position.sum_close,
        settled_funding: position.settled_funding,
        unsettled_funding: entry.unsettled_funding,
        net_funding: entry.net_funding(),
        realized_pnl: realized_pnl(entry),
        unrealized_pnl: unrealized_pnl(position, market.oracle_price),
        signed_notional,
        margin,
        created_at: position.created_at,
        created_at_height: position.created_at_height,
        closed_at: position.closed_at,
        closed_at_height: position.closed_at_height,
    })
}
