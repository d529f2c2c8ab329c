//! Unsettled funding per open position, netted into the quote-asset balance.
//!
//! Funding owed since a position's last settlement is
//! `size × (lastAppliedIndex − latestIndex)`: a LONG loses as the index rises,
//! a SHORT gains. Every function here is pure; inputs are never mutated.

use crate::domain::{
    AssetPosition, AssetPositionsMap, Decimal, FundingIndexMap, PerpetualPosition,
    PositionStatus, Subaccount,
};
use crate::error::ValuationError;
use serde::Serialize;

/// A position paired with the funding it has accrued but not yet settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionWithFunding {
    #[serde(flatten)]
    pub position: PerpetualPosition,
    pub unsettled_funding: Decimal,
}

impl PositionWithFunding {
    pub fn new(position: PerpetualPosition) -> Self {
        Self {
            position,
            unsettled_funding: Decimal::zero(),
        }
    }

    /// Settled plus unsettled funding.
    pub fn net_funding(&self) -> Decimal {
        self.position.settled_funding + self.unsettled_funding
    }
}

pub fn initialize_with_funding(positions: &[PerpetualPosition]) -> Vec<PositionWithFunding> {
    positions
        .iter()
        .cloned()
        .map(PositionWithFunding::new)
        .collect()
}

/// Funding accrued by one OPEN position between its last-applied index and the latest index.
///
/// # Errors
/// `InvariantViolation` if the position is not open or its size sign disagrees with its side.
pub fn unsettled_funding(
    position: &PerpetualPosition,
    latest: &FundingIndexMap,
    last_applied: &FundingIndexMap,
) -> Result<Decimal, ValuationError> {
    match position.status {
        PositionStatus::Open => {
            check_size_sign(position)?;
            let id = position.perpetual_id;
            Ok(position.size * (last_applied.get(id) - latest.get(id)))
        }
        PositionStatus::Closed | PositionStatus::Liquidated => {
            Err(ValuationError::InvariantViolation(format!(
                "{} position on perpetual {} passed to funding settlement",
                position.status, position.perpetual_id
            )))
        }
    }
}

/// Recompute unsettled funding for every OPEN position.
///
/// CLOSED and LIQUIDATED positions are returned verbatim.
pub fn settle_positions(
    positions: &[PositionWithFunding],
    latest: &FundingIndexMap,
    last_applied: &FundingIndexMap,
) -> Result<Vec<PositionWithFunding>, ValuationError> {
    positions
        .iter()
        .map(|entry| match entry.position.status {
            PositionStatus::Open => Ok(PositionWithFunding {
                position: entry.position.clone(),
                unsettled_funding: unsettled_funding(&entry.position, latest, last_applied)?,
            }),
            PositionStatus::Closed | PositionStatus::Liquidated => Ok(entry.clone()),
        })
        .collect()
}

/// Sum of unsettled funding across the OPEN positions in `positions`.
pub fn total_unsettled_funding(
    positions: &[PerpetualPosition],
    latest: &FundingIndexMap,
    last_applied: &FundingIndexMap,
) -> Result<Decimal, ValuationError> {
    let mut total = Decimal::zero();
    for position in positions.iter().filter(|p| p.is_open()) {
        total += unsettled_funding(position, latest, last_applied)?;
    }
    Ok(total)
}

/// Asset positions after netting unsettled funding into the quote balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteAdjustment {
    pub asset_positions: AssetPositionsMap,
    /// Signed quote balance after the adjustment.
    pub adjusted_quote_size: Decimal,
}

/// Net `unsettled` into the quote-asset position of `asset_positions`.
///
/// A missing quote position is created; one that nets to exactly zero is removed.
pub fn adjust_quote_position(
    asset_positions: &AssetPositionsMap,
    quote_symbol: &str,
    unsettled: Decimal,
    owner: &Subaccount,
) -> QuoteAdjustment {
    let mut adjusted = asset_positions.clone();
    let existing = asset_positions.get(quote_symbol);
    let current = existing
        .map(AssetPosition::signed_size)
        .unwrap_or_default();
    let adjusted_size = current + unsettled;

    if adjusted_size.is_zero() {
        adjusted.remove(quote_symbol);
    } else {
        let (subaccount_id, subaccount_number) = existing
            .map(|p| (p.subaccount_id, p.subaccount_number))
            .unwrap_or((owner.id, owner.subaccount_number));
        adjusted.insert(
            quote_symbol.to_string(),
            AssetPosition::from_signed(subaccount_id, subaccount_number, quote_symbol, adjusted_size),
        );
    }

    QuoteAdjustment {
        asset_positions: adjusted,
        adjusted_quote_size: adjusted_size,
    }
}

fn check_size_sign(position: &PerpetualPosition) -> Result<(), ValuationError> {
    if position.side.agrees_with(position.size) {
        Ok(())
    } else {
        Err(ValuationError::InvariantViolation(format!(
            "position on perpetual {} has side {} but size {}",
            position.perpetual_id, position.side, position.size
        )))
    }
}
