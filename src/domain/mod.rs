//! Domain types for the valuation layer.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: Address, Ticker, PerpetualId, BlockHeight, PositionSide
//! - Ledger row types: positions, asset positions, funding index updates, PnL ticks
//! - Reference data: perpetual markets and liquidity tiers
//! - Subaccount addressing (parent/child numbering) and vault configuration

pub mod asset;
pub mod decimal;
pub mod funding;
pub mod market;
pub mod pnl_tick;
pub mod position;
pub mod primitives;
pub mod subaccount;
pub mod vault;

pub use asset::{AssetPosition, AssetPositionsMap};
pub use decimal::Decimal;
pub use funding::{FundingIndexAt, FundingIndexMap, FundingIndexUpdate};
pub use market::{LiquidityTier, PerpetualMarket};
pub use pnl_tick::{Block, PnlTick, TimeRange};
pub use position::{EventId, PerpetualPosition, PositionStatus};
pub use primitives::{Address, BlockHeight, LiquidityTierId, PerpetualId, PositionSide, Ticker};
pub use subaccount::{
    child_subaccount_ids, child_subaccount_numbers, parent_subaccount_number, Subaccount,
    SubaccountId, CHILD_SUBACCOUNT_MULTIPLIER, MAX_PARENT_SUBACCOUNTS,
};
pub use vault::{Vault, VAULT_SUBACCOUNT_NUMBER};
