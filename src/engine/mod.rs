//! Pure valuation engine.
//!
//! Every function here is synchronous and deterministic over already-fetched
//! rows; none perform I/O.

pub mod equity;
pub mod funding;
pub mod group;
pub mod margin;
pub mod rollup;

pub use equity::{value_subaccount, PositionView, SubaccountLedger, SubaccountState};
pub use funding::{adjust_quote_position, settle_positions, PositionWithFunding, QuoteAdjustment};
pub use group::{aggregate, aggregate_group, GroupPnlSeries, MemberFailure, MemberSeries};
pub use margin::{margin_fraction, position_risk, MarginKind, MarginRequirement};
pub use rollup::{bucket, rollup, HistoricalPnlSeries, PageInfo, Pagination, PnlPoint, PnlQuery, PnlResolution};
