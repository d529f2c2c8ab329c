pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod reference;

pub use config::Config;
pub use datasource::{LedgerStore, MockLedgerStore, StoreError};
pub use db::{init_db, LedgerFixtures, Repository};
pub use domain::{
    Address, AssetPosition, Decimal, PerpetualPosition, PnlTick, PositionSide, PositionStatus,
    Subaccount, SubaccountId, Ticker,
};
pub use engine::{GroupPnlSeries, HistoricalPnlSeries, PnlQuery, PnlResolution, SubaccountState};
pub use error::ValuationError;
pub use orchestration::{ServiceSettings, ValuationService};
pub use reference::{ReferenceCache, ReferenceSnapshot};
