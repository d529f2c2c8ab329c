use crate::datasource::StoreError;
use thiserror::Error;

/// Kind of reference data a computation failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    PerpetualMarket,
    LiquidityTier,
    Ticker,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceKind::PerpetualMarket => write!(f, "perpetual market"),
            ReferenceKind::LiquidityTier => write!(f, "liquidity tier"),
            ReferenceKind::Ticker => write!(f, "ticker"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ValuationError {
    #[error("Missing reference data: {kind} {id} not found")]
    MissingReferenceData { kind: ReferenceKind, id: String },
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ValuationError {
    pub fn missing(kind: ReferenceKind, id: impl ToString) -> Self {
        ValuationError::MissingReferenceData {
            kind,
            id: id.to_string(),
        }
    }
}
