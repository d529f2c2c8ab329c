//! Request-level orchestration: store reads, one reference snapshot per
//! request, then the pure engine.

pub mod service;

pub use service::{ServiceSettings, ValuationService};
