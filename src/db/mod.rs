//! SQLite ledger-row store.
//!
//! This module provides:
//! - Database initialization and schema bootstrap
//! - SQLite pragma configuration for a reader sharing the file with a writer
//! - `Repository`, the read-only `LedgerStore` implementation over the ledger tables
//! - `LedgerFixtures`, row writers for seeding test and local databases

pub mod fixtures;
pub mod migrations;
pub mod repo;

pub use fixtures::LedgerFixtures;
pub use migrations::init_db;
pub use repo::Repository;
