//! Vaults: externally configured subaccounts pooled into one product.

use crate::domain::{Address, SubaccountId, Ticker};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subaccount number that holds a vault's trading position.
pub const VAULT_SUBACCOUNT_NUMBER: u32 = 0;

/// One configured vault, tied to a single market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub address: Address,
    pub ticker: Ticker,
    pub created_at: Option<DateTime<Utc>>,
}

impl Vault {
    pub fn new(address: Address, ticker: Ticker) -> Self {
        Self {
            address,
            ticker,
            created_at: None,
        }
    }

    pub fn subaccount_id(&self) -> SubaccountId {
        SubaccountId::new(&self.address, VAULT_SUBACCOUNT_NUMBER)
    }
}
