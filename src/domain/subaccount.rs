//! Subaccount identity and the parent/child numbering scheme.

use crate::domain::{Address, BlockHeight};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subaccount numbers below this value are parent subaccounts.
pub const MAX_PARENT_SUBACCOUNTS: u32 = 128;

/// Number of child subaccounts addressable under one parent.
pub const CHILD_SUBACCOUNT_MULTIPLIER: u32 = 1000;

const SUBACCOUNT_NAMESPACE: Uuid = Uuid::from_u128(0x0f9d_a948_a6fb_4c45_9edc_4685_c3f3_317d);

/// Deterministic subaccount identifier derived from (address, number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubaccountId(pub Uuid);

impl SubaccountId {
    pub fn new(address: &Address, subaccount_number: u32) -> Self {
        let name = format!("{}-{}", address.as_str(), subaccount_number);
        SubaccountId(Uuid::new_v5(&SUBACCOUNT_NAMESPACE, name.as_bytes()))
    }
}

impl std::fmt::Display for SubaccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A trading subaccount as recorded by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subaccount {
    pub id: SubaccountId,
    pub address: Address,
    pub subaccount_number: u32,
    /// Height of the last settlement event; funding indices at this height
    /// are the "last applied" indices for every open position.
    pub updated_at_height: BlockHeight,
}

impl Subaccount {
    pub fn new(address: Address, subaccount_number: u32, updated_at_height: BlockHeight) -> Self {
        Self {
            id: SubaccountId::new(&address, subaccount_number),
            address,
            subaccount_number,
            updated_at_height,
        }
    }

    pub fn is_parent(&self) -> bool {
        is_parent_subaccount(self.subaccount_number)
    }
}

pub fn is_parent_subaccount(subaccount_number: u32) -> bool {
    subaccount_number < MAX_PARENT_SUBACCOUNTS
}

/// Parent number that a (parent or child) subaccount number belongs to.
pub fn parent_subaccount_number(subaccount_number: u32) -> u32 {
    subaccount_number % MAX_PARENT_SUBACCOUNTS
}

/// All subaccount numbers belonging to `parent`, the parent itself first.
///
/// Returns `None` when `parent` is not a parent subaccount number.
pub fn child_subaccount_numbers(parent: u32) -> Option<Vec<u32>> {
    if !is_parent_subaccount(parent) {
        return None;
    }
    Some(
        (0..CHILD_SUBACCOUNT_MULTIPLIER)
            .map(|i| MAX_PARENT_SUBACCOUNTS * i + parent)
            .collect(),
    )
}

pub fn child_subaccount_ids(address: &Address, parent: u32) -> Option<Vec<SubaccountId>> {
    child_subaccount_numbers(parent).map(|numbers| {
        numbers
            .into_iter()
            .map(|n| SubaccountId::new(address, n))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_numbers_for_parent_zero() {
        let children = child_subaccount_numbers(0).unwrap();
        assert_eq!(children.len(), CHILD_SUBACCOUNT_MULTIPLIER as usize);
        assert_eq!(children[0], 0);
        assert_eq!(children[1], 128);
        assert_eq!(children[999], 128 * 999);
    }

    #[test]
    fn test_child_numbers_for_last_parent() {
        let children = child_subaccount_numbers(127).unwrap();
        assert_eq!(children[0], 127);
        assert_eq!(children[1], 255);
        assert!(children.iter().all(|n| parent_subaccount_number(*n) == 127));
    }

    #[test]
    fn test_child_numbers_rejects_non_parent() {
        assert!(child_subaccount_numbers(128).is_none());
    }

    #[test]
    fn test_subaccount_id_is_deterministic() {
        let addr = Address::new("dydx1abc");
        assert_eq!(SubaccountId::new(&addr, 0), SubaccountId::new(&addr, 0));
        assert_ne!(SubaccountId::new(&addr, 0), SubaccountId::new(&addr, 1));
        assert_ne!(
            SubaccountId::new(&addr, 0),
            SubaccountId::new(&Address::new("dydx1abd"), 0)
        );
    }

    #[test]
    fn test_is_parent() {
        let parent = Subaccount::new(Address::new("dydx1abc"), 3, BlockHeight::new(1));
        let child = Subaccount::new(Address::new("dydx1abc"), 131, BlockHeight::new(1));
        assert!(parent.is_parent());
        assert!(!child.is_parent());
        assert_eq!(parent_subaccount_number(child.subaccount_number), 3);
    }
}
