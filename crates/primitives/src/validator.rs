use crate::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Storage identity of a validator.
pub type ValidatorId = i64;

/// A validator as known to the store. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorRecord {
    /// Storage identity.
    pub id: ValidatorId,
    /// Consensus public key.
    pub public_key: Vec<u8>,
    /// Network address.
    pub address: Address,
    /// Optional display label.
    pub name: Option<String>,
}

/// A validator that is about to be inserted into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewValidator {
    /// Consensus public key.
    pub public_key: Vec<u8>,
    /// Network address.
    pub address: Address,
    /// Optional display label.
    pub name: Option<String>,
}

/// Read-only lookup of validator display labels by address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatorNames(HashMap<Address, String>);

impl ValidatorNames {
    /// Returns the label for `address`, if any.
    pub fn get(&self, address: &Address) -> Option<&str> {
        self.0.get(address).map(String::as_str)
    }

    /// Number of known labels.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no labels are known.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Address, String)> for ValidatorNames {
    fn from_iter<T: IntoIterator<Item = (Address, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
