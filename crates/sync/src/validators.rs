use crate::ValidatorLookupError;
use blockmetrics_primitives::{Address, BlockHeight, NewValidator, ValidatorId, ValidatorNames};
use blockmetrics_rpc_client::ChainClient;
use blockmetrics_storage::Store;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Maps validator addresses to their storage ids.
///
/// Lookups go to memory first, then to the store, then to the validator set of the chain. A
/// validator only found on chain is inserted into the store, named after the
/// [`ValidatorNames`] table. Resolved ids are never evicted, as stored validators are immutable.
#[derive(Debug, Default)]
pub struct ValidatorCache {
    ids: HashMap<Address, ValidatorId>,
    names: ValidatorNames,
}

impl ValidatorCache {
    /// Creates an empty cache naming new validators from `names`.
    pub fn new(names: ValidatorNames) -> Self {
        Self { ids: HashMap::new(), names }
    }

    /// Returns the cached id of `address`, without any lookup.
    pub fn get(&self, address: &Address) -> Option<ValidatorId> {
        self.ids.get(address).copied()
    }

    /// Number of cached validators.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Resolves `address`, using the validator set at `height` for validators not stored yet.
    pub async fn database_id<C, S>(
        &mut self,
        chain: &C,
        store: &S,
        address: &Address,
        height: BlockHeight,
    ) -> Result<ValidatorId, ValidatorLookupError>
    where
        C: ChainClient,
        S: Store,
    {
        if address.is_empty() {
            return Err(ValidatorLookupError::EmptyAddress)
        }
        if let Some(id) = self.get(address) {
            return Ok(id)
        }

        match store.validator_by_address(address).await {
            Ok(id) => {
                trace!(target: "sync::validators", %address, id, "Loaded validator from store");
                self.ids.insert(address.clone(), id);
                return Ok(id)
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err.into()),
        }

        let validator = chain
            .validator_set(height)
            .await?
            .into_iter()
            .find(|v| &v.address == address)
            .ok_or_else(|| ValidatorLookupError::NotPresent { address: address.clone(), height })?;

        let name = self.names.get(address).map(ToOwned::to_owned);
        let id = store
            .insert_validator(NewValidator {
                public_key: validator.public_key,
                address: validator.address,
                name: name.clone(),
            })
            .await?;
        debug!(target: "sync::validators", %address, id, ?name, height, "Registered new validator");
        self.ids.insert(address.clone(), id);
        Ok(id)
    }

    /// Resolves every address in order. The first failure aborts the whole lookup.
    pub async fn database_ids<C, S>(
        &mut self,
        chain: &C,
        store: &S,
        addresses: &[Address],
        height: BlockHeight,
    ) -> Result<Vec<ValidatorId>, ValidatorLookupError>
    where
        C: ChainClient,
        S: Store,
    {
        let mut ids = Vec::with_capacity(addresses.len());
        for address in addresses {
            ids.push(self.database_id(chain, store, address, height).await?);
        }
        Ok(ids)
    }
}

/// Addresses of `eligible` that are not in `participants`, in the order of `eligible`.
pub fn missing_validators(eligible: &[Address], participants: &[Address]) -> Vec<Address> {
    let participants: HashSet<&Address> = participants.iter().collect();
    let mut seen = HashSet::new();
    eligible
        .iter()
        .filter(|address| !participants.contains(address) && seen.insert(*address))
        .cloned()
        .collect()
}
