use crate::{Store, StoreError, StoreResult};
use async_trait::async_trait;
use blockmetrics_primitives::{
    ledger::{
        BlockchainAddress, ChangeUsernameTargetsMsg, RegisterAccountMsg, RegisterUsernameMsg,
        ReplaceAccountTargetsMsg,
    },
    Address, BlockAggregate, BlockHeight, NewValidator, ValidatorId, ValidatorRecord,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};

/// A stored account projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    /// Domain the account belongs to.
    pub domain: String,
    /// Account name, empty for the domain account.
    pub name: String,
    /// Owner address.
    pub owner: Address,
    /// Broker address, may be empty.
    pub broker: Address,
    /// Blockchain addresses the account points to.
    pub targets: Vec<BlockchainAddress>,
}

/// A stored username projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsernameRecord {
    /// The username, e.g. `alice*iov`.
    pub username: String,
    /// Blockchain addresses the username points to.
    pub targets: Vec<BlockchainAddress>,
}

#[derive(Debug, Default)]
struct Tables {
    blocks: BTreeMap<BlockHeight, BlockAggregate>,
    block_hashes: HashSet<String>,
    tx_hashes: HashSet<String>,
    /// Position `i` holds the validator with id `i + 1`.
    validators: Vec<ValidatorRecord>,
    accounts: BTreeMap<(String, String), AccountRecord>,
    usernames: BTreeMap<String, UsernameRecord>,
}

impl Tables {
    fn is_known_validator(&self, id: ValidatorId) -> bool {
        id >= 1 && (id as usize) <= self.validators.len()
    }

    /// Runs every integrity check of [`Store::insert_block`] without mutating anything.
    fn check_block(&self, block: &BlockAggregate) -> StoreResult<()> {
        if block.participant_ids.is_empty() {
            return Err(StoreError::Conflict("no participants on block".to_string()))
        }
        if self.blocks.contains_key(&block.height) {
            return Err(StoreError::Conflict(format!("block height {} exists", block.height)))
        }
        if self.block_hashes.contains(&block.hash) {
            return Err(StoreError::Conflict(format!("block hash {} exists", block.hash)))
        }

        let mut seen = HashSet::new();
        for &id in std::iter::once(&block.proposer_id)
            .chain(&block.participant_ids)
            .chain(&block.missing_ids)
        {
            if !self.is_known_validator(id) {
                return Err(StoreError::Conflict(format!("unknown validator {id}")))
            }
        }
        for &id in block.participant_ids.iter().chain(&block.missing_ids) {
            if !seen.insert(id) {
                return Err(StoreError::Conflict(format!(
                    "validator {id} participates twice in block {}",
                    block.height
                )))
            }
        }

        let mut tx_hashes = HashSet::new();
        for tx in &block.transactions {
            if self.tx_hashes.contains(&tx.hash) || !tx_hashes.insert(&tx.hash) {
                return Err(StoreError::Conflict(format!("transaction {} exists", tx.hash)))
            }
        }
        Ok(())
    }
}

/// In-memory [`Store`].
///
/// All tables sit behind one lock, so every write is atomic and checks run before any
/// mutation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the block at `height`.
    pub fn block(&self, height: BlockHeight) -> Option<BlockAggregate> {
        self.tables.lock().blocks.get(&height).cloned()
    }

    /// Returns all blocks ordered by height.
    pub fn blocks(&self) -> Vec<BlockAggregate> {
        self.tables.lock().blocks.values().cloned().collect()
    }

    /// Returns the validator with the given id.
    pub fn validator(&self, id: ValidatorId) -> Option<ValidatorRecord> {
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.tables.lock().validators.get(index).cloned()
    }

    /// Number of stored validators.
    pub fn validator_count(&self) -> usize {
        self.tables.lock().validators.len()
    }

    /// Returns the account `name` in `domain`.
    pub fn account(&self, domain: &str, name: &str) -> Option<AccountRecord> {
        self.tables.lock().accounts.get(&(domain.to_string(), name.to_string())).cloned()
    }

    /// Returns the given username.
    pub fn username(&self, username: &str) -> Option<UsernameRecord> {
        self.tables.lock().usernames.get(username).cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn latest_height(&self) -> StoreResult<BlockHeight> {
        self.tables
            .lock()
            .blocks
            .keys()
            .next_back()
            .copied()
            .ok_or_else(|| StoreError::NotFound("no blocks".to_string()))
    }

    async fn insert_block(&self, block: BlockAggregate) -> StoreResult<()> {
        let mut tables = self.tables.lock();
        tables.check_block(&block)?;

        tables.block_hashes.insert(block.hash.clone());
        tables.tx_hashes.extend(block.transactions.iter().map(|tx| tx.hash.clone()));
        tables.blocks.insert(block.height, block);
        Ok(())
    }

    async fn validator_by_address(&self, address: &Address) -> StoreResult<ValidatorId> {
        self.tables
            .lock()
            .validators
            .iter()
            .find(|v| &v.address == address)
            .map(|v| v.id)
            .ok_or_else(|| StoreError::NotFound(format!("validator {address}")))
    }

    async fn insert_validator(&self, validator: NewValidator) -> StoreResult<ValidatorId> {
        let mut tables = self.tables.lock();
        if let Some(existing) = tables
            .validators
            .iter()
            .find(|v| v.address == validator.address || v.public_key == validator.public_key)
        {
            return Err(StoreError::Conflict(format!("validator {} exists", existing.address)))
        }

        let id = tables.validators.len() as ValidatorId + 1;
        tables.validators.push(ValidatorRecord {
            id,
            public_key: validator.public_key,
            address: validator.address,
            name: validator.name,
        });
        Ok(id)
    }

    async fn insert_account(&self, msg: &RegisterAccountMsg) -> StoreResult<()> {
        let key = (msg.domain.clone(), msg.name.clone());
        let mut tables = self.tables.lock();
        if tables.accounts.contains_key(&key) {
            return Err(StoreError::Conflict(format!("account {}*{} exists", msg.name, msg.domain)))
        }
        tables.accounts.insert(
            key,
            AccountRecord {
                domain: msg.domain.clone(),
                name: msg.name.clone(),
                owner: msg.owner.clone(),
                broker: msg.broker.clone(),
                targets: msg.targets.clone(),
            },
        );
        Ok(())
    }

    async fn replace_account_targets(&self, msg: &ReplaceAccountTargetsMsg) -> StoreResult<()> {
        let key = (msg.domain.clone(), msg.name.clone());
        let mut tables = self.tables.lock();
        let account = tables.accounts.get_mut(&key).ok_or_else(|| {
            StoreError::NotFound(format!("account {}*{}", msg.name, msg.domain))
        })?;
        account.targets = msg.new_targets.clone();
        Ok(())
    }

    async fn insert_username(&self, msg: &RegisterUsernameMsg) -> StoreResult<()> {
        let mut tables = self.tables.lock();
        if tables.usernames.contains_key(&msg.username) {
            return Err(StoreError::Conflict(format!("username {} exists", msg.username)))
        }
        tables.usernames.insert(
            msg.username.clone(),
            UsernameRecord { username: msg.username.clone(), targets: msg.targets.clone() },
        );
        Ok(())
    }

    async fn replace_username_targets(&self, msg: &ChangeUsernameTargetsMsg) -> StoreResult<()> {
        let mut tables = self.tables.lock();
        let username = tables
            .usernames
            .get_mut(&msg.username)
            .ok_or_else(|| StoreError::NotFound(format!("username {}", msg.username)))?;
        username.targets = msg.new_targets.clone();
        Ok(())
    }
}
