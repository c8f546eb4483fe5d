use crate::StoreResult;
use async_trait::async_trait;
use blockmetrics_primitives::{
    ledger::{
        ChangeUsernameTargetsMsg, RegisterAccountMsg, RegisterUsernameMsg, ReplaceAccountTargetsMsg,
    },
    Address, BlockAggregate, BlockHeight, NewValidator, ValidatorId,
};

/// Durable state written by the sync engine.
///
/// Implementations must be safe for concurrent use. Every write is atomic: it persists
/// completely or not at all.
#[async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait Store: Send + Sync {
    /// Height of the most recently persisted block, [`NotFound`](crate::StoreError::NotFound)
    /// if there is none.
    async fn latest_height(&self) -> StoreResult<BlockHeight>;

    /// Persists a block with its participations and transactions.
    ///
    /// Returns [`Conflict`](crate::StoreError::Conflict) if the height, hash or any transaction
    /// hash is already stored, or if the block has no participants.
    async fn insert_block(&self, block: BlockAggregate) -> StoreResult<()>;

    /// Storage id of the validator with the given network address.
    async fn validator_by_address(&self, address: &Address) -> StoreResult<ValidatorId>;

    /// Inserts a validator and returns its new id.
    ///
    /// Returns [`Conflict`](crate::StoreError::Conflict) if the address or public key is
    /// already known.
    async fn insert_validator(&self, validator: NewValidator) -> StoreResult<ValidatorId>;

    /// Creates an account with its targets.
    async fn insert_account(&self, msg: &RegisterAccountMsg) -> StoreResult<()>;

    /// Replaces every target of an existing account.
    async fn replace_account_targets(&self, msg: &ReplaceAccountTargetsMsg) -> StoreResult<()>;

    /// Creates a username with its targets.
    async fn insert_username(&self, msg: &RegisterUsernameMsg) -> StoreResult<()>;

    /// Replaces every target of an existing username.
    async fn replace_username_targets(&self, msg: &ChangeUsernameTargetsMsg) -> StoreResult<()>;
}
