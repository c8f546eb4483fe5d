use crate::NormalizeError;
use blockmetrics_primitives::{Address, BlockHeight, DecodeError};
use blockmetrics_rpc_client::RpcError;
use blockmetrics_storage::StoreError;
use thiserror::Error;

/// Failure to resolve a validator address to its storage id.
#[derive(Debug, Error)]
pub enum ValidatorLookupError {
    /// An empty address never resolves.
    #[error("empty validator address")]
    EmptyAddress,
    /// The address is neither stored nor part of the validator set at the given height.
    #[error("validator {address} not present at height {height}")]
    NotPresent {
        /// The unresolved address.
        address: Address,
        /// Height whose validator set was searched.
        height: BlockHeight,
    },
    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Fetching the validator set failed.
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl ValidatorLookupError {
    /// Returns `true` if the address could not be resolved, as opposed to a backend failure.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::EmptyAddress | Self::NotPresent { .. })
    }
}

/// A sync error, tagged with the phase that failed.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Reading the latest stored height failed.
    #[error("latest stored height: {0}")]
    LatestHeight(#[source] StoreError),
    /// Querying the chain height failed.
    #[error("chain height: {0}")]
    ChainHeight(#[source] RpcError),
    /// Fetching the commit failed.
    #[error("commit for block {height}: {error}")]
    Commit {
        /// Block being synced.
        height: BlockHeight,
        /// The underlying error.
        #[source]
        error: RpcError,
    },
    /// Fetching the validator set failed.
    #[error("validator set for block {height}: {error}")]
    ValidatorSet {
        /// Block being synced.
        height: BlockHeight,
        /// The underlying error.
        #[source]
        error: RpcError,
    },
    /// A validator address could not be resolved.
    #[error("validator id for block {height}: {error}")]
    Validator {
        /// Block being synced.
        height: BlockHeight,
        /// The underlying error.
        #[source]
        error: ValidatorLookupError,
    },
    /// Fetching the block failed.
    #[error("transactions for block {height}: {error}")]
    Block {
        /// Block being synced.
        height: BlockHeight,
        /// The underlying error.
        #[source]
        error: RpcError,
    },
    /// A transaction could not be decoded.
    #[error("decode transaction {index} of block {height}: {error}")]
    Decode {
        /// Block being synced.
        height: BlockHeight,
        /// Position of the transaction in the block.
        index: usize,
        /// The underlying error.
        #[source]
        error: DecodeError,
    },
    /// A fee was paid in a currency other than the configured one.
    #[error("fee currency in block {height}: expected {expected}, found {found}")]
    FeeCurrency {
        /// Block being synced.
        height: BlockHeight,
        /// Configured fee ticker.
        expected: String,
        /// Ticker found in the transaction.
        found: String,
    },
    /// A fee is negative or the block total does not fit into `u64`.
    #[error("fee total of block {height} is out of range")]
    FeeOverflow {
        /// Block being synced.
        height: BlockHeight,
    },
    /// Applying a message to the account or username projections failed.
    #[error("apply {path} in block {height}: {error}")]
    SideEffect {
        /// Block being synced.
        height: BlockHeight,
        /// Path of the message.
        path: String,
        /// The underlying error.
        #[source]
        error: StoreError,
    },
    /// A transaction could not be rendered.
    #[error("message details of transaction {index} in block {height}: {error}")]
    Normalize {
        /// Block being synced.
        height: BlockHeight,
        /// Position of the transaction in the block.
        index: usize,
        /// The underlying error.
        #[source]
        error: NormalizeError,
    },
    /// Persisting the block failed.
    #[error("insert block {height}: {error}")]
    InsertBlock {
        /// Block being synced.
        height: BlockHeight,
        /// The underlying error.
        #[source]
        error: StoreError,
    },
}

impl SyncError {
    /// Returns `true` if the store rejected a write as a duplicate.
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::InsertBlock { error, .. } | Self::SideEffect { error, .. } => error.is_conflict(),
            Self::Validator { error: ValidatorLookupError::Store(error), .. } => error.is_conflict(),
            _ => false,
        }
    }
}

/// A failed sync run.
///
/// Blocks inserted before the failure stay persisted, a new run resumes after them.
#[derive(Debug, Error)]
#[error("sync aborted after inserting {inserted} blocks: {error}")]
pub struct SyncFailure {
    /// Number of blocks inserted by the run before it failed.
    pub inserted: u64,
    /// What failed.
    #[source]
    pub error: SyncError,
}

/// Invalid [`SyncConfig`](crate::SyncConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written.
    #[error(transparent)]
    Load(#[from] confy::ConfyError),
    /// No fee ticker configured.
    #[error("fee ticker must not be empty")]
    EmptyFeeTicker,
    /// The address prefix cannot be used for bech32 encoding.
    #[error("invalid address prefix {hrp:?}: {source}")]
    InvalidHrp {
        /// The configured prefix.
        hrp: String,
        /// Why the prefix was rejected.
        source: bech32::Error,
    },
    /// A key of the validator name table is not a hex address.
    #[error("invalid validator address {address:?}: {source}")]
    ValidatorAddress {
        /// The configured key.
        address: String,
        /// Why the key was rejected.
        source: hex::FromHexError,
    },
}
