use crate::{
    missing_validators, normalize, shutdown::Shutdown, ConfigError, SyncConfig, SyncError,
    SyncFailure, ValidatorCache,
};
use blockmetrics_primitives::{
    Address, BlockAggregate, BlockHeight, JsonTxDecoder, LedgerMsg, TransactionRecord, TxDecoder,
};
use blockmetrics_rpc_client::ChainClient;
use blockmetrics_storage::{Store, StoreError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of syncing one height.
#[derive(Debug)]
enum Progress {
    /// The block was persisted.
    Inserted,
    /// The node does not have the block yet.
    Pending { chain_height: BlockHeight },
}

/// Copies committed blocks from the chain into the store, one height at a time.
///
/// The engine resumes after the latest stored height, so a failed run can simply be started
/// again. Only the wait for a new height is retried; every other failure ends the run.
#[derive(Debug)]
pub struct SyncEngine<C, S, D = JsonTxDecoder> {
    chain: C,
    store: S,
    decoder: D,
    validators: ValidatorCache,
    hrp: String,
    fee_ticker: String,
    retry_interval: Duration,
    /// Eligible validators of the last seen validator set.
    eligible: Vec<Address>,
    validators_hash: Option<Vec<u8>>,
}

impl<C, S> SyncEngine<C, S>
where
    C: ChainClient,
    S: Store,
{
    /// Creates an engine decoding transactions with [`JsonTxDecoder`].
    pub fn new(chain: C, store: S, config: &SyncConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            chain,
            store,
            decoder: JsonTxDecoder::default(),
            validators: ValidatorCache::new(config.validator_names()?),
            hrp: config.hrp.clone(),
            fee_ticker: config.fee_ticker.clone(),
            retry_interval: config.retry_interval,
            eligible: Vec::new(),
            validators_hash: None,
        })
    }
}

impl<C, S, D> SyncEngine<C, S, D>
where
    C: ChainClient,
    S: Store,
    D: TxDecoder,
{
    /// Replaces the transaction decoder.
    pub fn with_decoder<T: TxDecoder>(self, decoder: T) -> SyncEngine<C, S, T> {
        SyncEngine {
            chain: self.chain,
            store: self.store,
            decoder,
            validators: self.validators,
            hrp: self.hrp,
            fee_ticker: self.fee_ticker,
            retry_interval: self.retry_interval,
            eligible: self.eligible,
            validators_hash: self.validators_hash,
        }
    }

    /// The chain the engine reads from.
    pub const fn chain(&self) -> &C {
        &self.chain
    }

    /// The store the engine writes to.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Syncs until `shutdown` fires and returns the number of inserted blocks.
    ///
    /// `shutdown` is only observed while waiting for the chain to produce the next block. On
    /// failure, the blocks inserted so far are reported with the error.
    pub async fn run(&mut self, mut shutdown: Shutdown) -> Result<u64, SyncFailure> {
        let mut inserted = 0;
        let mut synced = match self.store.latest_height().await {
            Ok(height) => height,
            Err(err) if err.is_not_found() => 0,
            Err(err) => return Err(SyncFailure { inserted, error: SyncError::LatestHeight(err) }),
        };
        info!(target: "sync::engine", synced, "Starting sync");

        self.eligible.clear();
        self.validators_hash = None;
        let mut chain_height = 0;

        loop {
            let next = synced + 1;
            if chain_height < next {
                chain_height = match self.chain.chain_height().await {
                    Ok(height) => height,
                    Err(err) => {
                        warn!(target: "sync::engine", inserted, %err, "Cannot query chain height");
                        return Err(SyncFailure { inserted, error: SyncError::ChainHeight(err) })
                    }
                };
            }
            if chain_height < next {
                debug!(target: "sync::engine", next, chain_height, "Waiting for next block");
                tokio::select! {
                    _ = &mut shutdown => {
                        info!(target: "sync::engine", inserted, synced, "Sync stopped");
                        return Ok(inserted)
                    }
                    _ = tokio::time::sleep(self.retry_interval) => {}
                }
                continue
            }

            match self.sync_block(next).await {
                Ok(Progress::Inserted) => {
                    inserted += 1;
                    synced = next;
                }
                Ok(Progress::Pending { chain_height: reported }) => chain_height = reported,
                Err(error) => {
                    warn!(target: "sync::engine", height = next, inserted, %error, "Sync aborted");
                    return Err(SyncFailure { inserted, error })
                }
            }
        }
    }

    async fn sync_block(&mut self, height: BlockHeight) -> Result<Progress, SyncError> {
        let commit = match self.chain.commit(height).await {
            Ok(commit) => commit,
            Err(error) => return self.recheck(height, SyncError::Commit { height, error }).await,
        };

        let lookup = |error| SyncError::Validator { height, error };
        let proposer_id = self
            .validators
            .database_id(&self.chain, &self.store, &commit.proposer_address, height)
            .await
            .map_err(lookup)?;
        let participant_ids = self
            .validators
            .database_ids(&self.chain, &self.store, &commit.participant_addresses, height)
            .await
            .map_err(lookup)?;

        if self.validators_hash.as_deref() != Some(commit.validators_hash.as_slice()) {
            let set = self
                .chain
                .validator_set(height)
                .await
                .map_err(|error| SyncError::ValidatorSet { height, error })?;
            debug!(target: "sync::engine", height, validators = set.len(), "Validator set changed");
            self.eligible = set.into_iter().map(|v| v.address).collect();
            self.validators_hash = Some(commit.validators_hash.clone());
        }
        let missing = missing_validators(&self.eligible, &commit.participant_addresses);
        let missing_ids = self
            .validators
            .database_ids(&self.chain, &self.store, &missing, height)
            .await
            .map_err(lookup)?;

        let block = match self.chain.fetch_block(height).await {
            Ok(block) => block,
            Err(error) => return self.recheck(height, SyncError::Block { height, error }).await,
        };

        let mut fee_frac: u64 = 0;
        let mut messages = Vec::with_capacity(block.transactions.len());
        let mut transactions = Vec::with_capacity(block.transactions.len());
        let mut decoded = Vec::with_capacity(block.transactions.len());
        for (index, (raw, hash)) in
            block.transactions.iter().zip(&block.transaction_hashes).enumerate()
        {
            let tx = self
                .decoder
                .decode(raw)
                .map_err(|error| SyncError::Decode { height, index, error })?;
            if let Some(fees) = &tx.fees {
                if fees.ticker != self.fee_ticker {
                    return Err(SyncError::FeeCurrency {
                        height,
                        expected: self.fee_ticker.clone(),
                        found: fees.ticker.clone(),
                    })
                }
                fee_frac = fees
                    .fractional_amount()
                    .and_then(|amount| fee_frac.checked_add(amount))
                    .ok_or(SyncError::FeeOverflow { height })?;
            }

            let message = normalize(&tx, &self.hrp)
                .map_err(|error| SyncError::Normalize { height, index, error })?;
            messages.push(tx.msg.path().to_string());
            transactions.push(TransactionRecord {
                hash: hex::encode(hash),
                block_height: height,
                message,
            });
            decoded.push(tx.msg);
        }

        let projected = decoded.iter().flat_map(|msg| match msg {
            LedgerMsg::Batch(msgs) => msgs.as_slice(),
            msg => std::slice::from_ref(msg),
        });
        for msg in projected {
            self.apply(msg).await.map_err(|error| SyncError::SideEffect {
                height,
                path: msg.path().to_string(),
                error,
            })?;
        }

        let tx_count = transactions.len();
        let aggregate = BlockAggregate {
            height,
            hash: hex::encode(&commit.hash),
            time: commit.time,
            proposer_id,
            participant_ids,
            missing_ids,
            messages,
            fee_frac,
            transactions,
        };
        self.store
            .insert_block(aggregate)
            .await
            .map_err(|error| SyncError::InsertBlock { height, error })?;
        info!(target: "sync::engine", height, transactions = tx_count, fee_frac, "Inserted block");
        Ok(Progress::Inserted)
    }

    /// Decides whether a failed fetch means the block does not exist yet.
    async fn recheck(&self, height: BlockHeight, error: SyncError) -> Result<Progress, SyncError> {
        match self.chain.chain_height().await {
            Ok(chain_height) if chain_height < height => {
                debug!(
                    target: "sync::engine",
                    height,
                    chain_height,
                    %error,
                    "Block not produced yet"
                );
                Ok(Progress::Pending { chain_height })
            }
            _ => Err(error),
        }
    }

    /// Updates the account and username projections.
    ///
    /// Batches are expanded by the caller, a batch nested in a batch is not applied.
    async fn apply(&self, msg: &LedgerMsg) -> Result<(), StoreError> {
        let applied = match msg {
            LedgerMsg::RegisterAccount(msg) => self.store.insert_account(msg).await,
            LedgerMsg::ReplaceAccountTargets(msg) => self.store.replace_account_targets(msg).await,
            LedgerMsg::RegisterUsername(msg) => self.store.insert_username(msg).await,
            LedgerMsg::ChangeUsernameTargets(msg) => self.store.replace_username_targets(msg).await,
            _ => return Ok(()),
        };
        match applied {
            // replaying a height whose block insert failed after the projection was written
            Err(err) if err.is_conflict() => {
                debug!(target: "sync::engine", path = msg.path(), %err, "Message already applied");
                Ok(())
            }
            // targets of a name this store never saw registered
            Err(err) if err.is_not_found() => {
                warn!(target: "sync::engine", path = msg.path(), %err, "Projection absent");
                Ok(())
            }
            res => res,
        }
    }
}
