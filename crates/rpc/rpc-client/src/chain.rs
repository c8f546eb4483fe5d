//! Typed chain queries on top of [`WsClient`].

use crate::{
    rpc_params,
    serde_helpers::{base64_bytes, base64_list, hex_bytes, quantity},
    RpcError, WsClient,
};
use async_trait::async_trait;
use blockmetrics_primitives::{Address, BlockHeight};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::trace;

/// Node method returning application info, including the latest height.
pub const ABCI_INFO_METHOD: &str = "abci_info";
/// Node method returning the validator set at a height.
pub const VALIDATORS_METHOD: &str = "validators";
/// Node method returning the signed header and commit at a height.
pub const COMMIT_METHOD: &str = "commit";
/// Node method returning the full block at a height.
pub const BLOCK_METHOD: &str = "block";

/// Header fields and signers of the commit for one height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommit {
    /// Block height.
    pub height: BlockHeight,
    /// Block hash.
    pub hash: Vec<u8>,
    /// Block time.
    pub time: DateTime<Utc>,
    /// Address of the proposer.
    pub proposer_address: Address,
    /// Hash of the validator set eligible at this height.
    pub validators_hash: Vec<u8>,
    /// Addresses that signed the commit, in commit order.
    pub participant_addresses: Vec<Address>,
}

/// Raw transactions of one height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBlock {
    /// Block height.
    pub height: BlockHeight,
    /// Block time.
    pub time: DateTime<Utc>,
    /// Raw transaction bytes, in block order.
    pub transactions: Vec<Vec<u8>>,
    /// SHA-256 of each transaction, same order as `transactions`.
    pub transaction_hashes: Vec<[u8; 32]>,
}

impl RemoteBlock {
    /// Creates a block, hashing every transaction.
    pub fn new(height: BlockHeight, time: DateTime<Utc>, transactions: Vec<Vec<u8>>) -> Self {
        let transaction_hashes = transactions.iter().map(|tx| Sha256::digest(tx).into()).collect();
        Self { height, time, transactions, transaction_hashes }
    }
}

/// A member of the validator set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteValidator {
    /// Network address.
    pub address: Address,
    /// Consensus public key bytes.
    pub public_key: Vec<u8>,
}

/// Typed queries against the consensus node.
///
/// Implementations do not retry.
#[async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait ChainClient: Send + Sync {
    /// Latest committed height.
    async fn chain_height(&self) -> Result<BlockHeight, RpcError>;

    /// Commit metadata and signers at `height`.
    async fn commit(&self, height: BlockHeight) -> Result<RemoteCommit, RpcError>;

    /// Full eligible validator set at `height`.
    async fn validator_set(&self, height: BlockHeight) -> Result<Vec<RemoteValidator>, RpcError>;

    /// Raw block at `height`.
    async fn fetch_block(&self, height: BlockHeight) -> Result<RemoteBlock, RpcError>;
}

#[derive(Deserialize)]
struct AbciInfoPayload {
    response: AbciInfoResponse,
}

#[derive(Deserialize)]
struct AbciInfoResponse {
    #[serde(default, deserialize_with = "quantity")]
    last_block_height: u64,
}

#[derive(Deserialize)]
struct ValidatorsPayload {
    #[serde(default)]
    validators: Option<Vec<ValidatorPayload>>,
}

#[derive(Deserialize)]
struct ValidatorPayload {
    address: Address,
    pub_key: PubKeyPayload,
}

#[derive(Deserialize)]
struct PubKeyPayload {
    #[serde(deserialize_with = "base64_bytes")]
    value: Vec<u8>,
}

#[derive(Deserialize)]
struct CommitPayload {
    signed_header: SignedHeaderPayload,
}

#[derive(Deserialize)]
struct SignedHeaderPayload {
    header: CommitHeaderPayload,
    commit: CommitBodyPayload,
}

#[derive(Deserialize)]
struct CommitHeaderPayload {
    #[serde(deserialize_with = "quantity")]
    height: u64,
    time: DateTime<Utc>,
    proposer_address: Address,
    #[serde(default, deserialize_with = "hex_bytes")]
    validators_hash: Vec<u8>,
}

#[derive(Deserialize)]
struct CommitBodyPayload {
    block_id: BlockIdPayload,
    /// Legacy signer list, absent signers are `null`.
    #[serde(default)]
    precommits: Option<Vec<Option<SignerPayload>>>,
    /// Newer signer list, absent signers have an empty address.
    #[serde(default)]
    signatures: Option<Vec<SignerPayload>>,
}

#[derive(Deserialize)]
struct BlockIdPayload {
    #[serde(default, deserialize_with = "hex_bytes")]
    hash: Vec<u8>,
}

#[derive(Deserialize)]
struct SignerPayload {
    #[serde(default, deserialize_with = "hex_bytes")]
    validator_address: Vec<u8>,
}

impl CommitPayload {
    fn into_commit(self) -> RemoteCommit {
        let SignedHeaderPayload { header, commit } = self.signed_header;
        let participant_addresses = match (commit.precommits, commit.signatures) {
            (Some(precommits), _) => precommits
                .into_iter()
                .flatten()
                .map(|signer| Address::new(signer.validator_address))
                .collect(),
            (None, Some(signatures)) => signatures
                .into_iter()
                .filter(|signer| !signer.validator_address.is_empty())
                .map(|signer| Address::new(signer.validator_address))
                .collect(),
            (None, None) => Vec::new(),
        };
        RemoteCommit {
            height: header.height,
            hash: commit.block_id.hash,
            time: header.time,
            proposer_address: header.proposer_address,
            validators_hash: header.validators_hash,
            participant_addresses,
        }
    }
}

#[derive(Deserialize)]
struct BlockPayload {
    block: BlockBodyPayload,
}

#[derive(Deserialize)]
struct BlockBodyPayload {
    header: BlockHeaderPayload,
    data: BlockDataPayload,
}

#[derive(Deserialize)]
struct BlockHeaderPayload {
    #[serde(deserialize_with = "quantity")]
    height: u64,
    time: DateTime<Utc>,
}

#[derive(Deserialize)]
struct BlockDataPayload {
    #[serde(default, deserialize_with = "base64_list")]
    txs: Vec<Vec<u8>>,
}

#[async_trait]
impl ChainClient for WsClient {
    async fn chain_height(&self) -> Result<BlockHeight, RpcError> {
        let payload: AbciInfoPayload = self.request(ABCI_INFO_METHOD, rpc_params![]).await?;
        Ok(payload.response.last_block_height)
    }

    async fn commit(&self, height: BlockHeight) -> Result<RemoteCommit, RpcError> {
        let payload: CommitPayload = self.request(COMMIT_METHOD, rpc_params![height]).await?;
        let commit = payload.into_commit();
        trace!(
            target: "rpc::chain",
            height,
            signers = commit.participant_addresses.len(),
            "Fetched commit"
        );
        Ok(commit)
    }

    async fn validator_set(&self, height: BlockHeight) -> Result<Vec<RemoteValidator>, RpcError> {
        let payload: ValidatorsPayload =
            self.request(VALIDATORS_METHOD, rpc_params![height]).await?;
        Ok(payload
            .validators
            .unwrap_or_default()
            .into_iter()
            .map(|v| RemoteValidator { address: v.address, public_key: v.pub_key.value })
            .collect())
    }

    async fn fetch_block(&self, height: BlockHeight) -> Result<RemoteBlock, RpcError> {
        let payload: BlockPayload = self.request(BLOCK_METHOD, rpc_params![height]).await?;
        let BlockBodyPayload { header, data } = payload.block;
        if header.height != height {
            return Err(RpcError::InvalidResponse(format!(
                "requested block {height}, node returned {}",
                header.height
            )))
        }
        trace!(target: "rpc::chain", height, transactions = data.txs.len(), "Fetched block");
        Ok(RemoteBlock::new(header.height, header.time, data.txs))
    }
}
