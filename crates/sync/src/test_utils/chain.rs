use async_trait::async_trait;
use blockmetrics_primitives::{Address, BlockHeight};
use blockmetrics_rpc_client::{ChainClient, RemoteBlock, RemoteCommit, RemoteValidator, RpcError};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// The queries of [`ChainClient`], used to count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainMethod {
    /// [`ChainClient::chain_height`]
    ChainHeight,
    /// [`ChainClient::commit`]
    Commit,
    /// [`ChainClient::validator_set`]
    ValidatorSet,
    /// [`ChainClient::fetch_block`]
    FetchBlock,
}

#[derive(Debug, Default)]
struct ChainState {
    commits: BTreeMap<BlockHeight, RemoteCommit>,
    blocks: BTreeMap<BlockHeight, RemoteBlock>,
    /// Validator sets keyed by the first height they are in effect.
    validator_sets: BTreeMap<BlockHeight, Vec<RemoteValidator>>,
    /// Set version, used as the validators hash of new commits.
    set_version: u8,
    scripted_heights: VecDeque<BlockHeight>,
    failing: HashSet<(ChainMethod, BlockHeight)>,
    calls: HashMap<ChainMethod, usize>,
}

impl ChainState {
    fn tip(&self) -> BlockHeight {
        self.commits.keys().next_back().copied().unwrap_or_default()
    }

    fn validators_at(&self, height: BlockHeight) -> Vec<RemoteValidator> {
        self.validator_sets
            .range(..=height)
            .next_back()
            .map(|(_, set)| set.clone())
            .unwrap_or_default()
    }

    fn record(&mut self, method: ChainMethod, height: BlockHeight) -> Result<(), RpcError> {
        *self.calls.entry(method).or_default() += 1;
        if self.failing.contains(&(method, height)) {
            return Err(RpcError::FailedResponse {
                code: -32603,
                message: format!("Internal error: injected {method:?} failure at {height}"),
            })
        }
        Ok(())
    }

    fn unknown(&self, height: BlockHeight) -> RpcError {
        RpcError::FailedResponse {
            code: -32603,
            message: format!(
                "Internal error: height {height} must be less than or equal to the current \
                 blockchain height {}",
                self.tip()
            ),
        }
    }
}

/// A scripted chain.
///
/// Blocks are appended with [`TestChain::push_block`]. Queries past the tip fail like they do
/// on a real node. Failures can be injected per method and height.
#[derive(Debug, Default)]
pub struct TestChain {
    state: Mutex<ChainState>,
}

impl TestChain {
    /// Creates an empty chain with `validators` eligible from the first block on.
    pub fn new(validators: Vec<RemoteValidator>) -> Self {
        let chain = Self::default();
        chain.set_validators(validators);
        chain
    }

    /// Changes the eligible set, starting with the next pushed block.
    pub fn set_validators(&self, validators: Vec<RemoteValidator>) {
        let mut state = self.state.lock();
        let from = state.tip() + 1;
        state.validator_sets.insert(from, validators);
        state.set_version = state.set_version.wrapping_add(1);
    }

    /// Appends a block signed by `signers` and returns its height.
    ///
    /// The first signer is the proposer.
    pub fn push_block(&self, signers: Vec<Address>, transactions: Vec<Vec<u8>>) -> BlockHeight {
        let mut state = self.state.lock();
        let height = state.tip() + 1;
        let time = block_time(height);
        let commit = RemoteCommit {
            height,
            hash: height.to_be_bytes().to_vec(),
            time,
            proposer_address: signers.first().cloned().unwrap_or_default(),
            validators_hash: vec![state.set_version],
            participant_addresses: signers,
        };
        state.commits.insert(height, commit);
        state.blocks.insert(height, RemoteBlock::new(height, time, transactions));
        height
    }

    /// Makes `method` fail for `height` until [`TestChain::heal`] is called.
    pub fn fail(&self, method: ChainMethod, height: BlockHeight) {
        self.state.lock().failing.insert((method, height));
    }

    /// Removes every injected failure.
    pub fn heal(&self) {
        self.state.lock().failing.clear();
    }

    /// Heights reported by the next [`ChainClient::chain_height`] calls, before falling back to
    /// the real tip.
    pub fn script_chain_heights(&self, heights: impl IntoIterator<Item = BlockHeight>) {
        self.state.lock().scripted_heights.extend(heights);
    }

    /// Number of calls made to `method`.
    pub fn calls(&self, method: ChainMethod) -> usize {
        self.state.lock().calls.get(&method).copied().unwrap_or_default()
    }

    /// Number of calls made to any method.
    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.values().sum()
    }
}

/// Time of the block at `height`, one second apart.
pub fn block_time(height: BlockHeight) -> DateTime<Utc> {
    Utc.timestamp_opt(1_560_000_000 + height as i64, 0).single().unwrap_or_default()
}

#[async_trait]
impl ChainClient for TestChain {
    async fn chain_height(&self) -> Result<BlockHeight, RpcError> {
        let mut state = self.state.lock();
        state.record(ChainMethod::ChainHeight, 0)?;
        let tip = state.tip();
        Ok(state.scripted_heights.pop_front().unwrap_or(tip))
    }

    async fn commit(&self, height: BlockHeight) -> Result<RemoteCommit, RpcError> {
        let mut state = self.state.lock();
        state.record(ChainMethod::Commit, height)?;
        state.commits.get(&height).cloned().ok_or_else(|| state.unknown(height))
    }

    async fn validator_set(&self, height: BlockHeight) -> Result<Vec<RemoteValidator>, RpcError> {
        let mut state = self.state.lock();
        state.record(ChainMethod::ValidatorSet, height)?;
        Ok(state.validators_at(height))
    }

    async fn fetch_block(&self, height: BlockHeight) -> Result<RemoteBlock, RpcError> {
        let mut state = self.state.lock();
        state.record(ChainMethod::FetchBlock, height)?;
        state.blocks.get(&height).cloned().ok_or_else(|| state.unknown(height))
    }
}
