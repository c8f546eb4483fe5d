use crate::ValidatorId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Position of a block in the ledger.
pub type BlockHeight = u64;

/// Everything persisted for a single height, handed to the store as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockAggregate {
    /// Block height.
    pub height: BlockHeight,
    /// Lowercase hex block hash.
    pub hash: String,
    /// Block time, UTC.
    pub time: DateTime<Utc>,
    /// Storage id of the proposer.
    pub proposer_id: ValidatorId,
    /// Storage ids of the validators that signed the commit.
    pub participant_ids: Vec<ValidatorId>,
    /// Storage ids of eligible validators that did not sign.
    pub missing_ids: Vec<ValidatorId>,
    /// Logical path of every transaction message, in block order.
    pub messages: Vec<String>,
    /// Sum of all transaction fees, in fractional units.
    pub fee_frac: u64,
    /// Transactions in block order.
    pub transactions: Vec<TransactionRecord>,
}

/// A transaction with its normalized message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Lowercase hex SHA-256 of the raw transaction bytes.
    pub hash: String,
    /// Height of the owning block.
    pub block_height: BlockHeight,
    /// Normalized message detail.
    pub message: serde_json::Value,
}
