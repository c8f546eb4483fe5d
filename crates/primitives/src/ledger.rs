//! Decoded ledger transactions and the messages they carry.

use crate::{Address, Coin};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Path of [`LedgerMsg::Batch`].
pub const BATCH_PATH: &str = "batch/execute";
/// Path of [`LedgerMsg::Send`].
pub const SEND_PATH: &str = "cash/send";
/// Path of [`LedgerMsg::RegisterAccount`].
pub const REGISTER_ACCOUNT_PATH: &str = "account/register_account";
/// Path of [`LedgerMsg::ReplaceAccountTargets`].
pub const REPLACE_ACCOUNT_TARGETS_PATH: &str = "account/replace_account_targets";
/// Path of [`LedgerMsg::RegisterUsername`].
pub const REGISTER_USERNAME_PATH: &str = "username/register_token";
/// Path of [`LedgerMsg::ChangeUsernameTargets`].
pub const CHANGE_USERNAME_TARGETS_PATH: &str = "username/change_token_targets";

/// A decoded transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerTx {
    /// Fee paid for the transaction, if any.
    pub fees: Option<Coin>,
    /// Multisig contract ids that authorized the transaction.
    pub multisig: Vec<Vec<u8>>,
    /// The business payload.
    pub msg: LedgerMsg,
}

/// The business payload of one transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerMsg {
    /// Several messages executed together.
    Batch(Vec<LedgerMsg>),
    /// Value transfer.
    Send(SendMsg),
    /// Account registration.
    RegisterAccount(RegisterAccountMsg),
    /// Replaces all targets of an existing account.
    ReplaceAccountTargets(ReplaceAccountTargetsMsg),
    /// Username registration.
    RegisterUsername(RegisterUsernameMsg),
    /// Replaces all targets of an existing username.
    ChangeUsernameTargets(ChangeUsernameTargetsMsg),
    /// Any message this crate does not model, kept as its JSON form.
    Other {
        /// Logical message path.
        path: String,
        /// Native JSON representation.
        details: Value,
    },
}

impl LedgerMsg {
    /// Logical path name of the message.
    pub fn path(&self) -> &str {
        match self {
            Self::Batch(_) => BATCH_PATH,
            Self::Send(_) => SEND_PATH,
            Self::RegisterAccount(_) => REGISTER_ACCOUNT_PATH,
            Self::ReplaceAccountTargets(_) => REPLACE_ACCOUNT_TARGETS_PATH,
            Self::RegisterUsername(_) => REGISTER_USERNAME_PATH,
            Self::ChangeUsernameTargets(_) => CHANGE_USERNAME_TARGETS_PATH,
            Self::Other { path, .. } => path,
        }
    }

    /// Native JSON representation of the message.
    ///
    /// A batch renders as an array of `{"path", "msg"}` objects.
    pub fn native_json(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Batch(msgs) => msgs
                .iter()
                .map(|msg| Ok(json!({ "path": msg.path(), "msg": msg.native_json()? })))
                .collect::<Result<Vec<_>, serde_json::Error>>()
                .map(Value::Array),
            Self::Send(msg) => serde_json::to_value(msg),
            Self::RegisterAccount(msg) => serde_json::to_value(msg),
            Self::ReplaceAccountTargets(msg) => serde_json::to_value(msg),
            Self::RegisterUsername(msg) => serde_json::to_value(msg),
            Self::ChangeUsernameTargets(msg) => serde_json::to_value(msg),
            Self::Other { details, .. } => Ok(details.clone()),
        }
    }
}

/// Moves funds between two ledger addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMsg {
    /// Sender.
    pub source: Address,
    /// Recipient.
    pub destination: Address,
    /// Transferred amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Coin>,
    /// Free text, at most 128 characters.
    #[serde(default)]
    pub memo: String,
}

/// An address on some blockchain that a name points to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockchainAddress {
    /// Target blockchain.
    pub blockchain_id: String,
    /// Address on that chain, in its native format.
    pub address: String,
}

/// Registers `name*domain`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterAccountMsg {
    /// Account domain.
    pub domain: String,
    /// Account name within the domain.
    #[serde(default)]
    pub name: String,
    /// Owner.
    pub owner: Address,
    /// Initial targets.
    #[serde(default)]
    pub targets: Vec<BlockchainAddress>,
    /// Broker that facilitated the registration, empty if none.
    #[serde(default)]
    pub broker: Address,
}

/// Replaces the targets of `name*domain`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceAccountTargetsMsg {
    /// Account domain.
    pub domain: String,
    /// Account name within the domain.
    #[serde(default)]
    pub name: String,
    /// Replacement targets.
    #[serde(default)]
    pub new_targets: Vec<BlockchainAddress>,
}

/// Registers a username.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUsernameMsg {
    /// The username.
    pub username: String,
    /// Initial targets.
    #[serde(default)]
    pub targets: Vec<BlockchainAddress>,
}

/// Replaces the targets of a username.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeUsernameTargetsMsg {
    /// The username.
    pub username: String,
    /// Replacement targets.
    #[serde(default)]
    pub new_targets: Vec<BlockchainAddress>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_native_json() {
        let batch = LedgerMsg::Batch(vec![
            LedgerMsg::RegisterUsername(RegisterUsernameMsg {
                username: "alice*iov".to_string(),
                targets: vec![],
            }),
            LedgerMsg::Other { path: "gov/vote".to_string(), details: json!({"selected": 1}) },
        ]);
        assert_eq!(batch.path(), BATCH_PATH);
        assert_eq!(
            batch.native_json().unwrap(),
            json!([
                {"path": REGISTER_USERNAME_PATH, "msg": {"username": "alice*iov", "targets": []}},
                {"path": "gov/vote", "msg": {"selected": 1}},
            ])
        );
    }
}
