use crate::{
    ledger::{
        BATCH_PATH, CHANGE_USERNAME_TARGETS_PATH, REGISTER_ACCOUNT_PATH, REGISTER_USERNAME_PATH,
        REPLACE_ACCOUNT_TARGETS_PATH, SEND_PATH,
    },
    Coin, LedgerMsg, LedgerTx,
};
use serde::Deserialize;
use serde_json::Value;

/// Errors produced while decoding raw transaction bytes.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The transaction is not valid JSON or does not match the expected shape.
    #[error("malformed transaction: {0}")]
    Json(#[from] serde_json::Error),
    /// A multisig contract id is not valid hex.
    #[error("malformed multisig contract id: {0}")]
    Multisig(#[from] hex::FromHexError),
    /// Error reported by a decoder implementation outside this crate.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Turns raw transaction bytes into a [`LedgerTx`].
///
/// The wire format of transactions is ledger specific; the sync engine only depends on this
/// trait.
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait TxDecoder: Send + Sync {
    /// Decodes one transaction.
    fn decode(&self, raw: &[u8]) -> Result<LedgerTx, DecodeError>;
}

/// Decoder for transactions serialized as JSON documents:
///
/// ```json
/// { "fees": {"whole": 0, "fractional": 10, "ticker": "IOV"},
///   "multisig": ["0A0B"],
///   "msg": { "path": "cash/send", "msg": { "source": "..", "destination": "..", "memo": "" } } }
/// ```
///
/// A batch carries an array of `{"path", "msg"}` objects as its `msg`.
#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct JsonTxDecoder;

#[derive(Deserialize)]
struct WireTx {
    #[serde(default)]
    fees: Option<Coin>,
    #[serde(default)]
    multisig: Vec<String>,
    msg: WireMsg,
}

#[derive(Deserialize)]
struct WireMsg {
    path: String,
    #[serde(default)]
    msg: Value,
}

impl WireMsg {
    fn into_msg(self) -> Result<LedgerMsg, DecodeError> {
        let msg = match self.path.as_str() {
            BATCH_PATH => {
                let msgs: Vec<WireMsg> = serde_json::from_value(self.msg)?;
                LedgerMsg::Batch(msgs.into_iter().map(Self::into_msg).collect::<Result<_, _>>()?)
            }
            SEND_PATH => LedgerMsg::Send(serde_json::from_value(self.msg)?),
            REGISTER_ACCOUNT_PATH => LedgerMsg::RegisterAccount(serde_json::from_value(self.msg)?),
            REPLACE_ACCOUNT_TARGETS_PATH => {
                LedgerMsg::ReplaceAccountTargets(serde_json::from_value(self.msg)?)
            }
            REGISTER_USERNAME_PATH => {
                LedgerMsg::RegisterUsername(serde_json::from_value(self.msg)?)
            }
            CHANGE_USERNAME_TARGETS_PATH => {
                LedgerMsg::ChangeUsernameTargets(serde_json::from_value(self.msg)?)
            }
            _ => LedgerMsg::Other { path: self.path, details: self.msg },
        };
        Ok(msg)
    }
}

impl TxDecoder for JsonTxDecoder {
    fn decode(&self, raw: &[u8]) -> Result<LedgerTx, DecodeError> {
        let wire: WireTx = serde_json::from_slice(raw)?;
        let multisig = wire.multisig.iter().map(hex::decode).collect::<Result<_, _>>()?;
        Ok(LedgerTx { fees: wire.fees, multisig, msg: wire.msg.into_msg()? })
    }
}
