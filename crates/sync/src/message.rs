//! Rendering of decoded ledger messages into the stored transaction details.

use blockmetrics_primitives::{ledger::SendMsg, Address, Coin, LedgerMsg, LedgerTx};
use serde::Serialize;
use serde_json::Value;
use tracing::trace;

/// One rendered message, as stored with its transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedMessage {
    /// Logical path of the message, e.g. `cash/send`.
    pub path: String,
    /// Message specific details.
    pub details: Value,
    /// Hex encoded multisig contracts the transaction was authorized with.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub multisig_contract_ids: Vec<String>,
}

/// Failure to render a message.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// A value transfer address cannot be encoded with the configured prefix.
    #[error("cannot encode {address} with prefix {hrp:?}: {source}")]
    AddressEncoding {
        /// The raw address.
        address: Address,
        /// The prefix in use.
        hrp: String,
        /// The encoder error.
        source: bech32::Error,
    },
    /// The message has no JSON representation.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct SendDetails<'a> {
    source: String,
    destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<&'a Coin>,
    memo: &'a str,
}

/// Renders the message of `tx`.
///
/// A batch becomes a JSON array with one entry per contained message, every other message a
/// single [`NormalizedMessage`] object. Only the first level of a batch is unwrapped, a nested
/// batch keeps its native form.
pub fn normalize(tx: &LedgerTx, hrp: &str) -> Result<Value, NormalizeError> {
    let multisig: Vec<String> = tx.multisig.iter().map(hex::encode).collect();
    let rendered = match &tx.msg {
        LedgerMsg::Batch(msgs) => {
            trace!(target: "sync::message", len = msgs.len(), "Unwrapping batch");
            let list = msgs
                .iter()
                .map(|msg| normalize_single(msg, hrp, &multisig))
                .collect::<Result<Vec<_>, _>>()?;
            serde_json::to_value(list)?
        }
        msg => serde_json::to_value(normalize_single(msg, hrp, &multisig)?)?,
    };
    Ok(rendered)
}

fn normalize_single(
    msg: &LedgerMsg,
    hrp: &str,
    multisig: &[String],
) -> Result<NormalizedMessage, NormalizeError> {
    let details = match msg {
        LedgerMsg::Send(send) => send_details(send, hrp)?,
        LedgerMsg::Batch(_) => {
            trace!(target: "sync::message", "Keeping nested batch as is");
            msg.native_json()?
        }
        _ => msg.native_json()?,
    };
    Ok(NormalizedMessage {
        path: msg.path().to_string(),
        details,
        multisig_contract_ids: multisig.to_vec(),
    })
}

fn send_details(msg: &SendMsg, hrp: &str) -> Result<Value, NormalizeError> {
    let encode = |address: &Address| {
        address.to_bech32(hrp).map_err(|source| NormalizeError::AddressEncoding {
            address: address.clone(),
            hrp: hrp.to_string(),
            source,
        })
    };
    let details = SendDetails {
        source: encode(&msg.source)?,
        destination: encode(&msg.destination)?,
        amount: msg.amount.as_ref(),
        memo: &msg.memo,
    };
    Ok(serde_json::to_value(details)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use blockmetrics_primitives::ledger::{RegisterUsernameMsg, BATCH_PATH, SEND_PATH};
    use serde_json::json;

    fn send() -> SendMsg {
        SendMsg {
            source: Address::new(vec![1; 20]),
            destination: Address::new(vec![2; 20]),
            amount: Some(Coin::new(5, 0, "IOV")),
            memo: "rent".to_string(),
        }
    }

    fn tx(msg: LedgerMsg) -> LedgerTx {
        LedgerTx { fees: None, multisig: vec![], msg }
    }

    #[test]
    fn send_uses_prefixed_addresses() {
        let out = normalize(&tx(LedgerMsg::Send(send())), "iov").unwrap();
        assert_eq!(out["path"], SEND_PATH);
        let source = Address::new(vec![1; 20]).to_bech32("iov").unwrap();
        assert!(source.starts_with("iov1"));
        assert_eq!(out["details"]["source"], source);
        let destination = Address::new(vec![2; 20]).to_bech32("iov").unwrap();
        assert_eq!(out["details"]["destination"], destination);
        assert_eq!(out["details"]["amount"], json!({"whole": 5, "ticker": "IOV"}));
        assert_eq!(out["details"]["memo"], "rent");
        assert!(out.get("multisig_contract_ids").is_none());
    }

    #[test]
    fn send_with_bad_prefix_is_an_error() {
        let err = normalize(&tx(LedgerMsg::Send(send())), "").unwrap_err();
        assert_matches!(err, NormalizeError::AddressEncoding { ref hrp, .. } if hrp.is_empty());
    }

    #[test]
    fn default_variant_keeps_native_json() {
        let msg = LedgerMsg::Other { path: "gov/vote".to_string(), details: json!({"selected": 2}) };
        let mut tx = tx(msg);
        tx.multisig = vec![vec![0xab, 0xcd], vec![0x01]];
        assert_eq!(
            normalize(&tx, "iov").unwrap(),
            json!({
                "path": "gov/vote",
                "details": {"selected": 2},
                "multisig_contract_ids": ["abcd", "01"],
            })
        );
    }

    #[test]
    fn batch_of_two_is_an_array() {
        let batch = LedgerMsg::Batch(vec![
            LedgerMsg::Send(send()),
            LedgerMsg::RegisterUsername(RegisterUsernameMsg {
                username: "alice*iov".to_string(),
                targets: vec![],
            }),
        ]);
        let mut tx = tx(batch);
        tx.multisig = vec![vec![7]];

        let out = normalize(&tx, "iov").unwrap();
        let list = out.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["path"], SEND_PATH);
        assert!(list[0]["details"]["source"].as_str().unwrap().starts_with("iov1"));
        assert_eq!(list[1]["path"], "username/register_token");
        assert_eq!(list[1]["details"]["username"], "alice*iov");
        assert_eq!(list[1]["multisig_contract_ids"], json!(["07"]));
    }

    #[test]
    fn nested_batch_is_not_unwrapped() {
        let inner = LedgerMsg::Batch(vec![LedgerMsg::Send(send())]);
        let out = normalize(&tx(LedgerMsg::Batch(vec![inner])), "iov").unwrap();
        let nested = &out[0];
        assert_eq!(nested["path"], BATCH_PATH);
        // native form keeps raw hex addresses
        assert_eq!(nested["details"][0]["msg"]["source"], Address::new(vec![1; 20]).to_hex());
    }
}
