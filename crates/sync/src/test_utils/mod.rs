//! Test helpers for the sync engine.

mod chain;

pub use chain::{block_time, ChainMethod, TestChain};

use blockmetrics_primitives::{ledger::SEND_PATH, Address, Coin};
use blockmetrics_rpc_client::RemoteValidator;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

/// Initializes a tracing subscriber for tests.
///
/// The filter is configurable via `RUST_LOG`. Installing fails silently if a subscriber is
/// already set.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

/// A validator whose address is 20 times `byte` and whose public key is 32 times `byte`.
pub fn remote_validator(byte: u8) -> RemoteValidator {
    RemoteValidator { address: Address::new(vec![byte; 20]), public_key: vec![byte; 32] }
}

/// Raw bytes of a transaction carrying `msg` at `path`, in the format of
/// [`JsonTxDecoder`](blockmetrics_primitives::JsonTxDecoder).
pub fn raw_tx(path: &str, msg: Value, fees: Option<Coin>) -> Vec<u8> {
    let mut tx = json!({ "msg": { "path": path, "msg": msg } });
    if let Some(fees) = fees {
        tx["fees"] = json!(fees);
    }
    tx.to_string().into_bytes()
}

/// Raw bytes of a value transfer between two 20 byte addresses.
pub fn raw_send(from: u8, to: u8, memo: &str, fees: Option<Coin>) -> Vec<u8> {
    let msg = json!({
        "source": Address::new(vec![from; 20]),
        "destination": Address::new(vec![to; 20]),
        "amount": {"whole": 1, "ticker": "IOV"},
        "memo": memo,
    });
    raw_tx(SEND_PATH, msg, fees)
}
