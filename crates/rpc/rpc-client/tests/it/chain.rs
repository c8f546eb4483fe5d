use crate::server;
use blockmetrics_primitives::Address;
use blockmetrics_rpc_client::{ChainClient, RpcError, WsClient};
use serde_json::{json, Value};
use tokio::sync::mpsc;

fn node(method: &str, params: &[Value]) -> Value {
    let height = params.first().and_then(Value::as_str).unwrap_or("0").to_string();
    match method {
        "abci_info" => json!({"response": {"data": "app", "last_block_height": "42"}}),
        "validators" => json!({
            "block_height": height,
            "validators": [
                {"address": "AB01", "pub_key": {"type": "tendermint/PubKeyEd25519", "value": "AQI="}, "voting_power": "10"},
                {"address": "ab02", "pub_key": {"type": "tendermint/PubKeyEd25519", "value": "AwQ="}, "voting_power": "10"},
            ],
        }),
        "commit" => json!({
            "signed_header": {
                "header": {
                    "height": height,
                    "time": "2019-06-01T12:00:00Z",
                    "proposer_address": "AB01",
                    "validators_hash": "CAFE",
                },
                "commit": {
                    "block_id": {"hash": "BEEF"},
                    "precommits": [{"validator_address": "AB01"}, null],
                },
            },
            "canonical": true,
        }),
        "block" => json!({
            "block": {
                "header": {"height": height, "time": "2019-06-01T12:00:00Z"},
                "data": {"txs": ["YWJj", "ZGVm"]},
            },
        }),
        _ => Value::Null,
    }
}

async fn client() -> (WsClient, mpsc::UnboundedReceiver<String>) {
    let (seen_tx, seen) = mpsc::unbounded_channel();
    let url = server::spawn(|ws| server::serve_with(ws, seen_tx, node)).await;
    (WsClient::dial(&url).await.unwrap(), seen)
}

#[tokio::test(flavor = "multi_thread")]
async fn typed_chain_queries() {
    let (client, mut seen) = client().await;

    assert_eq!(client.chain_height().await.unwrap(), 42);

    let validators = client.validator_set(7).await.unwrap();
    assert_eq!(validators.len(), 2);
    assert_eq!(validators[0].address, Address::new(vec![0xab, 0x01]));
    assert_eq!(validators[1].public_key, vec![3, 4]);

    let commit = client.commit(7).await.unwrap();
    assert_eq!(commit.height, 7);
    assert_eq!(commit.hash, vec![0xbe, 0xef]);
    assert_eq!(commit.validators_hash, vec![0xca, 0xfe]);
    assert_eq!(commit.participant_addresses, vec![Address::new(vec![0xab, 0x01])]);

    let block = client.fetch_block(7).await.unwrap();
    assert_eq!(block.transactions, vec![b"abc".to_vec(), b"def".to_vec()]);
    assert_eq!(block.transaction_hashes.len(), 2);

    let mut methods = Vec::new();
    while let Ok(m) = seen.try_recv() {
        methods.push(m);
    }
    assert_eq!(methods, ["abci_info", "validators", "commit", "block"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_typed_queries_share_one_connection() {
    let (client, _seen) = client().await;
    let (a, b, c) = tokio::join!(client.commit(3), client.fetch_block(4), client.chain_height());
    assert_eq!(a.unwrap().height, 3);
    assert_eq!(b.unwrap().height, 4);
    assert_eq!(c.unwrap(), 42);
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_result_is_a_json_error() {
    let (seen_tx, _seen) = mpsc::unbounded_channel();
    let url = server::spawn(|ws| {
        server::serve_with(ws, seen_tx, |_, _| json!({"response": {"last_block_height": "NaN"}}))
    })
    .await;
    let client = WsClient::dial(&url).await.unwrap();
    assert!(matches!(client.chain_height().await, Err(RpcError::Json(_))));
}
