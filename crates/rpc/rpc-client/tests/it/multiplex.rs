use crate::server::{self, next_request, send};
use assert_matches::assert_matches;
use blockmetrics_rpc_client::{RpcError, WsClient};
use futures_util::SinkExt;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::sync::oneshot;

#[tokio::test(flavor = "multi_thread")]
async fn responses_are_matched_out_of_order() {
    let url = server::spawn(|mut ws| async move {
        let first = next_request(&mut ws).await.unwrap();
        let second = next_request(&mut ws).await.unwrap();
        // answer in reverse, echoing the method as the result
        for req in [second, first] {
            send(&mut ws, server::result(&req["id"], req["method"].clone())).await;
        }
        while next_request(&mut ws).await.is_some() {}
    })
    .await;

    let client = WsClient::dial(&url).await.unwrap();
    let (a, b) = tokio::join!(client.call("alpha", vec![]), client.call("beta", vec![]));
    assert_eq!(a.unwrap(), "alpha");
    assert_eq!(b.unwrap(), "beta");
    assert_eq!(client.pending_calls(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn error_object_becomes_failed_response() {
    let url = server::spawn(|mut ws| async move {
        let req = next_request(&mut ws).await.unwrap();
        send(
            &mut ws,
            json!({
                "jsonrpc": "2.0",
                "id": req["id"],
                "error": {"code": -32603, "message": "Internal error", "data": "height 10 must be less than or equal to the current blockchain height 9"},
            }),
        )
        .await;
        while next_request(&mut ws).await.is_some() {}
    })
    .await;

    let client = WsClient::dial(&url).await.unwrap();
    let err = client.call("commit", vec!["10".to_string()]).await.unwrap_err();
    assert!(err.is_failed_response());
    assert_matches!(err, RpcError::FailedResponse { code: -32603, message } if message.starts_with("Internal error: height 10"));
}

#[tokio::test(flavor = "multi_thread")]
async fn junk_frames_are_skipped() {
    let url = server::spawn(|mut ws| async move {
        let req = next_request(&mut ws).await.unwrap();
        ws.send(tokio_tungstenite::tungstenite::Message::Text("not json".into())).await.unwrap();
        ws.send(tokio_tungstenite::tungstenite::Message::Binary(vec![1, 2, 3].into()))
            .await
            .unwrap();
        send(&mut ws, json!({"jsonrpc": "2.0", "result": {"event": true}})).await;
        send(&mut ws, server::result(&json!("999"), json!("stray"))).await;
        send(&mut ws, server::result(&req["id"], json!("ok"))).await;
        while next_request(&mut ws).await.is_some() {}
    })
    .await;

    let client = WsClient::dial(&url).await.unwrap();
    assert_eq!(client.call("status", vec![]).await.unwrap(), "ok");
}

#[tokio::test(flavor = "multi_thread")]
async fn waiting_calls_fail_when_node_disconnects() {
    let (got_request, request_seen) = oneshot::channel();
    let url = server::spawn(|mut ws| async move {
        next_request(&mut ws).await.unwrap();
        let _ = got_request.send(());
        ws.close(None).await.unwrap();
    })
    .await;

    let client = Arc::new(WsClient::dial(&url).await.unwrap());
    let call = tokio::spawn({
        let client = Arc::clone(&client);
        async move { client.call("block", vec!["1".to_string()]).await }
    });
    request_seen.await.unwrap();

    let res = tokio::time::timeout(Duration::from_secs(5), call).await.unwrap().unwrap();
    assert_matches!(res, Err(RpcError::ConnectionClosed));
    assert_matches!(client.call("block", vec![]).await, Err(RpcError::ConnectionClosed));
}

#[tokio::test(flavor = "multi_thread")]
async fn calls_after_close_fail() {
    let url = server::spawn(|mut ws| async move {
        while next_request(&mut ws).await.is_some() {}
    })
    .await;

    let client = WsClient::dial(&url).await.unwrap();
    client.close().await.unwrap();
    assert_matches!(client.call("abci_info", vec![]).await, Err(RpcError::ConnectionClosed));
}
