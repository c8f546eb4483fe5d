//! A scripted node that speaks JSON-RPC over a local websocket.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::{net::TcpListener, sync::mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use tracing_subscriber::EnvFilter;

pub(crate) type ServerStream = WebSocketStream<tokio::net::TcpStream>;

/// Installs a stderr subscriber filtered by `RUST_LOG`, once per test binary.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

/// Binds a listener and hands the first accepted connection to `handler`.
pub(crate) async fn spawn<F, Fut>(handler: F) -> String
where
    F: FnOnce(ServerStream) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (incoming, _) = listener.accept().await.unwrap();
        let ws = accept_async(incoming).await.unwrap();
        handler(ws).await;
    });
    format!("ws://{addr}/websocket")
}

/// Reads the next text frame as JSON.
pub(crate) async fn next_request(ws: &mut ServerStream) -> Option<Value> {
    while let Some(frame) = ws.next().await {
        match frame.ok()? {
            Message::Text(text) => return serde_json::from_str(text.as_str()).ok(),
            Message::Close(_) => return None,
            _ => continue,
        }
    }
    None
}

pub(crate) async fn send(ws: &mut ServerStream, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

pub(crate) fn result(id: &Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

/// Answers every request with `respond(method, params)` and reports each method it saw.
pub(crate) async fn serve_with<R>(
    mut ws: ServerStream,
    seen: mpsc::UnboundedSender<String>,
    respond: R,
) where
    R: Fn(&str, &[Value]) -> Value,
{
    while let Some(req) = next_request(&mut ws).await {
        let method = req["method"].as_str().unwrap_or_default().to_string();
        let params = req["params"].as_array().cloned().unwrap_or_default();
        let _ = seen.send(method.clone());
        let answer = respond(&method, &params);
        send(&mut ws, result(&req["id"], answer)).await;
    }
}
