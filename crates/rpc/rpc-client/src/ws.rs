//! A single websocket connection shared by many concurrent calls.

use crate::{
    types::{Request, Response},
    RpcError,
};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tokio::{net::TcpStream, sync::oneshot, task::JoinHandle};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{protocol::Message, Error as WsError},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, trace, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Calls waiting for their response, keyed by correlation id.
///
/// The table is `None` once the connection is gone, which drops every waiting sender.
#[derive(Debug)]
struct PendingCalls(Mutex<Option<HashMap<String, oneshot::Sender<Response>>>>);

impl PendingCalls {
    fn new() -> Self {
        Self(Mutex::new(Some(HashMap::new())))
    }

    fn register(&self, id: String) -> Result<oneshot::Receiver<Response>, RpcError> {
        let (tx, rx) = oneshot::channel();
        match self.0.lock().as_mut() {
            Some(calls) => {
                calls.insert(id, tx);
                Ok(rx)
            }
            None => Err(RpcError::ConnectionClosed),
        }
    }

    fn take(&self, id: &str) -> Option<oneshot::Sender<Response>> {
        self.0.lock().as_mut()?.remove(id)
    }

    /// Closes the table and returns how many calls were still waiting.
    fn close(&self) -> usize {
        self.0.lock().take().map(|calls| calls.len()).unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.0.lock().as_ref().map(HashMap::len).unwrap_or_default()
    }
}

/// JSON-RPC client over one websocket connection.
///
/// Any number of tasks may [`call`](Self::call) concurrently. A dedicated read task decodes
/// inbound frames and hands each response to the call with the matching correlation id.
/// Once the connection is gone, all waiting and future calls fail with
/// [`RpcError::ConnectionClosed`].
pub struct WsClient {
    next_id: AtomicU64,
    sink: tokio::sync::Mutex<SplitSink<WsStream, Message>>,
    pending: Arc<PendingCalls>,
    reader: JoinHandle<()>,
}

impl WsClient {
    /// Connects to the node's websocket endpoint, e.g. `ws://localhost:26657/websocket`.
    pub async fn dial(url: &str) -> Result<Self, RpcError> {
        let (stream, _) = connect_async(url).await?;
        debug!(target: "rpc::ws", %url, "Connected to node");

        let (sink, stream) = stream.split();
        let pending = Arc::new(PendingCalls::new());
        let reader = tokio::spawn(read_loop(stream, Arc::clone(&pending)));
        Ok(Self {
            next_id: AtomicU64::new(0),
            sink: tokio::sync::Mutex::new(sink),
            pending,
            reader,
        })
    }

    /// Sends a call and waits for its result.
    ///
    /// There is no timeout: the call waits until the response arrives or the connection closes.
    pub async fn call(&self, method: &str, params: Vec<String>) -> Result<Value, RpcError> {
        let id = (self.next_id.fetch_add(1, Ordering::Relaxed) + 1).to_string();
        let payload = serde_json::to_string(&Request::new(&id, method, &params))?;

        let rx = self.pending.register(id.clone())?;
        trace!(target: "rpc::ws", %id, method, "Sending request");
        let sent = self.sink.lock().await.send(Message::Text(payload.into())).await;
        if let Err(err) = sent {
            self.pending.take(&id);
            return Err(err.into())
        }

        let response = rx.await.map_err(|_| RpcError::ConnectionClosed)?;
        response.into_result()
    }

    /// Like [`call`](Self::call), deserializing the result into `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<String>,
    ) -> Result<T, RpcError> {
        let result = self.call(method, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Number of calls currently waiting for a response.
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    /// Stops the read task and closes the connection.
    pub async fn close(&self) -> Result<(), RpcError> {
        let closed = self.sink.lock().await.close().await;
        self.reader.abort();
        let dropped = self.pending.close();
        debug!(target: "rpc::ws", dropped, "Closed connection");
        match closed {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl fmt::Debug for WsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsClient")
            .field("next_id", &self.next_id)
            .field("pending_calls", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        self.reader.abort();
        self.pending.close();
    }
}

/// Decodes inbound frames until the connection ends.
///
/// Frames that are not valid JSON-RPC responses are skipped; unmatched ids are dropped.
async fn read_loop(mut stream: SplitStream<WsStream>, pending: Arc<PendingCalls>) {
    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(frame)) => {
                debug!(target: "rpc::ws", ?frame, "Node closed the connection");
                break
            }
            Ok(_) => continue,
            Err(err) => {
                warn!(target: "rpc::ws", %err, "Connection read failed");
                break
            }
        };

        let response: Response = match serde_json::from_str(text.as_str()) {
            Ok(response) => response,
            Err(err) => {
                warn!(target: "rpc::ws", %err, "Cannot decode JSON-RPC message");
                continue
            }
        };

        let Some(id) = response.correlation_id() else {
            trace!(target: "rpc::ws", "Dropping message without correlation id");
            continue
        };
        match pending.take(&id) {
            // the caller may have gone away, that's fine
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => trace!(target: "rpc::ws", %id, "Dropping unmatched response"),
        }
    }

    let dropped = pending.close();
    debug!(target: "rpc::ws", dropped, "Read loop finished");
}
