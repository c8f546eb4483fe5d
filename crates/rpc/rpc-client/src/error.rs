use thiserror::Error;

/// Errors returned by [`WsClient`](crate::WsClient) calls and the typed chain queries.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Error occurred during `WebSocket` communication.
    #[error("websocket error: {0}")]
    Transport(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    /// Error occurred during JSON serialization/deserialization.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The connection was closed before a response arrived.
    #[error("connection closed")]
    ConnectionClosed,

    /// The node answered with a JSON-RPC error object.
    #[error("failed response: {code}: {message}")]
    FailedResponse {
        /// Error code reported by the node.
        code: i64,
        /// Error message reported by the node.
        message: String,
    },

    /// The result decoded but its content is unusable.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RpcError {
    /// Returns `true` if the node itself rejected the call.
    pub const fn is_failed_response(&self) -> bool {
        matches!(self, Self::FailedResponse { .. })
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RpcError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}
