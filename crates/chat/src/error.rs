use {parlor_protocol::ProtocolError, tokio_tungstenite::tungstenite};

/// Errors from the realtime channel.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The broker answered `CONNECT` with an `ERROR` frame.
    #[error("broker rejected connection: {0}")]
    Rejected(String),

    #[error("connection closed")]
    Closed,

    #[error("not connected")]
    NotConnected,

    #[error("invalid message payload: {0}")]
    Json(#[from] serde_json::Error),
}
