//! Streaming error types.

/// Streaming errors.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The connection attempt failed (token or handshake).
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The socket failed after the handshake.
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// A subscription is already active; one channel carries one
    /// subscription for its whole life.
    #[error("A subscription is already active for this channel")]
    AlreadySubscribed,

    /// The channel has been disposed.
    #[error("The subscription channel has been disposed")]
    Disposed,
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;
