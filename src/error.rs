//! Crate-level error types.
//!
//! Most failures in this crate are recoverable and end up logged rather
//! than returned; [`RelayError`] covers the ones that cross a public API.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// An environment variable was missing, inconsistent, or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A WebSocket operation (connect, send, receive) failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A REST request failed or returned a non-success status.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading or writing the persisted notification record failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An incoming message did not have the expected shape.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A platform seam (notification display, window enumeration, window
    /// messaging) rejected the request.
    #[error("platform error: {0}")]
    Platform(String),
}
