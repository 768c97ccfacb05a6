//! Error types for a participant's connection.
//!
//! Every variant is local to one participant: it ends that
//! participant's loops and triggers the normal disconnect cleanup, and
//! never reaches the hub's control loop or any other participant.
//! Backpressure eviction and redundant register/unregister requests are
//! not errors at all; the hub handles them inline.

/// Errors that end a participant's read or write loop.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// An inbound frame was not a valid envelope.
    #[error("decode error: {0}")]
    Decode(#[source] serde_json::Error),

    /// An outbound envelope could not be serialized.
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),

    /// The underlying connection failed to read or write.
    #[error("transport error: {0}")]
    Transport(String),

    /// A read or write did not complete within its deadline.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    /// The hub task is gone; the process is shutting down.
    #[error("hub is closed")]
    HubClosed,
}

impl SessionError {
    /// Whether this error came from a malformed payload rather than the
    /// connection itself. Only used to pick a log level.
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}
