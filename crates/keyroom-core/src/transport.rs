//! The connection seam between the hub and a concrete transport.
//!
//! A participant drives its connection from two independent tasks, so a
//! transport is handed over already split into a [`FrameReader`] and a
//! [`FrameWriter`]. Deadlines are applied by the participant loops with
//! `tokio::time::timeout`; implementations only move frames.
//!
//! Dropping both halves closes the underlying connection.

use std::future::Future;

use crate::error::SessionError;

/// One inbound frame, with transport framing already stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A UTF-8 payload.
    Text(String),
    /// A binary payload. Decoded the same way as text.
    Binary(Vec<u8>),
    /// A pong or ping from the peer. Carries no payload but proves the
    /// peer is alive, which restarts the read deadline.
    Liveness,
}

impl Frame {
    /// The payload bytes, if this frame carries one.
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Self::Text(text) => Some(text.as_bytes()),
            Self::Binary(bytes) => Some(bytes),
            Self::Liveness => None,
        }
    }
}

/// The receiving half of a connection.
pub trait FrameReader: Send + 'static {
    /// Wait for the next frame.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly.
    fn next_frame(&mut self) -> impl Future<Output = Result<Option<Frame>, SessionError>> + Send;
}

/// The sending half of a connection.
pub trait FrameWriter: Send + 'static {
    /// Send one encoded envelope as a text frame.
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Send a liveness probe.
    fn send_ping(&mut self) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Tell the peer the session is over.
    fn close(&mut self) -> impl Future<Output = Result<(), SessionError>> + Send;
}
