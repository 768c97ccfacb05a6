//! JSON encoding of [`EventEnvelope`]s.
//!
//! The hub never looks at transport framing; it sees one payload per
//! frame and this module turns that payload into an envelope and back.

use keyroom_types::EventEnvelope;

use crate::error::SessionError;

/// Decode one inbound frame payload.
///
/// # Errors
///
/// Returns [`SessionError::Decode`] if the bytes are not a JSON envelope.
/// An unknown `eventName` is not an error; it decodes to
/// [`EventKind::Unrecognized`](keyroom_types::EventKind::Unrecognized).
pub fn decode(payload: &[u8]) -> Result<EventEnvelope, SessionError> {
    serde_json::from_slice(payload).map_err(SessionError::Decode)
}

/// Encode one outbound envelope as a JSON text frame.
///
/// # Errors
///
/// Returns [`SessionError::Encode`] if serialization fails.
pub fn encode(envelope: &EventEnvelope) -> Result<String, SessionError> {
    serde_json::to_string(envelope).map_err(SessionError::Encode)
}
