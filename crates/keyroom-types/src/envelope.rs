//! The event envelope: one discrete unit exchanged over a connection.
//!
//! On the wire an envelope is a JSON object of the form
//!
//! ```json
//! { "eventName": "keyboardPress",
//!   "eventPayload": { "username": "ada4821", "message": "C4", "time": 1000 } }
//! ```
//!
//! Unknown extra fields are ignored on read. Missing payload fields take
//! their empty defaults so control events such as `recordStart` may be
//! sent with an empty payload.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::EventKind;

/// Payload carried by every [`EventEnvelope`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventPayload {
    /// Display name of the participant the event is about.
    #[serde(default, rename = "username")]
    pub user: String,
    /// Event body, e.g. the key that was pressed.
    #[serde(default)]
    pub message: String,
    /// Client timestamp in milliseconds.
    #[serde(default, rename = "time")]
    #[ts(type = "number")]
    pub timestamp_millis: i64,
}

impl EventPayload {
    /// Build a payload from its parts.
    pub fn new(user: impl Into<String>, message: impl Into<String>, timestamp_millis: i64) -> Self {
        Self {
            user: user.into(),
            message: message.into(),
            timestamp_millis,
        }
    }
}

/// A single event broadcast through the session.
///
/// Envelopes are never mutated after construction; the hub shares one
/// allocation between all recipients of a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventEnvelope {
    /// What happened.
    #[serde(rename = "eventName")]
    pub name: EventKind,
    /// Who it happened to, and the details.
    #[serde(default, rename = "eventPayload")]
    pub payload: EventPayload,
}

impl EventEnvelope {
    /// Build an envelope from a kind and payload.
    pub const fn new(name: EventKind, payload: EventPayload) -> Self {
        Self { name, payload }
    }

    /// A `join` announcement naming `user`.
    pub fn join(user: impl Into<String>, timestamp_millis: i64) -> Self {
        Self::new(EventKind::Join, EventPayload::new(user, "", timestamp_millis))
    }

    /// A `disconnect` announcement naming `user`.
    pub fn disconnect(user: impl Into<String>, timestamp_millis: i64) -> Self {
        Self::new(
            EventKind::Disconnect,
            EventPayload::new(user, "", timestamp_millis),
        )
    }

    /// A key press by `user`.
    pub fn key_press(
        user: impl Into<String>,
        message: impl Into<String>,
        timestamp_millis: i64,
    ) -> Self {
        Self::new(
            EventKind::KeyPress,
            EventPayload::new(user, message, timestamp_millis),
        )
    }

    /// Display name carried in the payload.
    pub fn user(&self) -> &str {
        &self.payload.user
    }
}
