//! Enumeration types exchanged over the session connection.

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

/// The kind of an [`EventEnvelope`](crate::EventEnvelope).
///
/// Serialized as the `eventName` string the browser client already
/// speaks. Any name the hub does not know decodes to
/// [`EventKind::Unrecognized`] instead of failing, so newer clients can
/// talk to an older hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// A participant entered the session.
    #[serde(rename = "join")]
    Join,
    /// A participant left the session.
    #[serde(rename = "disconnect")]
    Disconnect,
    /// A key was pressed on the shared keyboard.
    #[serde(rename = "keyboardPress")]
    KeyPress,
    /// Acknowledgement of a key press. Outbound only.
    #[serde(rename = "keyBdPressResponse")]
    KeyPressResponse,
    /// Begin capturing the sender's own key presses.
    #[serde(rename = "recordStart")]
    RecordStart,
    /// Stop capturing; the captured buffer is kept.
    #[serde(rename = "recordStop")]
    RecordStop,
    /// Replay the sender's captured buffer to the group.
    #[serde(rename = "recordPlay")]
    RecordPlay,
    /// Any event name this hub does not understand. Never sent.
    #[serde(rename = "unrecognized")]
    #[ts(skip)]
    Unrecognized,
}

impl EventKind {
    /// The wire name of this kind.
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Disconnect => "disconnect",
            Self::KeyPress => "keyboardPress",
            Self::KeyPressResponse => "keyBdPressResponse",
            Self::RecordStart => "recordStart",
            Self::RecordStop => "recordStop",
            Self::RecordPlay => "recordPlay",
            Self::Unrecognized => "unrecognized",
        }
    }

    /// The kind named `name` on the wire, or [`Self::Unrecognized`].
    pub fn from_wire_name(name: &str) -> Self {
        match name {
            "join" => Self::Join,
            "disconnect" => Self::Disconnect,
            "keyboardPress" => Self::KeyPress,
            "keyBdPressResponse" => Self::KeyPressResponse,
            "recordStart" => Self::RecordStart,
            "recordStop" => Self::RecordStop,
            "recordPlay" => Self::RecordPlay,
            _ => Self::Unrecognized,
        }
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_wire_name(&name))
    }
}

impl core::fmt::Display for EventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.wire_name())
    }
}
