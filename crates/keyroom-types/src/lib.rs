//! Shared type definitions for the Keyroom live session hub.
//!
//! These are the types that cross the wire between the hub and the
//! browser keyboard client. Wire types derive `ts-rs` so the client can
//! import matching `TypeScript` definitions.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper identifying a connection actor
//! - [`enums`] -- [`EventKind`], the `eventName` of every envelope
//! - [`envelope`] -- [`EventEnvelope`] and its [`EventPayload`]

pub mod enums;
pub mod envelope;
pub mod ids;

pub use enums::EventKind;
pub use envelope::{EventEnvelope, EventPayload};
pub use ids::ParticipantId;
