//! Connection registry, broadcast hub, and timed capture/replay for the
//! Keyroom live session.
//!
//! # Architecture
//!
//! ```text
//! transport --> read loop --> route --> Hub task --> outbound queues --> write loops --> transport
//!                               |                        ^
//!                               +--> Recorder --> replay task
//! ```
//!
//! One [`Hub`] task owns the membership set and performs every
//! broadcast. Each participant runs a read loop and a write loop; a
//! replay runs on its own short-lived task. Tasks only talk through
//! bounded channels.
//!
//! # Modules
//!
//! - [`hub`] -- registry and dispatcher task, backpressure eviction
//! - [`participant`] -- the per-connection read and write loops
//! - [`routing`] -- what each inbound event kind does
//! - [`capture`] -- per-participant recording buffer
//! - [`player`] -- timed replay of a recording
//! - [`transport`] -- the reader/writer traits a transport implements
//! - [`codec`] -- JSON envelope encoding
//! - [`config`] -- `keyroom-config.yaml` loading
//! - [`error`] -- [`SessionError`]
//!
//! [`Hub`]: hub::Hub
//! [`SessionError`]: error::SessionError

pub mod capture;
pub mod codec;
pub mod config;
pub mod error;
pub mod hub;
pub mod participant;
pub mod player;
pub mod routing;
pub mod transport;

pub use config::{ConfigError, HubConfig, KeyroomConfig};
pub use error::SessionError;
pub use hub::Hub;
pub use participant::{Participant, create_participant};
pub use transport::{Frame, FrameReader, FrameWriter};
