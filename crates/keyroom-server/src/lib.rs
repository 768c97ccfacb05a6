//! HTTP and `WebSocket` surface for a Keyroom session.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/{username}`) where each upgraded
//!   connection becomes a participant of the shared [`Hub`]
//! - **REST endpoints** for health checks and the current participant
//!   list
//! - **Status page** (`GET /`) with the session's head count
//!
//! # Architecture
//!
//! The server owns no session state. Every handler holds a clone of the
//! [`Hub`] handle from [`AppState`]; the hub task is spawned by the
//! binary before the server starts. [`transport`] adapts an Axum socket
//! to the reader/writer traits the participant loops drive.
//!
//! [`Hub`]: keyroom_core::Hub

pub mod error;
pub mod handlers;
pub mod identity;
pub mod router;
pub mod server;
pub mod state;
pub mod transport;
pub mod ws;

pub use error::{ApiError, ServerError};
pub use router::build_router;
pub use server::{bind, serve, start_server};
pub use state::AppState;
