//! `WebSocket` entry point of the session.
//!
//! Clients connect to `GET /ws/{username}`. The requested name is
//! cleaned up and made distinct, the socket is upgraded, and the
//! connection is handed to the core as a new participant. From then on
//! the participant loops own the socket; this handler only waits for
//! them to finish.

use std::sync::Arc;

use axum::extract::ws::WebSocket;
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use keyroom_core::create_participant;
use tracing::{debug, warn};

use crate::identity;
use crate::state::AppState;
use crate::transport;

/// Upgrade an HTTP request to a session connection.
///
/// # Route
///
/// `GET /ws/{username}`
pub async fn ws_session(
    ws: WebSocketUpgrade,
    Path(username): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let identity = identity::disambiguate(&username);
    let limit = state.hub_config.max_frame_bytes;
    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |socket| join_session(socket, identity, state))
}

async fn join_session(socket: WebSocket, identity: String, state: Arc<AppState>) {
    let (reader, writer) = transport::split(socket);
    match create_participant(&state.hub, reader, writer, &identity, &state.hub_config).await {
        Ok(participant) => {
            debug!(participant = %participant.id, username = participant.username, "WebSocket session started");
            participant.closed().await;
        }
        Err(e) => warn!(identity, error = %e, "Rejected WebSocket session"),
    }
}
