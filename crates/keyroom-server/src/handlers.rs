//! REST endpoint handlers.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/status` | Minimal HTML status page, also `/` without a browser client |
//! | `GET` | `/health` | Liveness probe |
//! | `GET` | `/api/participants` | Display names currently in the session |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::{Html, IntoResponse};

use crate::error::ApiError;
use crate::state::AppState;

/// Response body of `GET /api/participants`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ParticipantsResponse {
    /// Number of connected participants.
    pub count: usize,
    /// Their display names, sorted.
    pub participants: Vec<String>,
}

/// Serve a minimal HTML page with the session head count.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let count = state.hub.members().await.map_or(0, |names| names.len());
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Keyroom</title></head>
<body>
<h1>Keyroom</h1>
<p>Participants connected: {count}</p>
<ul>
<li>Session: <code>/ws/{{username}}</code></li>
<li><a href="/api/participants">/api/participants</a></li>
<li><a href="/health">/health</a></li>
</ul>
</body>
</html>"#
    ))
}

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// List the display names currently in the session.
///
/// # Errors
///
/// Returns [`ApiError::Unavailable`] if the hub has stopped.
pub async fn list_participants(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ParticipantsResponse>, ApiError> {
    let participants = state.hub.members().await?;
    Ok(Json(ParticipantsResponse {
        count: participants.len(),
        participants,
    }))
}
