//! Shared application state for the HTTP handlers.

use std::path::PathBuf;

use keyroom_core::{Hub, HubConfig};

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Handle to the session hub.
    pub hub: Hub,
    /// Per-connection settings handed to each new participant.
    pub hub_config: HubConfig,
    /// Browser client directory served at `/`, if any.
    pub static_dir: Option<PathBuf>,
}

impl AppState {
    /// Create state around an already spawned hub, with no browser
    /// client.
    pub const fn new(hub: Hub, hub_config: HubConfig) -> Self {
        Self {
            hub,
            hub_config,
            static_dir: None,
        }
    }

    /// Serve the browser client from `dir`.
    #[must_use]
    pub fn with_static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }
}
