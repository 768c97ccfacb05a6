//! `keyroom`: the live session server.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `keyroom-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Spawn the session hub
//! 4. Serve HTTP and `WebSocket` until Ctrl-C
//!
//! Configuration is read before logging starts because the log level
//! and format come from it.

mod error;

use std::path::Path;
use std::sync::Arc;

use keyroom_core::config::LoggingConfig;
use keyroom_core::{Hub, KeyroomConfig};
use keyroom_server::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

const CONFIG_PATH: &str = "keyroom-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the server
/// cannot bind its port.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let (config, from_file) = load_config(Path::new(CONFIG_PATH))?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("keyroom starting");
    if from_file {
        info!(path = CONFIG_PATH, "Configuration loaded");
    } else {
        info!(path = CONFIG_PATH, "Config file not found, using defaults");
    }
    info!(
        host = config.server.host,
        port = config.server.port,
        outbound_queue_capacity = config.hub.outbound_queue_capacity,
        heartbeat_interval_ms = config.hub.heartbeat_interval_ms,
        read_timeout_ms = config.hub.read_timeout_ms,
        replay_includes_sender = config.hub.replay_includes_sender,
        "Session settings"
    );

    // 3. Spawn the hub.
    let (hub, hub_task) = Hub::spawn(&config.hub);
    if let Some(dir) = &config.server.static_dir {
        info!(dir = %dir.display(), "Serving browser client");
    }
    let state = Arc::new(
        AppState::new(hub, config.hub.clone()).with_static_dir(config.server.static_dir.clone()),
    );

    // 4. Serve until Ctrl-C.
    keyroom_server::start_server(&config.server, state, shutdown_signal()).await?;

    // Open sessions still hold hub handles; they end with the runtime.
    hub_task.abort();
    info!("keyroom stopped");
    Ok(())
}

/// Read the config file at `path`, or fall back to defaults when it
/// does not exist. Environment overrides apply either way.
///
/// The flag is `true` when the file was read.
fn load_config(path: &Path) -> Result<(KeyroomConfig, bool), EngineError> {
    if path.exists() {
        Ok((KeyroomConfig::from_file(path)?, true))
    } else {
        Ok((KeyroomConfig::parse("")?, false))
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C, shutting down");
        return;
    }
    info!("Ctrl-C received, shutting down");
}
