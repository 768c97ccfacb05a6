//! Configuration loading and typed config structures for Keyroom.
//!
//! The canonical configuration lives in `keyroom-config.yaml` in the
//! working directory. Every section and field has a default, so an
//! empty or missing file yields a usable configuration.
//!
//! ```yaml
//! hub:
//!   outbound_queue_capacity: 256
//!   heartbeat_interval_ms: 54000
//!   read_timeout_ms: 60000
//! server:
//!   port: 8000
//!   static_dir: ui/dist
//! logging:
//!   level: info
//!   json: false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The values parsed but are inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level Keyroom configuration.
///
/// Mirrors the structure of `keyroom-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct KeyroomConfig {
    /// Hub and connection tuning.
    #[serde(default)]
    pub hub: HubConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl KeyroomConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for the listener:
    /// - `PORT` overrides `server.port`
    /// - `KEYROOM_HOST` overrides `server.host`
    /// - `KEYROOM_STATIC_DIR` overrides `server.static_dir`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if the values fail validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if the values fail validation.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a map.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.server.apply_env_overrides();
        config.hub.validate()?;
        Ok(config)
    }
}

/// Hub and per-connection tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HubConfig {
    /// Envelopes buffered per participant before it is evicted as a slow
    /// consumer.
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,

    /// Register/unregister/broadcast requests buffered in front of the hub.
    #[serde(default = "default_request_queue_capacity")]
    pub request_queue_capacity: usize,

    /// Interval between liveness pings sent to each peer.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// How long a connection may stay silent (no frame, no pong) before
    /// it is torn down.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Upper bound on a single frame write.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// Largest inbound frame accepted, in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// Whether a replay is also sent back to the participant who recorded it.
    #[serde(default)]
    pub replay_includes_sender: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_queue_capacity: default_outbound_queue_capacity(),
            request_queue_capacity: default_request_queue_capacity(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
            replay_includes_sender: false,
        }
    }
}

impl HubConfig {
    /// Check that the values are usable together.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a queue capacity or timeout is
    /// zero, or if the heartbeat would not fire before the read timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.outbound_queue_capacity == 0 || self.request_queue_capacity == 0 {
            return Err(ConfigError::Invalid(String::from(
                "queue capacities must be at least 1",
            )));
        }
        if self.write_timeout_ms == 0 || self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::Invalid(String::from(
                "write timeout and heartbeat interval must be non-zero",
            )));
        }
        if self.heartbeat_interval_ms >= self.read_timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "heartbeat_interval_ms ({}) must be shorter than read_timeout_ms ({})",
                self.heartbeat_interval_ms, self.read_timeout_ms
            )));
        }
        Ok(())
    }

    /// Heartbeat interval as a [`Duration`].
    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Read timeout as a [`Duration`].
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Write timeout as a [`Duration`].
    pub const fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// The host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the browser client. When set, its files are
    /// served at `/`; when unset, `/` is a plain status page.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

impl ServerConfig {
    /// Apply `PORT`, `KEYROOM_HOST` and `KEYROOM_STATIC_DIR` from the
    /// environment, if set.
    ///
    /// An unparseable `PORT` is ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PORT") {
            match val.parse() {
                Ok(port) => self.port = port,
                Err(e) => tracing::warn!(value = val, error = %e, "ignoring invalid PORT"),
            }
        }
        if let Ok(val) = std::env::var("KEYROOM_HOST") {
            self.host = val;
        }
        if let Some(val) = std::env::var_os("KEYROOM_STATIC_DIR") {
            self.static_dir = Some(PathBuf::from(val));
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of the human-readable format.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_outbound_queue_capacity() -> usize {
    256
}

const fn default_request_queue_capacity() -> usize {
    1024
}

// 9/10 of the read timeout, so a ping always lands before the peer gives up.
const fn default_heartbeat_interval_ms() -> u64 {
    54_000
}

const fn default_read_timeout_ms() -> u64 {
    60_000
}

const fn default_write_timeout_ms() -> u64 {
    10_000
}

const fn default_max_frame_bytes() -> usize {
    4096
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    String::from("info")
}
