use std::path::PathBuf;
use std::time::Duration;

use dealcoach_store::StoreConfig;

/// Dealcoach service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// Anthropic API key; the server refuses to start without one
    pub anthropic_api_key: Option<String>,
    /// Model used for coaching analysis
    pub model: String,
    /// Directory where ended conversations are persisted
    pub conversations_dir: PathBuf,
    /// Persist sessions automatically when they end
    pub autosave: bool,
    /// Idle time before a session is swept by cleanup
    pub session_timeout: Duration,
    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3001,
            anthropic_api_key: None,
            model: "claude-3-haiku-20240307".to_string(),
            conversations_dir: PathBuf::from("conversations"),
            autosave: true,
            session_timeout: Duration::from_secs(30 * 60),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: std::env::var("DEALCOACH_BIND").unwrap_or(defaults.bind_address),
            port: std::env::var("DEALCOACH_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            model: std::env::var("DEALCOACH_MODEL").unwrap_or(defaults.model),
            conversations_dir: std::env::var("DEALCOACH_CONVERSATIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.conversations_dir),
            autosave: std::env::var("DEALCOACH_AUTOSAVE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.autosave),
            session_timeout: std::env::var("DEALCOACH_SESSION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_timeout),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            session_timeout: self.session_timeout,
            conversations_dir: self.conversations_dir.clone(),
            autosave: self.autosave,
            ..Default::default()
        }
    }
}
