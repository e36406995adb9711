//! Application configuration.
//!
//! Loaded from TOML with priority:
//! 1. explicit `--config` path
//! 2. `{data_path}/config.toml`
//! 3. `SCENECRAFT_CONFIG` env var (TOML text)
//! 4. defaults
//!
//! `OPENAI_API_KEY` always overrides the file's `backend.api_key`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::ScriptError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub server: ServerConfig,
    pub session: SessionConfig,
}

/// Settings for the hosted generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of an OpenAI-compatible API (default: "https://api.openai.com/v1")
    pub base_url: String,
    /// Bearer token; omitted for local endpoints that need none
    pub api_key: Option<String>,
    /// Model used for both the turn call and the edit call
    pub model: String,
    /// Sampling temperature of the conversational turn (default: 0.8)
    pub chat_temperature: f32,
    /// Sampling temperature of the edit call (default: 0.7)
    pub edit_temperature: f32,
    /// Token cap of the edit call (default: 800)
    pub edit_max_tokens: u32,
    /// Per-request HTTP timeout in seconds (default: 60)
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            chat_temperature: 0.8,
            edit_temperature: 0.7,
            edit_max_tokens: 800,
            request_timeout_secs: 60,
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (default: "127.0.0.1:3000")
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds after which an in-flight chat turn is abandoned (default: 45)
    pub turn_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            turn_timeout_secs: 45,
        }
    }
}

impl SessionConfig {
    pub fn turn_timeout(&self) -> Duration {
        Duration::from_secs(self.turn_timeout_secs)
    }
}

/// Resolve the data directory.
///
/// Priority: explicit path > SCENECRAFT_DATA_PATH env > ~/.scenecraft
pub fn resolve_data_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var("SCENECRAFT_DATA_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".scenecraft"))
                .unwrap_or_else(|| PathBuf::from(".scenecraft"))
        })
}

/// Load configuration for the given data directory.
pub fn load_config(explicit: Option<&Path>, data_path: &Path) -> Result<AppConfig, ScriptError> {
    let mut config = if let Some(path) = explicit {
        read_config_file(path)?
    } else {
        let default_path = data_path.join("config.toml");
        if default_path.exists() {
            read_config_file(&default_path)?
        } else if let Ok(text) = std::env::var("SCENECRAFT_CONFIG") {
            info!("Loaded config from SCENECRAFT_CONFIG env");
            parse_config(&text, "SCENECRAFT_CONFIG")?
        } else {
            AppConfig::default()
        }
    };

    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        if !key.trim().is_empty() {
            config.backend.api_key = Some(key);
        }
    }

    Ok(config)
}

fn read_config_file(path: &Path) -> Result<AppConfig, ScriptError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ScriptError::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let config = parse_config(&contents, &path.display().to_string())?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Parse TOML config text; `origin` is only used in error messages.
pub fn parse_config(text: &str, origin: &str) -> Result<AppConfig, ScriptError> {
    toml::from_str(text)
        .map_err(|e| ScriptError::Config(format!("Failed to parse {}: {}", origin, e)))
}
