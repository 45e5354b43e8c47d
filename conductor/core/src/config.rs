//! TOML Configuration File Support
//!
//! Settings for the chat client, loaded from
//! `$XDG_CONFIG_HOME/streamchat/config.toml`.
//!
//! # Configuration Priority
//!
//! Highest first:
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [api]
//! endpoint = "https://api.groq.com/openai/v1/chat/completions"
//! model = "llama-3.3-70b-versatile"
//! connect_timeout_ms = 10000
//!
//! [generation]
//! max_tokens = 1024
//! temperature = 0.7
//!
//! [session]
//! key = "chatMessages"
//! data_dir = "/home/me/.local/share/streamchat"
//!
//! [ui]
//! input_limit = 1000
//! ```
//!
//! The API key is normally taken from `GROQ_API_KEY` or
//! `STREAMCHAT_API_KEY` rather than written to the file.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{DEFAULT_ENDPOINT, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};

/// Default model identifier
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Default session storage key
pub const DEFAULT_SESSION_KEY: &str = "chatMessages";

/// Default maximum input length in characters
pub const DEFAULT_INPUT_LIMIT: usize = 1000;

/// Default connection timeout
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Tracks where configuration values came from
///
/// Records the highest-priority layer that changed anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Command-line argument
    Cli,
    /// Environment variable
    Env,
    /// TOML configuration file
    File,
    /// Built-in default
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[api]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiToml {
    /// Chat completions endpoint URL
    pub endpoint: Option<String>,
    /// Model identifier
    pub model: Option<String>,
    /// Bearer token
    pub api_key: Option<String>,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,
}

/// `[generation]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationToml {
    /// Maximum tokens per response
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

/// `[session]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionToml {
    /// Name of the persisted snapshot
    pub key: Option<String>,
    /// Directory holding snapshots and logs
    pub data_dir: Option<PathBuf>,
}

/// `[ui]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiToml {
    /// Maximum input length in characters
    pub input_limit: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// `[api]`
    pub api: ApiToml,
    /// `[generation]`
    pub generation: GenerationToml,
    /// `[session]`
    pub session: SessionToml,
    /// `[ui]`
    pub ui: UiToml,
}

// =============================================================================
// Resolved Settings
// =============================================================================

/// Resolved client settings
#[derive(Clone)]
pub struct ChatSettings {
    /// Chat completions endpoint URL
    pub endpoint: String,
    /// Model identifier
    pub model: String,
    /// Bearer token, if any
    pub api_key: Option<String>,
    /// Maximum tokens per response
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Bound on connection establishment
    pub connect_timeout: Duration,
    /// Name of the persisted snapshot
    pub session_key: String,
    /// Directory holding snapshots and logs
    pub data_dir: PathBuf,
    /// Maximum input length in characters
    pub input_limit: usize,
    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,
    source: ConfigSource,
}

impl std::fmt::Debug for ChatSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSettings")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("connect_timeout", &self.connect_timeout)
            .field("session_key", &self.session_key)
            .field("data_dir", &self.data_dir)
            .field("input_limit", &self.input_limit)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            session_key: DEFAULT_SESSION_KEY.to_string(),
            data_dir: default_data_dir(),
            input_limit: DEFAULT_INPUT_LIMIT,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ChatSettings {
    /// Settings with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest-priority layer that contributed a value
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check values that would make every request fail
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "endpoint must not be empty".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "model must not be empty".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "max_tokens must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        if self.session_key.is_empty()
            || self.session_key.contains(['/', '\\'])
            || self.session_key.starts_with('.')
        {
            return Err(ConfigError::ValidationError(format!(
                "session key {:?} is not a valid file name",
                self.session_key
            )));
        }
        if self.input_limit == 0 {
            return Err(ConfigError::ValidationError(
                "input_limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Default configuration file path
///
/// `$XDG_CONFIG_HOME/streamchat/config.toml`, typically
/// `~/.config/streamchat/config.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("streamchat").join("config.toml"))
}

/// Default data directory for snapshots and logs
#[must_use]
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("streamchat"))
        .unwrap_or_else(|| PathBuf::from(".streamchat"))
}

/// Load configuration from the default file and the process environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read or parsed.
/// A missing config file is not an error.
pub fn load_config() -> Result<ChatSettings, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the process environment
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ChatSettings, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with a custom environment lookup
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<ChatSettings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ChatSettings::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ChatToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);

    Ok(config)
}

fn apply_toml_config(config: &mut ChatSettings, toml: &ChatToml) {
    if let Some(ref endpoint) = toml.api.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(ref model) = toml.api.model {
        config.model = model.clone();
    }
    if let Some(ref key) = toml.api.api_key {
        config.api_key = Some(key.clone());
    }
    if let Some(ms) = toml.api.connect_timeout_ms {
        config.connect_timeout = Duration::from_millis(ms);
    }

    if let Some(max_tokens) = toml.generation.max_tokens {
        config.max_tokens = max_tokens;
    }
    if let Some(temperature) = toml.generation.temperature {
        config.temperature = temperature;
    }

    if let Some(ref key) = toml.session.key {
        config.session_key = key.clone();
    }
    if let Some(ref dir) = toml.session.data_dir {
        config.data_dir = dir.clone();
    }

    if let Some(limit) = toml.ui.input_limit {
        config.input_limit = limit;
    }
}

fn apply_env_config<F>(config: &mut ChatSettings, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let mut touched = false;

    if let Some(endpoint) = env("STREAMCHAT_ENDPOINT") {
        config.endpoint = endpoint;
        touched = true;
    }
    if let Some(model) = env("STREAMCHAT_MODEL") {
        config.model = model;
        touched = true;
    }
    // STREAMCHAT_API_KEY wins over the provider-specific name
    if let Some(key) = env("STREAMCHAT_API_KEY").or_else(|| env("GROQ_API_KEY")) {
        config.api_key = Some(key);
        touched = true;
    }
    if let Some(ms) = env("STREAMCHAT_CONNECT_TIMEOUT").and_then(|v| v.parse::<u64>().ok()) {
        config.connect_timeout = Duration::from_millis(ms);
        touched = true;
    }
    if let Some(n) = env("STREAMCHAT_MAX_TOKENS").and_then(|v| v.parse::<u32>().ok()) {
        config.max_tokens = n;
        touched = true;
    }
    if let Some(t) = env("STREAMCHAT_TEMPERATURE").and_then(|v| v.parse::<f32>().ok()) {
        config.temperature = t;
        touched = true;
    }
    if let Some(key) = env("STREAMCHAT_SESSION_KEY") {
        config.session_key = key;
        touched = true;
    }
    if let Some(dir) = env("STREAMCHAT_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
        touched = true;
    }
    if let Some(n) = env("STREAMCHAT_INPUT_LIMIT").and_then(|v| v.parse::<usize>().ok()) {
        config.input_limit = n;
        touched = true;
    }

    if touched {
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// CLI overrides, applied after [`load_config`]
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Endpoint override
    pub endpoint: Option<String>,
    /// Model override
    pub model: Option<String>,
    /// Max tokens override
    pub max_tokens: Option<u32>,
    /// Temperature override
    pub temperature: Option<f32>,
    /// Session key override
    pub session_key: Option<String>,
    /// Data directory override
    pub data_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Create an empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set endpoint override
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Set model override
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    /// Set session key override
    #[must_use]
    pub fn with_session_key(mut self, key: String) -> Self {
        self.session_key = Some(key);
        self
    }

    /// Set data directory override
    #[must_use]
    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        self.data_dir = Some(dir);
        self
    }

    fn is_empty(&self) -> bool {
        self.endpoint.is_none()
            && self.model.is_none()
            && self.max_tokens.is_none()
            && self.temperature.is_none()
            && self.session_key.is_none()
            && self.data_dir.is_none()
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut ChatSettings) {
        if self.is_empty() {
            return;
        }
        config.source = ConfigSource::Cli;

        if let Some(ref endpoint) = self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(ref model) = self.model {
            config.model = model.clone();
        }
        if let Some(n) = self.max_tokens {
            config.max_tokens = n;
        }
        if let Some(t) = self.temperature {
            config.temperature = t;
        }
        if let Some(ref key) = self.session_key {
            config.session_key = key.clone();
        }
        if let Some(ref dir) = self.data_dir {
            config.data_dir = dir.clone();
        }
    }
}
