//! Configuration loading, validation, and management for voxloop.
//!
//! Process-wide settings come from `~/.voxloop/config.toml` and are then
//! overlaid with an [`EnvSnapshot`] captured once at startup. Per-request
//! overrides are layered on top by [`resolve`].

pub mod resolve;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use voxloop_core::ProcessDefaults;

pub use resolve::{
    DEFAULT_API_BASE, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT, ResolvedModelConfig, resolve,
};

/// Tool settings that are also read from well-known environment variables.
const TOOL_SETTING_ENV: &[(&str, &str)] = &[
    ("google_api_key", "GOOGLE_API_KEY"),
    ("google_cx", "GOOGLE_CX"),
    ("search1api_key", "SEARCH1API_KEY"),
];

/// Any `VOXLOOP_TOOL_<NAME>` variable becomes the tool setting `<name>`.
const TOOL_SETTING_PREFIX: &str = "VOXLOOP_TOOL_";

/// History backends understood by the binary.
pub const HISTORY_BACKENDS: &[&str] = &["memory", "file", "sqlite"];

/// An immutable copy of the process environment, taken once at startup.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build a snapshot from explicit pairs (used in tests).
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// A non-empty variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.vars.iter()
    }
}

/// The root configuration structure.
///
/// Maps directly to `~/.voxloop/config.toml`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// Completion API credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default completion model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// System prompt replacing the built-in one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Tool settings and credentials (e.g. `google_cx`)
    #[serde(default)]
    pub tools: BTreeMap<String, String>,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub agent: AgentConfig,
}

fn redact<T>(s: &Option<T>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt.as_ref().map(|_| "[SET]"))
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("gateway", &self.gateway)
            .field("history", &self.history)
            .field("agent", &self.agent)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8787
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// "memory", "file", or "sqlite"
    #[serde(default = "default_history_backend")]
    pub backend: String,

    /// Backend file path (defaults under `~/.voxloop/`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_history_backend() -> String {
    "sqlite".into()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            backend: default_history_backend(),
            path: None,
        }
    }
}

impl HistoryConfig {
    /// The configured path, or the backend's default location.
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return PathBuf::from(path);
        }
        let file = match self.backend.as_str() {
            "file" => "history.jsonl",
            _ => "history.db",
        };
        AppConfig::config_dir().join(file)
    }
}

/// Orchestration loop limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model calls per turn
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    #[serde(default = "default_model_timeout")]
    pub model_timeout_secs: u64,

    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    /// Model-name substrings whose tool arguments arrive double-encoded
    #[serde(default = "default_double_encoded")]
    pub double_encoded_argument_models: Vec<String>,
}

fn default_max_rounds() -> u32 {
    10
}
fn default_model_timeout() -> u64 {
    120
}
fn default_tool_timeout() -> u64 {
    30
}
fn default_double_encoded() -> Vec<String> {
    vec!["gemma".into()]
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            model_timeout_secs: default_model_timeout(),
            tool_timeout_secs: default_tool_timeout(),
            double_encoded_argument_models: default_double_encoded(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path` (or `~/.voxloop/config.toml`), then
    /// overlay the environment snapshot and validate.
    pub fn load(path: Option<&Path>, env: &EnvSnapshot) -> Result<Self, ConfigError> {
        let default_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(path.unwrap_or(&default_path))?;
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path (no env overlay).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Overlay environment values. Environment wins over the config file.
    pub fn apply_env(&mut self, env: &EnvSnapshot) -> Result<(), ConfigError> {
        if let Some(v) = env.get("API_BASE") {
            self.api_base = Some(v.to_string());
        }
        if let Some(v) = env.get("API_KEY") {
            self.api_key = Some(v.to_string());
        }
        if let Some(v) = env.get("MODEL") {
            self.model = Some(v.to_string());
        }
        if let Some(v) = env.get("SYSTEM_PROMPT") {
            self.system_prompt = Some(v.to_string());
        }

        for (setting, var) in TOOL_SETTING_ENV {
            if let Some(v) = env.get(var) {
                self.tools.insert((*setting).to_string(), v.to_string());
            }
        }
        for (key, value) in env.iter() {
            if let Some(name) = key.strip_prefix(TOOL_SETTING_PREFIX) {
                if !name.is_empty() && !value.is_empty() {
                    self.tools.insert(name.to_lowercase(), value.clone());
                }
            }
        }

        if let Some(v) = env.get("VOXLOOP_HOST") {
            self.gateway.host = v.to_string();
        }
        if let Some(v) = env.get("VOXLOOP_PORT") {
            self.gateway.port = v.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "VOXLOOP_PORT".into(),
                reason: format!("'{v}' is not a port number"),
            })?;
        }
        if let Some(v) = env.get("VOXLOOP_HISTORY_BACKEND") {
            self.history.backend = v.to_string();
        }
        if let Some(v) = env.get("VOXLOOP_HISTORY_PATH") {
            self.history.path = Some(v.to_string());
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".voxloop")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_rounds must be at least 1".into(),
            ));
        }
        if self.agent.model_timeout_secs == 0 || self.agent.tool_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent timeouts must be greater than 0".into(),
            ));
        }
        if !HISTORY_BACKENDS.contains(&self.history.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown history backend '{}' (expected one of: {})",
                self.history.backend,
                HISTORY_BACKENDS.join(", ")
            )));
        }
        Ok(())
    }

    /// The process-wide layer handed to every request.
    pub fn process_defaults(&self) -> ProcessDefaults {
        ProcessDefaults {
            api_base: self.api_base.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            system_prompt: self.system_prompt.clone(),
            settings: self.tools.clone(),
        }
    }

    /// Render the effective configuration as TOML with secrets removed.
    pub fn redacted_toml(&self) -> String {
        let mut copy = self.clone();
        if copy.api_key.is_some() {
            copy.api_key = Some("[REDACTED]".into());
        }
        for value in copy.tools.values_mut() {
            *value = "[REDACTED]".into();
        }
        toml::to_string_pretty(&copy).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid environment variable {var}: {reason}")]
    InvalidEnv { var: String, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
