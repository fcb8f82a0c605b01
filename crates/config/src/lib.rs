//! Configuration loading, validation, and management for DocBot.
//!
//! Loads configuration from `~/.docbot/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Term alphabet of the lexical scorer: Latin, Cyrillic, and the period.
pub const DEFAULT_TERM_PATTERN: &str = "[a-zA-Zа-яА-Я.]+";

/// The root configuration structure.
///
/// Maps directly to `~/.docbot/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Document retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Completion model settings
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Telegram bot settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Question/answer log settings
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Directory holding the documentation corpus
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,

    /// File extensions loaded from `docs_dir` (without the dot)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Upper bound on the assembled context, in characters
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// Number of ranked documents considered for the context
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Question terms shorter than this are ignored
    #[serde(default = "default_min_term_len")]
    pub min_term_len: usize,

    /// Regex character class that defines a question term
    #[serde(default = "default_term_pattern")]
    pub term_pattern: String,
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from("data/docs")
}
fn default_extensions() -> Vec<String> {
    vec!["txt".into()]
}
fn default_max_context_chars() -> usize {
    3000
}
fn default_top_k() -> usize {
    3
}
fn default_min_term_len() -> usize {
    4
}
fn default_term_pattern() -> String {
    DEFAULT_TERM_PATTERN.into()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            docs_dir: default_docs_dir(),
            extensions: default_extensions(),
            max_context_chars: default_max_context_chars(),
            top_k: default_top_k(),
            min_term_len: default_min_term_len(),
            term_pattern: default_term_pattern(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Yandex Cloud API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Yandex Cloud folder the model is billed to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model path inside the folder URI (`gpt://<folder>/<model>`)
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Instruction placed before the retrieved documentation
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_api_url() -> String {
    "https://llm.api.cloud.yandex.net/foundationModels/v1/completion".into()
}
fn default_model() -> String {
    "yandexgpt/latest".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    500
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_system_prompt() -> String {
    "Ты технический ассистент по API Bitrix24. Отвечай ТОЛЬКО используя документацию ниже.".into()
}

impl AssistantConfig {
    /// Whether both credentials needed for a completion call are present.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
            && self.folder_id.as_deref().is_some_and(|f| !f.is_empty())
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            folder_id: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl std::fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("api_key", &redact(&self.api_key))
            .field("folder_id", &self.folder_id)
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token from @BotFather
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    /// Allowlist of sender IDs. Empty = deny all. ["*"] = allow all.
    #[serde(default = "default_allowed_users")]
    pub allowed_users: Vec<String>,

    /// Long-poll timeout passed to `getUpdates`
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

fn default_allowed_users() -> Vec<String> {
    vec!["*".into()]
}
fn default_poll_timeout_secs() -> u64 {
    30
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            allowed_users: default_allowed_users(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &redact(&self.bot_token))
            .field("allowed_users", &self.allowed_users)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// SQLite file path, or `:memory:`
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

fn default_database_path() -> String {
    AppConfig::config_dir()
        .join("history.sqlite")
        .to_string_lossy()
        .into_owned()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.docbot/config.toml),
    /// then apply environment variable overrides:
    /// - `BOT_TOKEN` / `TELEGRAM_BOT_TOKEN`
    /// - `YANDEX_API_KEY`, `YANDEX_FOLDER_ID`
    /// - `DOCBOT_DOCS_DIR`, `DOCBOT_DATABASE`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup. Environment values win
    /// over file values; empty values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = var("BOT_TOKEN").or_else(|| var("TELEGRAM_BOT_TOKEN")) {
            self.telegram.bot_token = Some(token);
        }
        if let Some(key) = var("YANDEX_API_KEY") {
            self.assistant.api_key = Some(key);
        }
        if let Some(folder) = var("YANDEX_FOLDER_ID") {
            self.assistant.folder_id = Some(folder);
        }
        if let Some(dir) = var("DOCBOT_DOCS_DIR") {
            self.retrieval.docs_dir = PathBuf::from(dir);
        }
        if let Some(db) = var("DOCBOT_DATABASE") {
            self.history.database_path = db;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".docbot")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.retrieval;
        if r.max_context_chars == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.max_context_chars must be > 0".into(),
            ));
        }
        if r.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be > 0".into(),
            ));
        }
        if r.min_term_len == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.min_term_len must be > 0".into(),
            ));
        }
        if r.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "retrieval.extensions must list at least one extension".into(),
            ));
        }
        if let Err(e) = regex_lite::Regex::new(&r.term_pattern) {
            return Err(ConfigError::ValidationError(format!(
                "retrieval.term_pattern is not a valid regex: {e}"
            )));
        }

        let a = &self.assistant;
        if !(0.0..=1.0).contains(&a.temperature) {
            return Err(ConfigError::ValidationError(
                "assistant.temperature must be between 0.0 and 1.0".into(),
            ));
        }
        if a.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "assistant.max_tokens must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
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

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
