use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::relay::l10n::Locale;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    telegram_bot_token: String,
    /// Users who see sender details on the relays delivered to them.
    #[serde(default)]
    admin_ids: Vec<i64>,
    /// Chat that receives a notice for every submitted comment.
    moderation_chat_id: i64,
    /// Path to the SQLite database. Defaults to whisperlink.db in data_dir.
    database_path: Option<String>,
    /// Directory for state files (logs, database). Defaults to current directory.
    data_dir: Option<String>,
    /// Locale for users whose client language is not supported (en, ru, uz).
    default_locale: Option<String>,
}

pub struct Config {
    pub telegram_bot_token: String,
    /// Users who see sender details on the relays delivered to them.
    pub admin_ids: Vec<i64>,
    /// Chat that receives a notice for every submitted comment.
    pub moderation_chat_id: i64,
    /// Path to the SQLite database.
    pub database_path: PathBuf,
    /// Directory for state files (logs, database).
    pub data_dir: PathBuf,
    /// Locale for users whose client language is not supported.
    pub default_locale: Locale,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        // Validate required fields
        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }

        let default_locale = match file.default_locale {
            Some(code) => Locale::from_code(&code).ok_or_else(|| {
                ConfigError::Validation(format!("unsupported default_locale '{}' (expected en, ru, or uz)", code))
            })?,
            None => Locale::En,
        };

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let database_path = file
            .database_path
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("whisperlink.db"));

        Ok(Self {
            telegram_bot_token: file.telegram_bot_token,
            admin_ids: file.admin_ids,
            moderation_chat_id: file.moderation_chat_id,
            database_path,
            data_dir,
            default_locale,
        })
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}
