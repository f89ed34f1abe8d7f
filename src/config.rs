use chrono_tz::Tz;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use teloxide::types::UserId;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Unknown IANA timezone name.
    InvalidTimezone(String),
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
            Self::InvalidTimezone(name) => {
                write!(f, "unknown timezone '{}' (expected an IANA name like Asia/Jakarta)", name)
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
            Self::InvalidTimezone(_) => None,
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    owner_ids: Vec<u64>,
    telegram_bot_token: String,
    /// Directory for state files (SQLite database, logs). Defaults to current directory.
    data_dir: Option<String>,
    /// IANA timezone used to resolve "today". Defaults to Asia/Jakarta.
    timezone: Option<String>,
    #[serde(default = "default_command_cooldown_minutes")]
    command_cooldown_minutes: i64,
    #[serde(default = "default_announce_interval_hours")]
    announce_interval_hours: u64,
}

fn default_command_cooldown_minutes() -> i64 {
    50
}

fn default_announce_interval_hours() -> u64 {
    6
}

pub struct Config {
    /// Owner IDs - only these users can run the admin commands.
    pub owner_ids: Vec<UserId>,
    pub telegram_bot_token: String,
    /// Directory for state files (SQLite database, logs).
    pub data_dir: PathBuf,
    /// Timezone used to resolve "today" for schedule lookups.
    pub timezone: Tz,
    /// Anti-spam window for the rate-limited commands.
    pub command_cooldown_minutes: i64,
    /// Period of the automatic schedule announcement.
    pub announce_interval_hours: u64,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        // Validate required fields
        if file.owner_ids.is_empty() {
            return Err(ConfigError::Validation("owner_ids must contain at least one owner ID".into()));
        }
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
        if file.command_cooldown_minutes < 1 {
            return Err(ConfigError::Validation("command_cooldown_minutes must be at least 1".into()));
        }
        if file.announce_interval_hours < 1 {
            return Err(ConfigError::Validation("announce_interval_hours must be at least 1".into()));
        }

        let tz_name = file.timezone.as_deref().unwrap_or("Asia/Jakarta");
        let timezone: Tz = tz_name
            .parse()
            .map_err(|_| ConfigError::InvalidTimezone(tz_name.to_string()))?;

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            owner_ids: file.owner_ids.into_iter().map(UserId).collect(),
            telegram_bot_token: file.telegram_bot_token,
            data_dir,
            timezone,
            command_cooldown_minutes: file.command_cooldown_minutes,
            announce_interval_hours: file.announce_interval_hours,
        })
    }

    pub fn is_owner(&self, user_id: UserId) -> bool {
        self.owner_ids.contains(&user_id)
    }
}
