use std::path::PathBuf;

use crate::error::AppError;

/// Environment variable names read by [`AppConfig::from_env`].
pub const ENV_DATA_DIR: &str = "GAIA_DATA_DIR";
pub const ENV_ACTOR: &str = "GAIA_ACTOR";
pub const ENV_DB_POOL_SIZE: &str = "GAIA_DB_POOL_SIZE";
pub const ENV_HISTORY_CAP: &str = "GAIA_HISTORY_CAP";
pub const ENV_ACTIVITY_CAP: &str = "GAIA_ACTIVITY_CAP";
pub const ENV_LOG_FORMAT: &str = "GAIA_LOG_FORMAT";

pub const DEFAULT_POOL_SIZE: u32 = 4;
/// Phase history rows kept globally; older rows are dropped on insert.
pub const DEFAULT_HISTORY_CAP: u32 = 500;
/// Activity log rows kept; trimmed oldest-first.
pub const DEFAULT_ACTIVITY_CAP: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Runtime configuration. Sources, lowest to highest precedence:
/// built-in defaults, `.env`, process environment, CLI flags (applied by the binary).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub actor: Option<String>,
    pub db_pool_size: u32,
    pub history_cap: u32,
    pub activity_cap: u32,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            actor: None,
            db_pool_size: DEFAULT_POOL_SIZE,
            history_cap: DEFAULT_HISTORY_CAP,
            activity_cap: DEFAULT_ACTIVITY_CAP,
            log_format: LogFormat::Compact,
        }
    }
}

impl AppConfig {
    /// Load `.env` (if any) and overlay `GAIA_*` variables on the defaults.
    pub fn from_env() -> Result<Self, AppError> {
        // A missing .env is the normal case.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Kept separate from `from_env` so tests
    /// never touch process-global environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(dir) = non_empty(lookup(ENV_DATA_DIR)) {
            config.data_dir = PathBuf::from(dir);
        }
        config.actor = non_empty(lookup(ENV_ACTOR));

        if let Some(raw) = non_empty(lookup(ENV_DB_POOL_SIZE)) {
            config.db_pool_size = parse_positive(ENV_DB_POOL_SIZE, &raw)?;
        }
        if let Some(raw) = non_empty(lookup(ENV_HISTORY_CAP)) {
            config.history_cap = parse_positive(ENV_HISTORY_CAP, &raw)?;
        }
        if let Some(raw) = non_empty(lookup(ENV_ACTIVITY_CAP)) {
            config.activity_cap = parse_positive(ENV_ACTIVITY_CAP, &raw)?;
        }
        if let Some(raw) = non_empty(lookup(ENV_LOG_FORMAT)) {
            config.log_format = match raw.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" | "text" => LogFormat::Compact,
                other => {
                    return Err(AppError::Config(format!(
                        "{ENV_LOG_FORMAT} must be 'json' or 'compact', got '{other}'"
                    )))
                }
            };
        }

        Ok(config)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("gaia-pipeline"))
        .unwrap_or_else(|| PathBuf::from(".gaia"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_positive(key: &str, raw: &str) -> Result<u32, AppError> {
    match raw.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::Config(format!(
            "{key} must be a positive integer, got '{raw}'"
        ))),
    }
}
