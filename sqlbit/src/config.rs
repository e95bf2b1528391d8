use crate::error::OrmError;
use crate::info;
use crate::retry::RetryPolicy;
use config::{Config, Environment, File};
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Once;
use std::time::Duration;

pub const MEMORY: &str = ":memory:";

static DOTENV_ONCE: Once = Once::new();

fn ensure_dotenv_loaded() {
    DOTENV_ONCE.call_once(|| match dotenv() {
        Ok(_) => info!("Config loaded including .env file."),
        Err(_) => info!("Config loaded without .env file."),
    });
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub db_path: String,
    pub foreign_keys: bool,
    pub busy_timeout_ms: u64,
    /// Extra attempts on busy/locked failures, 0 disables retrying.
    pub busy_retries: usize,
    pub busy_delay_ms: u64,
    pub statement_cache_size: usize,
    /// Unrecognized `key=value` pairs, applied as pragmas on open.
    pub pragmas: Vec<(String, String)>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            db_path: MEMORY.to_string(),
            foreign_keys: false,
            busy_timeout_ms: 5000,
            busy_retries: 0,
            busy_delay_ms: 50,
            statement_cache_size: crate::cache::DEFAULT_CAPACITY,
            pragmas: Vec::new(),
        }
    }
}

impl SessionConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn file(path: &str) -> Self {
        SessionConfig { db_path: path.to_string(), ..Self::default() }
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path == MEMORY
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.busy_retries, Duration::from_millis(self.busy_delay_ms))
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, OrmError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(OrmError::ConnectionString(format!("`{key}` expects a flag, got `{value}`"))),
    }
}

fn parse_number<N: FromStr>(key: &str, value: &str) -> Result<N, OrmError> {
    value.parse().map_err(|_| OrmError::ConnectionString(format!("`{key}` expects a number, got `{value}`")))
}

/// A bare path (or `:memory:`) or whitespace separated `key=value` pairs,
/// e.g. `db=app.db foreign_keys=1 busy_timeout=250`.
impl FromStr for SessionConfig {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(OrmError::ConnectionString("empty connection string".to_string()));
        }
        if !s.contains('=') {
            return Ok(SessionConfig::file(s));
        }
        let mut cfg = SessionConfig::default();
        for token in s.split_whitespace() {
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| OrmError::ConnectionString(format!("expected key=value, got `{token}`")))?;
            match key {
                "db" | "path" | "file" | "db_path" => cfg.db_path = value.to_string(),
                "foreign_keys" => cfg.foreign_keys = parse_flag(key, value)?,
                "busy_timeout" | "busy_timeout_ms" => cfg.busy_timeout_ms = parse_number(key, value)?,
                "busy_retries" => cfg.busy_retries = parse_number(key, value)?,
                "busy_delay" | "busy_delay_ms" => cfg.busy_delay_ms = parse_number(key, value)?,
                "statement_cache_size" => cfg.statement_cache_size = parse_number(key, value)?,
                _ => cfg.pragmas.push((key.to_string(), value.to_string())),
            }
        }
        if cfg.db_path.is_empty() {
            return Err(OrmError::ConnectionString("empty database path".to_string()));
        }
        Ok(cfg)
    }
}

/// Loads session settings from an optional file overlaid with `SQLBIT__*` environment variables.
pub fn load_config(path: Option<&str>) -> Result<SessionConfig, OrmError> {
    ensure_dotenv_loaded();

    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::with_name(path).required(true));
    }
    builder = builder.add_source(Environment::with_prefix("SQLBIT").try_parsing(true).separator("__"));

    let cfg = builder.build()?.try_deserialize::<SessionConfig>()?;
    info!("{:#?}", cfg);
    Ok(cfg)
}
