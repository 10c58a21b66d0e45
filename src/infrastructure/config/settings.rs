//! Process configuration read from the environment.
//!
//! `.env` files are loaded by the binary before [`Settings::from_env`] runs,
//! so both sources look the same here. `LOG_LEVEL` is read by the binary
//! directly, since logging starts before settings are parsed.

use crate::application::submit::DEFAULT_CHUNK_SIZE;
use crate::domain::entities::token::Token;
use crate::domain::error::DomainError;
use crate::domain::values::netting_mode::NettingMode;
use crate::infrastructure::ghostfolio::client::DEFAULT_HOST;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:5000/callback";
pub const DEFAULT_ACCOUNT_NAME: &str = "Saxo Bank";
pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_MAPPING_FILE: &str = "mapping.yaml";
pub const DEFAULT_DB_PATH: &str = "./saxofolio.db";
pub const DEFAULT_LOCK_STALE_AFTER: Duration = Duration::from_secs(6 * 3600);

/// What a process invocation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Sync,
    ListActivities,
    DeleteActivities,
    Authorize,
    ListAccounts,
}

impl FromStr for Operation {
    type Err = DomainError;

    /// Only the three values accepted by `OPERATION`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SYNCSAXO" => Ok(Operation::Sync),
            "GET_ALL_ACTS" => Ok(Operation::ListActivities),
            "DELETE_ALL_ACTS" => Ok(Operation::DeleteActivities),
            other => Err(DomainError::Configuration(format!(
                "unknown OPERATION '{other}' (expected SYNCSAXO, GET_ALL_ACTS or DELETE_ALL_ACTS)"
            ))),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Sync => "SYNCSAXO",
            Operation::ListActivities => "GET_ALL_ACTS",
            Operation::DeleteActivities => "DELETE_ALL_ACTS",
            Operation::Authorize => "AUTH",
            Operation::ListAccounts => "ACCOUNTS",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone)]
pub struct Settings {
    pub saxo_app_key: String,
    pub saxo_app_secret: String,
    pub saxo_redirect_uri: String,
    pub saxo_account_key: String,
    pub saxo_use_production: bool,
    pub netting_mode: NettingMode,
    /// Token seed for an empty token store.
    pub saxo_seed_token: Option<Token>,

    pub ghost_host: String,
    pub ghost_key: String,
    pub ghost_account_name: String,
    pub ghost_currency: String,
    pub ghost_platform: Option<String>,

    pub operation: Operation,
    pub schedule: Option<Duration>,
    pub chunk_size: usize,
    pub mapping_file: PathBuf,
    pub db_path: String,
    pub lock_stale_after: Duration,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("saxo_app_key", &self.saxo_app_key)
            .field("saxo_app_secret", &"[REDACTED]")
            .field("saxo_redirect_uri", &self.saxo_redirect_uri)
            .field("saxo_account_key", &self.saxo_account_key)
            .field("saxo_use_production", &self.saxo_use_production)
            .field("netting_mode", &self.netting_mode)
            .field("saxo_seed_token", &self.saxo_seed_token)
            .field("ghost_host", &self.ghost_host)
            .field("ghost_key", &"[REDACTED]")
            .field("ghost_account_name", &self.ghost_account_name)
            .field("ghost_currency", &self.ghost_currency)
            .field("ghost_platform", &self.ghost_platform)
            .field("operation", &self.operation)
            .field("schedule", &self.schedule)
            .field("chunk_size", &self.chunk_size)
            .field("mapping_file", &self.mapping_file)
            .field("db_path", &self.db_path)
            .field("lock_stale_after", &self.lock_stale_after)
            .finish()
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, DomainError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Empty values count as
    /// unset. Malformed values fail here; missing required keys are
    /// reported by [`Settings::validate_for`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let saxo_use_production = match get("SAXO_USE_PRODUCTION") {
            Some(v) => parse_bool("SAXO_USE_PRODUCTION", &v)?,
            None => false,
        };

        let netting_mode = match get("SAXO_NETTING_MODE") {
            Some(v) => v.parse::<NettingMode>().map_err(|e| {
                DomainError::Configuration(format!("SAXO_NETTING_MODE: {e}"))
            })?,
            None => NettingMode::default(),
        };

        let operation = match get("OPERATION") {
            Some(v) => v.parse()?,
            None => Operation::Sync,
        };

        let schedule = match get("SYNC_SCHEDULE") {
            Some(v) => Some(parse_interval(&v).map_err(|e| {
                DomainError::Configuration(format!("SYNC_SCHEDULE: {e}"))
            })?),
            None => None,
        };

        let chunk_size = match get("IMPORT_CHUNK_SIZE") {
            Some(v) => match v.parse::<usize>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(DomainError::Configuration(format!(
                        "IMPORT_CHUNK_SIZE must be a positive integer, got '{v}'"
                    )))
                }
            },
            None => DEFAULT_CHUNK_SIZE,
        };

        let lock_stale_after = match get("LOCK_STALE_AFTER") {
            Some(v) => parse_interval(&v).map_err(|e| {
                DomainError::Configuration(format!("LOCK_STALE_AFTER: {e}"))
            })?,
            None => DEFAULT_LOCK_STALE_AFTER,
        };

        let saxo_seed_token = get("SAXO_ACCESS_TOKEN").map(|access| Token {
            access,
            refresh: get("SAXO_REFRESH_TOKEN"),
            expires_at: get("SAXO_TOKEN_EXPIRY").and_then(|s| parse_expiry(&s)),
        });

        Ok(Self {
            saxo_app_key: or("SAXO_APP_KEY", ""),
            saxo_app_secret: or("SAXO_APP_SECRET", ""),
            saxo_redirect_uri: or("SAXO_REDIRECT_URI", DEFAULT_REDIRECT_URI),
            saxo_account_key: or("SAXO_ACCOUNT_KEY", ""),
            saxo_use_production,
            netting_mode,
            saxo_seed_token,
            ghost_host: or("GHOST_HOST", DEFAULT_HOST),
            ghost_key: or("GHOST_KEY", ""),
            ghost_account_name: or("GHOST_ACCOUNT_NAME", DEFAULT_ACCOUNT_NAME),
            ghost_currency: or("GHOST_CURRENCY", DEFAULT_CURRENCY).to_uppercase(),
            ghost_platform: get("GHOST_SAXO_PLATFORM"),
            operation,
            schedule,
            chunk_size,
            mapping_file: PathBuf::from(or("MAPPING_FILE", DEFAULT_MAPPING_FILE)),
            db_path: or("SAXOFOLIO_DB", DEFAULT_DB_PATH),
            lock_stale_after,
        })
    }

    /// Check that every key `operation` needs is present, naming all the
    /// missing ones at once.
    pub fn validate_for(&self, operation: Operation) -> Result<(), DomainError> {
        let saxo_auth = [
            ("SAXO_APP_KEY", &self.saxo_app_key),
            ("SAXO_APP_SECRET", &self.saxo_app_secret),
        ];
        let ghost = [("GHOST_KEY", &self.ghost_key)];
        let account = [("SAXO_ACCOUNT_KEY", &self.saxo_account_key)];

        let required: Vec<(&str, &String)> = match operation {
            Operation::Sync => saxo_auth
                .into_iter()
                .chain(account)
                .chain(ghost)
                .collect(),
            Operation::ListActivities | Operation::DeleteActivities => ghost.to_vec(),
            Operation::Authorize | Operation::ListAccounts => saxo_auth.to_vec(),
        };

        let missing: Vec<&str> = required
            .into_iter()
            .filter(|(_, v)| v.is_empty())
            .map(|(k, _)| k)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Configuration(format!(
                "missing required settings for {operation}: {}",
                missing.join(", ")
            )))
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, DomainError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(DomainError::Configuration(format!(
            "{key} must be true or false, got '{value}'"
        ))),
    }
}

/// Accepts RFC 3339 or a zone-less ISO timestamp taken as UTC.
fn parse_expiry(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => Some(naive.and_utc()),
        Err(_) => {
            warn!("Invalid SAXO_TOKEN_EXPIRY '{value}', token will be refreshed on first use");
            None
        }
    }
}

/// Parse a fixed interval such as `90s`, `30m`, `6h` or `1d`. A bare
/// number is seconds.
pub fn parse_interval(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);

    let amount: u64 = digits
        .parse()
        .map_err(|_| format!("invalid interval '{value}'"))?;
    let multiplier = match unit.trim().to_lowercase().as_str() {
        "" | "s" | "sec" | "secs" => 1,
        "m" | "min" | "mins" => 60,
        "h" | "hr" | "hrs" => 3600,
        "d" | "day" | "days" => 86_400,
        other => return Err(format!("unknown interval unit '{other}' in '{value}'")),
    };

    if amount == 0 {
        return Err(format!("interval '{value}' must be greater than zero"));
    }
    Ok(Duration::from_secs(amount * multiplier))
}
