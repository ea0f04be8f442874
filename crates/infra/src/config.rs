//! Configuration loading and representation.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file. Loading happens once at startup; nothing reads the environment
//! after that.

use chrono::Duration;
use thiserror::Error;
use tracing::warn;

use crate::store::StoreConfig;

const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub environment: Environment,
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub store: StoreConfig,
    /// Accounts granted the interest-section entitlement at registration.
    pub interest_section_emails: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            environment: Environment::Development,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_ttl: Duration::days(7),
            store: StoreConfig::InMemory,
            interest_section_emails: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load from the process environment (after applying `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: raw,
                reason: "expected a port number",
            })?,
            None => DEFAULT_PORT,
        };

        let environment = match get("APP_ENV").or_else(|| get("NODE_ENV")) {
            Some(raw) => parse_environment(&raw)?,
            None => Environment::Development,
        };

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None if environment == Environment::Production => {
                return Err(ConfigError::Missing("JWT_SECRET"));
            }
            None => {
                warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        let jwt_ttl = match get("JWT_EXPIRES_IN") {
            Some(raw) => parse_duration(&raw).ok_or(ConfigError::Invalid {
                key: "JWT_EXPIRES_IN",
                value: raw,
                reason: "expected <n>d, <n>h, <n>m or <n>s",
            })?,
            None => Duration::days(7),
        };

        let persistent = match get("USE_PERSISTENT_STORES") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid {
                key: "USE_PERSISTENT_STORES",
                value: raw,
                reason: "expected true or false",
            })?,
            None => false,
        };

        let store = if persistent {
            let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
            let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
                Some(raw) => raw
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or(ConfigError::Invalid {
                        key: "DATABASE_MAX_CONNECTIONS",
                        value: raw,
                        reason: "expected a positive integer",
                    })?,
                None => DEFAULT_MAX_CONNECTIONS,
            };
            StoreConfig::Postgres {
                database_url,
                max_connections,
            }
        } else {
            StoreConfig::InMemory
        };

        let interest_section_emails = get("INTEREST_SECTION_EMAILS")
            .map(|raw| {
                raw.split(',')
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            port,
            environment,
            jwt_secret,
            jwt_ttl,
            store,
            interest_section_emails,
        })
    }
}

fn parse_environment(raw: &str) -> Result<Environment, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "development" | "dev" | "test" => Ok(Environment::Development),
        "production" | "prod" => Ok(Environment::Production),
        _ => Err(ConfigError::Invalid {
            key: "APP_ENV",
            value: raw.to_string(),
            reason: "expected development or production",
        }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Parse `<n>d`, `<n>h`, `<n>m` or `<n>s`; a bare number is seconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&raw[..idx], Some(c)),
        _ => (raw, None),
    };
    let n: i64 = digits.parse().ok().filter(|n| *n > 0)?;
    match unit {
        Some('d') => Duration::try_days(n),
        Some('h') => Duration::try_hours(n),
        Some('m') => Duration::try_minutes(n),
        Some('s') | None => Duration::try_seconds(n),
        _ => None,
    }
}
