//! Service configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_ROLE_CACHE_TTL_SECS: u64 = 30;
pub const DEFAULT_RESUME_PATH: &str = "/kids/dashboard";
pub const DEFAULT_SITE_DIR: &str = "dist";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is required")]
    Missing { var: &'static str },
    #[error("{var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    /// Lifetime of memoized role answers; zero disables the cache.
    pub role_cache_ttl: Duration,
    /// Post-login landing page when no resume path was carried.
    pub default_resume_path: String,
    pub site_dir: PathBuf,
    pub cookie_secure: bool,
}

impl GateConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `DATABASE_URL`
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `DB_ACQUIRE_TIMEOUT_SECS`: default 5
    /// - `ROLE_CACHE_TTL_SECS`: default 30
    /// - `DEFAULT_RESUME_PATH`: default `/kids/dashboard`
    /// - `SITE_DIR`: default `dist`
    /// - `COOKIE_SECURE`: inferred from a `https://` `PUBLIC_URL` when unset
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when `DATABASE_URL` is absent, `PORT` does not
    /// parse, or `DEFAULT_RESUME_PATH` is not an absolute path.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing { var: "DATABASE_URL" })?;

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { var: "PORT", value: raw })?,
            Err(_) => DEFAULT_PORT,
        };

        let default_resume_path = std::env::var("DEFAULT_RESUME_PATH").unwrap_or_else(|_| DEFAULT_RESUME_PATH.into());
        if !default_resume_path.starts_with('/') || default_resume_path.starts_with("//") {
            return Err(ConfigError::Invalid { var: "DEFAULT_RESUME_PATH", value: default_resume_path });
        }

        Ok(Self {
            database_url,
            port,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            db_acquire_timeout: Duration::from_secs(env_parse(
                "DB_ACQUIRE_TIMEOUT_SECS",
                DEFAULT_DB_ACQUIRE_TIMEOUT_SECS,
            )),
            role_cache_ttl: Duration::from_secs(env_parse("ROLE_CACHE_TTL_SECS", DEFAULT_ROLE_CACHE_TTL_SECS)),
            default_resume_path,
            site_dir: std::env::var("SITE_DIR").map_or_else(|_| PathBuf::from(DEFAULT_SITE_DIR), PathBuf::from),
            cookie_secure: cookie_secure(),
        })
    }
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn cookie_secure() -> bool {
    if let Some(value) = env_bool("COOKIE_SECURE") {
        return value;
    }

    std::env::var("PUBLIC_URL")
        .map(|url| url.starts_with("https://"))
        .unwrap_or(false)
}
