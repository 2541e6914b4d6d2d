use thiserror::Error;

use crate::meeting::{zoom, ZoomConfig};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_JWT_SECRET: &str = "dev-secret-change-in-production";
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;
const DEFAULT_ZOOM_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Environment variable '{key}' has invalid value '{value}'")]
    Invalid { key: String, value: String },

    #[error("Zoom credentials are incomplete: '{0}' is not set")]
    IncompleteZoomCredentials(&'static str),
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent means the in-memory repositories are used
    pub database_url: Option<String>,
    pub port: u16,
    pub jwt_secret: String,
    pub session_expiration_days: i64,
    /// Absent means meetings are never created remotely
    pub zoom: Option<ZoomConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            database_url: non_empty("DATABASE_URL"),
            port: parse_or("PORT", non_empty("PORT"), DEFAULT_PORT)?,
            jwt_secret: non_empty("JWT_SECRET").unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string()),
            session_expiration_days: parse_or(
                "SESSION_EXPIRATION_DAYS",
                non_empty("SESSION_EXPIRATION_DAYS"),
                DEFAULT_SESSION_EXPIRATION_DAYS,
            )?,
            zoom: zoom_config(&non_empty)?,
        })
    }
}

fn zoom_config<F>(non_empty: &F) -> Result<Option<ZoomConfig>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let account_id = non_empty("ZOOM_ACCOUNT_ID");
    let client_id = non_empty("ZOOM_CLIENT_ID");
    let client_secret = non_empty("ZOOM_CLIENT_SECRET");

    let (account_id, client_id, client_secret) = match (account_id, client_id, client_secret) {
        (None, None, None) => return Ok(None),
        (Some(a), Some(i), Some(s)) => (a, i, s),
        (None, _, _) => return Err(ConfigError::IncompleteZoomCredentials("ZOOM_ACCOUNT_ID")),
        (_, None, _) => return Err(ConfigError::IncompleteZoomCredentials("ZOOM_CLIENT_ID")),
        (_, _, None) => return Err(ConfigError::IncompleteZoomCredentials("ZOOM_CLIENT_SECRET")),
    };

    Ok(Some(ZoomConfig {
        account_id,
        client_id,
        client_secret,
        api_base: non_empty("ZOOM_API_BASE").unwrap_or_else(|| zoom::DEFAULT_API_BASE.to_string()),
        oauth_url: non_empty("ZOOM_OAUTH_URL")
            .unwrap_or_else(|| zoom::DEFAULT_OAUTH_URL.to_string()),
        timeout_secs: parse_or(
            "ZOOM_TIMEOUT_SECS",
            non_empty("ZOOM_TIMEOUT_SECS"),
            DEFAULT_ZOOM_TIMEOUT_SECS,
        )?,
    }))
}

fn parse_or<T: std::str::FromStr>(
    key: &str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value,
        }),
    }
}
