//! Application configuration loaded from environment variables.

use std::env;

/// Default window after sign-in during which an ID token counts as fresh.
pub const DEFAULT_TOKEN_FRESHNESS_SECS: u64 = 300;

/// Default time a free fall may last without an impact before it is abandoned.
pub const DEFAULT_FALL_TIMEOUT_MS: u64 = 3000;

/// Which document store backs the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// In-process store; data is lost on restart
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Firebase/GCP project that issues ID tokens and hosts Firestore
    pub firebase_project_id: String,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    pub store: StoreBackend,
    /// Max age of an ID token accepted by the sign-in endpoint
    pub token_freshness_secs: u64,
    /// Free-fall timeout for the motion classifier
    pub fall_timeout_ms: u64,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            firebase_project_id: "test-project".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            store: StoreBackend::Memory,
            token_freshness_secs: DEFAULT_TOKEN_FRESHNESS_SECS,
            fall_timeout_ms: DEFAULT_FALL_TIMEOUT_MS,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store = match env::var("BECAREFUL_STORE").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("firestore") | Err(_) => StoreBackend::Firestore,
            Ok(other) => return Err(ConfigError::Invalid("BECAREFUL_STORE", other.to_string())),
        };

        Ok(Self {
            firebase_project_id: env::var("FIREBASE_PROJECT_ID")
                .map_err(|_| ConfigError::Missing("FIREBASE_PROJECT_ID"))?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store,
            token_freshness_secs: parse_or("TOKEN_FRESHNESS_SECS", DEFAULT_TOKEN_FRESHNESS_SECS)?,
            fall_timeout_ms: parse_or("FALL_TIMEOUT_MS", DEFAULT_FALL_TIMEOUT_MS)?,
        })
    }
}

fn parse_or(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("FIREBASE_PROJECT_ID", "becareful-test");
        env::set_var("BECAREFUL_STORE", "memory");
        env::set_var("FALL_TIMEOUT_MS", "2500");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.firebase_project_id, "becareful-test");
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.fall_timeout_ms, 2500);
        assert_eq!(config.token_freshness_secs, DEFAULT_TOKEN_FRESHNESS_SECS);
    }
}
