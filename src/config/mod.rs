//! Configuration module for the CrewSync backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::errors::AppError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file backing the document store
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of the human-readable format
    pub log_json: bool,
    /// Rebuild the received-invitations index from the ledgers at startup
    pub rebuild_index_on_start: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let api_psk = env::var("CREWSYNC_API_PSK").ok().filter(|s| !s.is_empty());

        let db_path = env::var("CREWSYNC_DB_PATH")
            .unwrap_or_else(|_| "./data/crewsync.sqlite".to_string())
            .into();

        let bind_addr = env::var("CREWSYNC_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| AppError::Validation(format!("Invalid CREWSYNC_BIND_ADDR: {}", e)))?;

        let log_level = env::var("CREWSYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_json = parse_flag("CREWSYNC_LOG_JSON", false)?;
        let rebuild_index_on_start = parse_flag("CREWSYNC_REBUILD_INDEX", true)?;

        Ok(Self {
            api_psk,
            db_path,
            bind_addr,
            log_level,
            log_json,
            rebuild_index_on_start,
        })
    }
}

fn parse_flag(name: &str, default: bool) -> Result<bool, AppError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(AppError::Validation(format!(
                "Invalid {}: expected a boolean, got {:?}",
                name, other
            ))),
        },
    }
}
