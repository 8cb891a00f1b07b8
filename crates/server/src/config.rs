//! Server configuration from environment variables

use std::net::SocketAddr;
use std::path::PathBuf;

use jingui_common::crypto::MasterKey;

const MASTER_KEY_ENV: &str = "JINGUI_MASTER_KEY";
const ADMIN_TOKEN_ENV: &str = "JINGUI_ADMIN_TOKEN";
const DB_PATH_ENV: &str = "JINGUI_DB_PATH";
const LISTEN_ADDR_ENV: &str = "JINGUI_LISTEN_ADDR";
const RATLS_STRICT_ENV: &str = "JINGUI_RATLS_STRICT";
const CORS_ORIGINS_ENV: &str = "JINGUI_CORS_ORIGINS";

const DEFAULT_DB_PATH: &str = "jingui.db";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const MIN_ADMIN_TOKEN_LEN: usize = 16;

#[derive(Debug)]
pub struct Config {
    /// At-rest encryption key for stored field values.
    pub master_key: MasterKey,
    /// Bearer token for the admin CRUD surface.
    pub admin_token: String,
    /// SQLite database path.
    pub db_path: String,
    /// Listen address for the API server.
    pub listen_addr: SocketAddr,
    /// Require verified client attestation on every challenge.
    pub ratls_strict: bool,
    /// Allowed CORS origins; empty disables the CORS layer.
    pub cors_origins: Vec<String>,
    /// Directory for log files (stdout only if not set).
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JINGUI_MASTER_KEY is required")]
    MissingMasterKey,
    #[error("JINGUI_MASTER_KEY must be 64 hex characters (32 bytes), got {0} chars")]
    InvalidMasterKey(usize),
    #[error("JINGUI_ADMIN_TOKEN is required")]
    MissingAdminToken,
    #[error("JINGUI_ADMIN_TOKEN must be at least 16 characters")]
    AdminTokenTooShort,
    #[error("JINGUI_LISTEN_ADDR is not a valid socket address: {0}")]
    InvalidListenAddr(String),
    #[error("JINGUI_RATLS_STRICT must be one of true/false/1/0/yes/no/on/off, got {0:?}")]
    InvalidStrictFlag(String),
}

/// Parse a boolean-ish environment value.
pub fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let master_key_hex = std::env::var(MASTER_KEY_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingMasterKey)?;
        let master_key_hex = master_key_hex.trim();
        if master_key_hex.len() != 64 {
            return Err(ConfigError::InvalidMasterKey(master_key_hex.len()));
        }
        let master_key = MasterKey::from_hex(master_key_hex)
            .map_err(|_| ConfigError::InvalidMasterKey(master_key_hex.len()))?;

        let admin_token = std::env::var(ADMIN_TOKEN_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingAdminToken)?;
        if admin_token.len() < MIN_ADMIN_TOKEN_LEN {
            return Err(ConfigError::AdminTokenTooShort);
        }

        let db_path =
            std::env::var(DB_PATH_ENV).unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());

        let listen_raw = std::env::var(LISTEN_ADDR_ENV)
            .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr: SocketAddr = listen_raw
            .parse()
            .map_err(|_| ConfigError::InvalidListenAddr(listen_raw.clone()))?;

        let ratls_strict = match std::env::var(RATLS_STRICT_ENV) {
            Ok(v) if !v.trim().is_empty() => {
                parse_bool_flag(&v).ok_or(ConfigError::InvalidStrictFlag(v))?
            }
            _ => true,
        };

        let cors_origins = std::env::var(CORS_ORIGINS_ENV)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            master_key,
            admin_token,
            db_path,
            listen_addr,
            ratls_strict,
            cors_origins,
            log_dir: None,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_bool_flag() {
        for v in ["1", "true", "YES", " on "] {
            assert_eq!(parse_bool_flag(v), Some(true), "{v:?}");
        }
        for v in ["0", "False", "no", "off"] {
            assert_eq!(parse_bool_flag(v), Some(false), "{v:?}");
        }
        assert_eq!(parse_bool_flag("maybe"), None);
        assert_eq!(parse_bool_flag(""), None);
    }
}
