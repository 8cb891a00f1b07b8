//! Instance key material
//!
//! The private key lives in a JSON file at a well-known path inside the
//! TEE's shared volume: `{"env_crypt_key": "<64 hex chars>"}`. The private
//! side never leaves this process.

use std::path::Path;

use serde::Deserialize;

/// Default appkeys location inside a dstack guest.
pub const DEFAULT_APPKEYS_PATH: &str = "/dstack/.host-shared/.appkeys.json";

#[derive(Debug, Deserialize)]
struct AppKeysFile {
    #[serde(default)]
    env_crypt_key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppKeysError {
    #[error("read appkeys file: {0}")]
    Read(std::io::Error),
    #[error("parse appkeys file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("env_crypt_key is empty in appkeys file")]
    EmptyKey,
    #[error("env_crypt_key must be 64 hex characters (32 bytes)")]
    InvalidKey,
}

/// Load the X25519 private key from an appkeys file.
pub fn load_private_key(path: &Path) -> Result<[u8; 32], AppKeysError> {
    let data = std::fs::read(path).map_err(AppKeysError::Read)?;
    let file: AppKeysFile = serde_json::from_slice(&data)?;

    if file.env_crypt_key.is_empty() {
        return Err(AppKeysError::EmptyKey);
    }

    let mut key = [0u8; 32];
    hex::decode_to_slice(file.env_crypt_key.trim(), &mut key)
        .map_err(|_| AppKeysError::InvalidKey)?;
    Ok(key)
}
