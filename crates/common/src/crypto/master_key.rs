//! At-rest AEAD under the deployment master key
//!
//! Record layout: `iv (12) || ciphertext+tag (>= 16)`. Master key lifecycle
//! and rotation are the deployment's responsibility.

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use super::{CryptoError, IV_SIZE, TAG_SIZE};

/// Size of the master key in bytes (256 bits)
pub const MASTER_KEY_SIZE: usize = 32;
/// Minimum at-rest record size (empty plaintext)
pub const MIN_AT_REST_SIZE: usize = IV_SIZE + TAG_SIZE;

/// 256-bit AES-GCM key protecting stored field values.
#[derive(Clone)]
pub struct MasterKey([u8; MASTER_KEY_SIZE]);

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(..)")
    }
}

impl From<[u8; MASTER_KEY_SIZE]> for MasterKey {
    fn from(bytes: [u8; MASTER_KEY_SIZE]) -> Self {
        MasterKey(bytes)
    }
}

impl MasterKey {
    /// Parse a master key from a 64-character hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let mut bytes = [0u8; MASTER_KEY_SIZE];
        hex::decode_to_slice(hex_str.trim(), &mut bytes).map_err(|_| CryptoError)?;
        Ok(MasterKey(bytes))
    }

    /// Encrypt a record value. A fresh IV is drawn per call.
    pub fn encrypt_at_rest(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0));

        let mut iv = [0u8; IV_SIZE];
        getrandom::getrandom(&mut iv).map_err(|_| CryptoError)?;

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext)
            .map_err(|_| CryptoError)?;

        let mut out = Vec::with_capacity(IV_SIZE + ciphertext.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt a record produced by [`MasterKey::encrypt_at_rest`].
    pub fn decrypt_at_rest(&self, blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if blob.len() < MIN_AT_REST_SIZE {
            return Err(CryptoError);
        }

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0));
        cipher
            .decrypt(Nonce::from_slice(&blob[..IV_SIZE]), &blob[IV_SIZE..])
            .map_err(|_| CryptoError)
    }
}
