//! Instance fingerprint (FID) derivation
//!
//! FID = lowercase hex SHA-1 of the X25519 public key, 40 characters. SHA-1
//! is acceptable here because the FID is a lookup key: forging a collision
//! does not help without the matching private key. Changing the hash would
//! break every client key on disk, so do not change it silently.

use sha1::{Digest, Sha1};
use x25519_dalek::{PublicKey, StaticSecret};

/// Length of a FID in characters
pub const FID_LEN: usize = 40;

/// Derive the FID for an X25519 public key.
pub fn fid(public_key: &[u8; 32]) -> String {
    hex::encode(Sha1::digest(public_key))
}

/// Derive the X25519 public key for a private key.
pub fn derive_public_key(private_key: &[u8; 32]) -> [u8; 32] {
    let secret = StaticSecret::from(*private_key);
    *PublicKey::from(&secret).as_bytes()
}

/// Check that a string has the FID shape: 40 lowercase hex characters.
pub fn is_valid_fid(value: &str) -> bool {
    value.len() == FID_LEN
        && value
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
