//! ECIES for in-transit payloads: ephemeral X25519 + AES-256-GCM
//!
//! Blob layout: `ephemeral_pubkey (32) || iv (12) || ciphertext+tag (>= 16)`.
//! The 32 raw bytes of the DH shared point are used directly as the AES-256
//! key; the wire format has no KDF step and adding one would break every
//! deployed client.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use x25519_dalek::{PublicKey, StaticSecret};

use super::CryptoError;

/// Size of an X25519 public key in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;
/// Size of the AES-GCM IV in bytes
pub const IV_SIZE: usize = 12;
/// Size of the AES-GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;
/// Minimum ECIES blob size (empty plaintext)
pub const MIN_BLOB_SIZE: usize = PUBLIC_KEY_SIZE + IV_SIZE + TAG_SIZE;

/// Encrypt `plaintext` to the holder of `recipient_pub`.
///
/// Generates a fresh ephemeral keypair and IV per call, so encrypting the
/// same plaintext twice yields unrelated blobs.
pub fn encrypt(recipient_pub: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut eph_bytes = [0u8; 32];
    getrandom::getrandom(&mut eph_bytes).map_err(|_| CryptoError)?;
    let eph_secret = StaticSecret::from(eph_bytes);
    let eph_public = PublicKey::from(&eph_secret);

    let shared = eph_secret.diffie_hellman(&PublicKey::from(*recipient_pub));
    if !shared.was_contributory() {
        return Err(CryptoError);
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(shared.as_bytes()));

    let mut iv = [0u8; IV_SIZE];
    getrandom::getrandom(&mut iv).map_err(|_| CryptoError)?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| CryptoError)?;

    let mut out = Vec::with_capacity(PUBLIC_KEY_SIZE + IV_SIZE + ciphertext.len());
    out.extend_from_slice(eph_public.as_bytes());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt an ECIES blob with the recipient's private key.
pub fn decrypt(private_key: &[u8; 32], blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if blob.len() < MIN_BLOB_SIZE {
        return Err(CryptoError);
    }

    let mut eph_pub = [0u8; PUBLIC_KEY_SIZE];
    eph_pub.copy_from_slice(&blob[..PUBLIC_KEY_SIZE]);
    let iv = &blob[PUBLIC_KEY_SIZE..PUBLIC_KEY_SIZE + IV_SIZE];
    let ciphertext = &blob[PUBLIC_KEY_SIZE + IV_SIZE..];

    let secret = StaticSecret::from(*private_key);
    let shared = secret.diffie_hellman(&PublicKey::from(eph_pub));
    if !shared.was_contributory() {
        return Err(CryptoError);
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(shared.as_bytes()));
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| CryptoError)
}
