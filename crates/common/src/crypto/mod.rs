//! Cryptographic envelope for the jingui secret broker
//!
//! Two authenticated primitives plus fingerprint derivation:
//!
//! - **ECIES** for payloads in flight: ephemeral X25519 + AES-256-GCM, with
//!   the raw DH output used directly as the symmetric key. The blob layout
//!   is part of the wire protocol and must not change.
//! - **At-rest AEAD**: AES-256-GCM under a 256-bit master key, one fresh IV
//!   per record.
//! - **FID derivation**: lowercase hex SHA-1 of an X25519 public key. The
//!   fingerprint is a lookup key, not a security boundary — possession of
//!   the matching private key is what authorizes.

mod ecies;
mod fingerprint;
mod master_key;

pub use ecies::{decrypt, encrypt, IV_SIZE, MIN_BLOB_SIZE, PUBLIC_KEY_SIZE, TAG_SIZE};
pub use fingerprint::{derive_public_key, fid, is_valid_fid, FID_LEN};
pub use master_key::{MasterKey, MASTER_KEY_SIZE, MIN_AT_REST_SIZE};

/// Uniform failure for every envelope operation.
///
/// Whether the underlying cause was a short blob, a tag mismatch, or an
/// invalid curve point is deliberately not reported: callers and peers see
/// the same opaque error for all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cryptographic operation failed")]
pub struct CryptoError;
