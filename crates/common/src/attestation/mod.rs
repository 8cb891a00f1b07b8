//! Attestation bundles and the verification seam
//!
//! A [`Bundle`] carries the attestation certificate and self-reported
//! identity fields exchanged between client and server. Verification
//! produces a [`VerifiedIdentity`] in which only `app_id` is
//! cryptographically attested (extracted from an OID-tagged certificate
//! extension); the other fields are diagnostics and must not influence
//! authorization.
//!
//! Quote-level validation and bundle collection depend on the TEE runtime
//! and sit behind the [`Verifier`] / [`Collector`] traits.

mod collector;
mod verifier;

use serde::{Deserialize, Serialize};

pub use collector::FileCollector;
pub use verifier::RatlsVerifier;

/// Attestation material exchanged between client and server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bundle {
    /// Attestation certificate chain, PEM encoded.
    pub app_cert: String,
    /// Opaque TCB info blob from the TEE runtime.
    #[serde(default)]
    pub tcb_info: String,
    /// Self-reported application identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    /// Self-reported instance identifier (diagnostics only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    /// Self-reported device identifier (diagnostics only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// Identity extracted from a verified bundle.
///
/// `app_id` comes from the verified certificate extension. `instance_id`
/// and `device_id` are preserved self-reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub app_id: String,
    pub instance_id: String,
    pub device_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AttestationError {
    #[error("missing app_cert in attestation bundle")]
    MissingCert,
    #[error("failed to parse attestation certificate: {0}")]
    InvalidCert(String),
    #[error("attestation app_id mismatch between certificate ({cert:?}) and bundle ({reported:?})")]
    AppIdMismatch { cert: String, reported: String },
    #[error("failed to collect attestation bundle: {0}")]
    Collect(String),
}

/// Validates a peer's attestation bundle.
pub trait Verifier: Send + Sync {
    fn verify(&self, bundle: &Bundle) -> Result<VerifiedIdentity, AttestationError>;
}

/// Collects a local attestation bundle from the TEE runtime.
pub trait Collector: Send + Sync {
    fn collect(&self) -> Result<Bundle, AttestationError>;
}
