//! Bundle collection from the local TEE runtime
//!
//! The runtime's guest agent drops the current attestation bundle as a JSON
//! file; [`FileCollector`] loads it on demand. Deployments with an RPC-based
//! agent plug their own [`Collector`] implementation in instead.

use std::path::PathBuf;

use super::{AttestationError, Bundle, Collector};

/// Environment variable naming the bundle file path.
pub const BUNDLE_PATH_ENV: &str = "JINGUI_ATTESTATION_BUNDLE";

/// Loads an attestation bundle from a JSON file on each collection.
#[derive(Debug, Clone)]
pub struct FileCollector {
    path: PathBuf,
}

impl FileCollector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileCollector { path: path.into() }
    }

    /// Build a collector from `JINGUI_ATTESTATION_BUNDLE`, if set.
    pub fn from_env() -> Option<Self> {
        let path = std::env::var(BUNDLE_PATH_ENV).ok()?;
        let path = path.trim();
        if path.is_empty() {
            return None;
        }
        Some(FileCollector::new(path))
    }
}

impl Collector for FileCollector {
    fn collect(&self) -> Result<Bundle, AttestationError> {
        let data = std::fs::read(&self.path).map_err(|e| {
            AttestationError::Collect(format!("read {}: {}", self.path.display(), e))
        })?;
        let bundle: Bundle = serde_json::from_slice(&data).map_err(|e| {
            AttestationError::Collect(format!("parse {}: {}", self.path.display(), e))
        })?;
        tracing::debug!(
            app_id = %bundle.app_id.as_deref().unwrap_or(""),
            app_cert_len = bundle.app_cert.len(),
            tcb_info_len = bundle.tcb_info.len(),
            "collected local attestation bundle"
        );
        Ok(bundle)
    }
}
