//! Single-use challenge ledger
//!
//! In-memory map from challenge identifier to outstanding entry, guarded by
//! one mutex. Entries expire after [`CHALLENGE_TTL`]; expired entries are
//! collected opportunistically under the lock on every issue/consume, so no
//! background task is needed. Restart invalidates all outstanding
//! challenges, which the short TTL makes acceptable.
//!
//! The ledger is constructed explicitly and shared by reference through the
//! service state. Tests build their own.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use subtle::ConstantTimeEq;

/// Lifetime of an issued challenge.
pub const CHALLENGE_TTL: Duration = Duration::from_secs(120);
/// Size of the challenge nonce in bytes.
pub const NONCE_SIZE: usize = 32;
/// Size of the challenge identifier in bytes (hex doubles it on the wire).
const CHALLENGE_ID_SIZE: usize = 16;

#[derive(Debug)]
struct ChallengeEntry {
    fid: String,
    nonce: [u8; NONCE_SIZE],
    expires_at: Instant,
    ra_verified: bool,
    strict_mode: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    #[error("challenge not found or expired")]
    NotFound,
    #[error("challenge fid mismatch")]
    FidMismatch,
    #[error("challenge mode mismatch")]
    ModeMismatch,
    #[error("challenge is not attestation-verified")]
    NotVerified,
    #[error("invalid challenge response")]
    BadResponse,
    #[error("failed to generate challenge id")]
    Rng,
}

#[derive(Debug)]
pub struct ChallengeLedger {
    ttl: Duration,
    entries: Mutex<HashMap<String, ChallengeEntry>>,
}

impl Default for ChallengeLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ChallengeLedger {
    pub fn new() -> Self {
        Self::with_ttl(CHALLENGE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        ChallengeLedger {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store a nonce for `fid` and return the fresh challenge identifier.
    pub fn issue(
        &self,
        fid: &str,
        nonce: &[u8; NONCE_SIZE],
        ra_verified: bool,
        strict_mode: bool,
    ) -> Result<String, ChallengeError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("challenge ledger lock poisoned");
        gc_locked(&mut entries, now);

        let mut id_bytes = [0u8; CHALLENGE_ID_SIZE];
        getrandom::getrandom(&mut id_bytes).map_err(|_| ChallengeError::Rng)?;
        let id = hex::encode(id_bytes);

        entries.insert(
            id.clone(),
            ChallengeEntry {
                fid: fid.to_string(),
                nonce: *nonce,
                expires_at: now + self.ttl,
                ra_verified,
                strict_mode,
            },
        );
        Ok(id)
    }

    /// Verify a challenge response and destroy the entry.
    ///
    /// The entry is removed before any check runs, so a second consume of
    /// the same identifier fails identically whether or not the first
    /// verification succeeded. Strict-mode entries may only be consumed
    /// under strict mode and vice versa; the nonce comparison is
    /// constant-time.
    pub fn consume(
        &self,
        challenge_id: &str,
        fid: &str,
        response: &[u8],
        strict_mode: bool,
    ) -> Result<(), ChallengeError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("challenge ledger lock poisoned");
        gc_locked(&mut entries, now);

        let entry = entries
            .remove(challenge_id)
            .ok_or(ChallengeError::NotFound)?;

        if entry.fid != fid {
            return Err(ChallengeError::FidMismatch);
        }
        if entry.strict_mode != strict_mode {
            return Err(ChallengeError::ModeMismatch);
        }
        if strict_mode && !entry.ra_verified {
            return Err(ChallengeError::NotVerified);
        }
        if response.len() != NONCE_SIZE {
            return Err(ChallengeError::BadResponse);
        }
        if entry.nonce[..].ct_eq(response).unwrap_u8() != 1 {
            return Err(ChallengeError::BadResponse);
        }
        Ok(())
    }

    #[cfg(test)]
    fn outstanding(&self) -> usize {
        self.entries
            .lock()
            .expect("challenge ledger lock poisoned")
            .len()
    }
}

fn gc_locked(entries: &mut HashMap<String, ChallengeEntry>, now: Instant) {
    entries.retain(|_, e| e.expires_at > now);
}
