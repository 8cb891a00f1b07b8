//! Row types shared by the query modules. Endpoint responses define their
//! own serde types and convert from these.

/// A vault: a named collection of sections and fields.
#[derive(Debug, Clone)]
pub struct Vault {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

/// Metadata for a stored field. The encrypted value is fetched separately.
#[derive(Debug, Clone)]
pub struct VaultItemMeta {
    pub vault_id: String,
    pub section: String,
    pub field: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A registered TEE instance.
#[derive(Debug, Clone)]
pub struct TeeInstance {
    pub fid: String,
    pub label: String,
    pub public_key: Vec<u8>,
    /// Attestation-expected app identifier bound at registration.
    pub app_id: String,
    pub created_at: String,
    pub last_used_at: Option<String>,
}

/// Per-(vault, instance) debug policy. Absence means "allow".
#[derive(Debug, Clone)]
pub struct DebugPolicy {
    pub vault_id: String,
    pub fid: String,
    pub allow_read: bool,
    pub updated_at: String,
}
