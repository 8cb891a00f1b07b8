pub mod create;
pub mod delete;
pub mod get;
pub mod grants;
pub mod items;
pub mod list;
pub mod update;

use serde::{Deserialize, Serialize};

use crate::database::Vault;

/// Vault representation shared by the admin endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultInfo {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

impl From<Vault> for VaultInfo {
    fn from(v: Vault) -> Self {
        VaultInfo {
            id: v.id,
            name: v.name,
            created_at: v.created_at,
        }
    }
}
