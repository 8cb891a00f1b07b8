pub mod delete;
pub mod get;
pub mod list;
pub mod register;
pub mod update;

use serde::{Deserialize, Serialize};

use crate::database::TeeInstance;

/// Instance representation shared by the admin endpoints. The public key is
/// hex on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub fid: String,
    pub label: String,
    pub public_key: String,
    pub app_id: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<String>,
}

impl From<TeeInstance> for InstanceInfo {
    fn from(inst: TeeInstance) -> Self {
        InstanceInfo {
            fid: inst.fid,
            label: inst.label,
            public_key: hex::encode(&inst.public_key),
            app_id: inst.app_id,
            created_at: inst.created_at,
            last_used_at: inst.last_used_at,
        }
    }
}
