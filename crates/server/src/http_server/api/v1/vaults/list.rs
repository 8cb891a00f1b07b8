use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::VaultInfo;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListVaultsResponse {
    pub vaults: Vec<VaultInfo>,
}

pub async fn handler(
    State(state): State<ServiceState>,
) -> Result<Json<ListVaultsResponse>, ListVaultsError> {
    let vaults = state
        .database()
        .list_vaults()
        .await
        .map_err(|e| ListVaultsError::Database(e.to_string()))?;

    Ok(Json(ListVaultsResponse {
        vaults: vaults.into_iter().map(VaultInfo::from).collect(),
    }))
}

#[derive(Debug, thiserror::Error)]
pub enum ListVaultsError {
    #[error("database error: {0}")]
    Database(String),
}

impl IntoResponse for ListVaultsError {
    fn into_response(self) -> Response {
        (
            http::StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
