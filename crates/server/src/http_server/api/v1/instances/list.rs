use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::InstanceInfo;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListInstancesResponse {
    pub instances: Vec<InstanceInfo>,
}

pub async fn handler(
    State(state): State<ServiceState>,
) -> Result<Json<ListInstancesResponse>, ListInstancesError> {
    let instances = state
        .database()
        .list_instances()
        .await
        .map_err(|e| ListInstancesError::Database(e.to_string()))?;

    Ok(Json(ListInstancesResponse {
        instances: instances.into_iter().map(InstanceInfo::from).collect(),
    }))
}

#[derive(Debug, thiserror::Error)]
pub enum ListInstancesError {
    #[error("database error: {0}")]
    Database(String),
}

impl IntoResponse for ListInstancesError {
    fn into_response(self) -> Response {
        (
            http::StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
