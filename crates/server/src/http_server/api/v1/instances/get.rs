use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::InstanceInfo;
use crate::ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    Path(fid): Path<String>,
) -> Result<Json<InstanceInfo>, GetInstanceError> {
    let inst = state
        .database()
        .get_instance(&fid)
        .await
        .map_err(|e| GetInstanceError::Database(e.to_string()))?
        .ok_or(GetInstanceError::NotFound)?;

    Ok(Json(inst.into()))
}

#[derive(Debug, thiserror::Error)]
pub enum GetInstanceError {
    #[error("instance not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(String),
}

impl IntoResponse for GetInstanceError {
    fn into_response(self) -> Response {
        let status = match &self {
            GetInstanceError::NotFound => http::StatusCode::NOT_FOUND,
            GetInstanceError::Database(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
