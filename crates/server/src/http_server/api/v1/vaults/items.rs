//! Admin CRUD for stored fields, grouped by section.
//!
//! A PUT replaces or adds the given fields of one section; values are
//! at-rest-encrypted before they touch the store and decrypted on GET.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::database::UpsertFieldError;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemMetaInfo {
    pub section: String,
    pub field: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListItemsResponse {
    pub items: Vec<ItemMetaInfo>,
}

/// GET /v1/vaults/:id/items — field metadata, no values.
pub async fn list_handler(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
) -> Result<Json<ListItemsResponse>, ItemsError> {
    require_vault(&state, &id).await?;

    let items = state
        .database()
        .list_items(&id)
        .await
        .map_err(|e| ItemsError::Database(e.to_string()))?;

    Ok(Json(ListItemsResponse {
        items: items
            .into_iter()
            .map(|m| ItemMetaInfo {
                section: m.section,
                field: m.field,
                created_at: m.created_at,
                updated_at: m.updated_at,
            })
            .collect(),
    }))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionResponse {
    pub section: String,
    pub fields: BTreeMap<String, String>,
}

/// GET /v1/vaults/:id/items/:section — decrypted field values.
pub async fn get_handler(
    State(state): State<ServiceState>,
    Path((id, section)): Path<(String, String)>,
) -> Result<Json<SectionResponse>, ItemsError> {
    require_vault(&state, &id).await?;

    let rows = state
        .database()
        .list_section_fields(&id, &section)
        .await
        .map_err(|e| ItemsError::Database(e.to_string()))?;
    if rows.is_empty() {
        return Err(ItemsError::SectionNotFound);
    }

    let mut fields = BTreeMap::new();
    for (field, stored) in rows {
        let plaintext = state
            .master_key()
            .decrypt_at_rest(&stored)
            .map_err(|_| ItemsError::Internal)?;
        let value = String::from_utf8(plaintext).map_err(|_| ItemsError::Internal)?;
        fields.insert(field, value);
    }

    Ok(Json(SectionResponse { section, fields }))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutSectionRequest {
    pub fields: BTreeMap<String, String>,
}

/// PUT /v1/vaults/:id/items/:section — upsert fields.
pub async fn put_handler(
    State(state): State<ServiceState>,
    Path((id, section)): Path<(String, String)>,
    Json(req): Json<PutSectionRequest>,
) -> Result<Json<serde_json::Value>, ItemsError> {
    if section.is_empty() {
        return Err(ItemsError::InvalidSection);
    }
    if req.fields.is_empty() {
        return Err(ItemsError::NoFields);
    }
    if req.fields.keys().any(|f| f.is_empty() || f.contains('/')) {
        return Err(ItemsError::InvalidField);
    }

    for (field, value) in &req.fields {
        let encrypted = state
            .master_key()
            .encrypt_at_rest(value.as_bytes())
            .map_err(|_| ItemsError::Internal)?;
        match state
            .database()
            .upsert_field(&id, &section, field, &encrypted)
            .await
        {
            Ok(()) => {}
            Err(UpsertFieldError::VaultNotFound) => return Err(ItemsError::VaultNotFound),
            Err(UpsertFieldError::Database(e)) => {
                return Err(ItemsError::Database(e.to_string()))
            }
        }
    }

    Ok(Json(serde_json::json!({
        "section": section,
        "stored": req.fields.len(),
        "status": "stored",
    })))
}

/// DELETE /v1/vaults/:id/items/:section — drop a whole section.
pub async fn delete_handler(
    State(state): State<ServiceState>,
    Path((id, section)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ItemsError> {
    require_vault(&state, &id).await?;

    let deleted = state
        .database()
        .delete_section(&id, &section)
        .await
        .map_err(|e| ItemsError::Database(e.to_string()))?;
    if !deleted {
        return Err(ItemsError::SectionNotFound);
    }

    Ok(Json(serde_json::json!({
        "section": section,
        "status": "deleted",
    })))
}

async fn require_vault(state: &ServiceState, id: &str) -> Result<(), ItemsError> {
    let vault = state
        .database()
        .get_vault(id)
        .await
        .map_err(|e| ItemsError::Database(e.to_string()))?;
    if vault.is_none() {
        return Err(ItemsError::VaultNotFound);
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ItemsError {
    #[error("vault not found")]
    VaultNotFound,
    #[error("section not found")]
    SectionNotFound,
    #[error("section must be non-empty")]
    InvalidSection,
    #[error("field names must be non-empty and must not contain '/'")]
    InvalidField,
    #[error("at least one field is required")]
    NoFields,
    #[error("database error: {0}")]
    Database(String),
    #[error("internal error")]
    Internal,
}

impl IntoResponse for ItemsError {
    fn into_response(self) -> Response {
        use ItemsError::*;
        let status = match &self {
            VaultNotFound | SectionNotFound => http::StatusCode::NOT_FOUND,
            InvalidSection | InvalidField | NoFields => http::StatusCode::BAD_REQUEST,
            Database(_) | Internal => http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
