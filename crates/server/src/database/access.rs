//! Vault-to-instance grant graph: a junction table, nothing fancier.
//! A row's existence is the permission.

use sqlx::Row;

use super::models::TeeInstance;
use super::{is_foreign_key_violation, Database};

#[derive(Debug, thiserror::Error)]
pub enum GrantError {
    #[error("vault or instance not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl Database {
    /// Grant an instance read access to a vault. Idempotent.
    pub async fn grant_access(&self, vault_id: &str, fid: &str) -> Result<(), GrantError> {
        let result = sqlx::query(
            "INSERT INTO vault_instance_access (vault_id, fid) VALUES (?1, ?2)
             ON CONFLICT(vault_id, fid) DO NOTHING",
        )
        .bind(vault_id)
        .bind(fid)
        .execute(&**self)
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_foreign_key_violation(&e) => Err(GrantError::NotFound),
            Err(e) => Err(GrantError::Database(e)),
        }
    }

    /// Revoke a grant. Returns true if a grant existed.
    pub async fn revoke_access(&self, vault_id: &str, fid: &str) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM vault_instance_access WHERE vault_id = ?1 AND fid = ?2")
                .bind(vault_id)
                .bind(fid)
                .execute(&**self)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Authorization check for the fetch path.
    pub async fn has_access(&self, vault_id: &str, fid: &str) -> Result<bool, sqlx::Error> {
        let row = sqlx::query(
            "SELECT 1 FROM vault_instance_access WHERE vault_id = ?1 AND fid = ?2",
        )
        .bind(vault_id)
        .bind(fid)
        .fetch_optional(&**self)
        .await?;
        Ok(row.is_some())
    }

    /// List the instances granted access to a vault.
    pub async fn list_vault_instances(
        &self,
        vault_id: &str,
    ) -> Result<Vec<TeeInstance>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT i.fid, i.label, i.public_key, i.app_id, i.created_at, i.last_used_at
             FROM tee_instances i
             INNER JOIN vault_instance_access a ON a.fid = i.fid
             WHERE a.vault_id = ?1
             ORDER BY a.created_at",
        )
        .bind(vault_id)
        .fetch_all(&**self)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| TeeInstance {
                fid: r.get("fid"),
                label: r.get("label"),
                public_key: r.get("public_key"),
                app_id: r.get("app_id"),
                created_at: r.get("created_at"),
                last_used_at: r.get("last_used_at"),
            })
            .collect())
    }
}
