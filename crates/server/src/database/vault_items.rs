use sqlx::Row;

use super::models::VaultItemMeta;
use super::{is_foreign_key_violation, Database};

#[derive(Debug, thiserror::Error)]
pub enum UpsertFieldError {
    #[error("vault not found")]
    VaultNotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl Database {
    /// Insert or update a stored field. `value` is the at-rest-encrypted blob.
    pub async fn upsert_field(
        &self,
        vault_id: &str,
        section: &str,
        field: &str,
        value: &[u8],
    ) -> Result<(), UpsertFieldError> {
        let result = sqlx::query(
            "INSERT INTO vault_items (vault_id, section, field, value)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(vault_id, section, field) DO UPDATE SET
               value = excluded.value,
               updated_at = CURRENT_TIMESTAMP",
        )
        .bind(vault_id)
        .bind(section)
        .bind(field)
        .bind(value)
        .execute(&**self)
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_foreign_key_violation(&e) => Err(UpsertFieldError::VaultNotFound),
            Err(e) => Err(UpsertFieldError::Database(e)),
        }
    }

    /// Fetch a stored field's encrypted value.
    pub async fn get_field(
        &self,
        vault_id: &str,
        section: &str,
        field: &str,
    ) -> Result<Option<Vec<u8>>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT value FROM vault_items
             WHERE vault_id = ?1 AND section = ?2 AND field = ?3",
        )
        .bind(vault_id)
        .bind(section)
        .bind(field)
        .fetch_optional(&**self)
        .await?;
        Ok(row.map(|r| r.get("value")))
    }

    /// List field metadata for a vault (no values).
    pub async fn list_items(&self, vault_id: &str) -> Result<Vec<VaultItemMeta>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT vault_id, section, field, created_at, updated_at
             FROM vault_items WHERE vault_id = ?1
             ORDER BY section, field",
        )
        .bind(vault_id)
        .fetch_all(&**self)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| VaultItemMeta {
                vault_id: r.get("vault_id"),
                section: r.get("section"),
                field: r.get("field"),
                created_at: r.get("created_at"),
                updated_at: r.get("updated_at"),
            })
            .collect())
    }

    /// Fetch every (field, encrypted value) pair in a section.
    pub async fn list_section_fields(
        &self,
        vault_id: &str,
        section: &str,
    ) -> Result<Vec<(String, Vec<u8>)>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT field, value FROM vault_items
             WHERE vault_id = ?1 AND section = ?2
             ORDER BY field",
        )
        .bind(vault_id)
        .bind(section)
        .fetch_all(&**self)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| (r.get("field"), r.get("value")))
            .collect())
    }

    /// Delete every field in a section. Returns true if any row was deleted.
    pub async fn delete_section(
        &self,
        vault_id: &str,
        section: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM vault_items WHERE vault_id = ?1 AND section = ?2")
                .bind(vault_id)
                .bind(section)
                .execute(&**self)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
