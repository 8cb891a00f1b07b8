use sqlx::Row;

use super::models::TeeInstance;
use super::{is_primary_key_violation, is_unique_violation, Database};

#[derive(Debug, thiserror::Error)]
pub enum RegisterInstanceError {
    #[error("instance with this FID already exists")]
    DuplicateFid,
    #[error("another instance with this public key already exists")]
    DuplicateKey,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

fn row_to_instance(r: sqlx::sqlite::SqliteRow) -> TeeInstance {
    TeeInstance {
        fid: r.get("fid"),
        label: r.get("label"),
        public_key: r.get("public_key"),
        app_id: r.get("app_id"),
        created_at: r.get("created_at"),
        last_used_at: r.get("last_used_at"),
    }
}

impl Database {
    pub async fn register_instance(
        &self,
        fid: &str,
        public_key: &[u8],
        app_id: &str,
        label: &str,
    ) -> Result<(), RegisterInstanceError> {
        let result = sqlx::query(
            "INSERT INTO tee_instances (fid, public_key, app_id, label)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(fid)
        .bind(public_key)
        .bind(app_id)
        .bind(label)
        .execute(&**self)
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_primary_key_violation(&e) => Err(RegisterInstanceError::DuplicateFid),
            Err(e) if is_unique_violation(&e) => Err(RegisterInstanceError::DuplicateKey),
            Err(e) => Err(RegisterInstanceError::Database(e)),
        }
    }

    pub async fn get_instance(&self, fid: &str) -> Result<Option<TeeInstance>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT fid, label, public_key, app_id, created_at, last_used_at
             FROM tee_instances WHERE fid = ?1",
        )
        .bind(fid)
        .fetch_optional(&**self)
        .await?;
        Ok(row.map(row_to_instance))
    }

    pub async fn list_instances(&self) -> Result<Vec<TeeInstance>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT fid, label, public_key, app_id, created_at, last_used_at
             FROM tee_instances ORDER BY created_at",
        )
        .fetch_all(&**self)
        .await?;
        Ok(rows.into_iter().map(row_to_instance).collect())
    }

    /// Update the expected app identifier and label. Returns true if a row
    /// was updated.
    pub async fn update_instance(
        &self,
        fid: &str,
        app_id: &str,
        label: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE tee_instances SET app_id = ?1, label = ?2 WHERE fid = ?3")
                .bind(app_id)
                .bind(label)
                .bind(fid)
                .execute(&**self)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete an instance together with its grants and debug policies.
    /// Returns true if the instance existed.
    pub async fn delete_instance(&self, fid: &str) -> Result<bool, sqlx::Error> {
        let mut tx = self.begin().await?;

        sqlx::query("DELETE FROM debug_policies WHERE fid = ?1")
            .bind(fid)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM vault_instance_access WHERE fid = ?1")
            .bind(fid)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM tee_instances WHERE fid = ?1")
            .bind(fid)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }
        tx.commit().await?;
        Ok(true)
    }

    /// Best-effort last-used bump; callers log and continue on failure.
    pub async fn update_last_used(&self, fid: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tee_instances SET last_used_at = CURRENT_TIMESTAMP WHERE fid = ?1")
            .bind(fid)
            .execute(&**self)
            .await?;
        Ok(())
    }
}
