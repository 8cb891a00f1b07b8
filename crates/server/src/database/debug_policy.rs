use sqlx::Row;

use super::models::DebugPolicy;
use super::{is_foreign_key_violation, Database};

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("vault or instance not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl Database {
    pub async fn upsert_debug_policy(
        &self,
        vault_id: &str,
        fid: &str,
        allow_read: bool,
    ) -> Result<(), PolicyError> {
        let result = sqlx::query(
            "INSERT INTO debug_policies (vault_id, fid, allow_read)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(vault_id, fid) DO UPDATE SET
               allow_read = excluded.allow_read,
               updated_at = CURRENT_TIMESTAMP",
        )
        .bind(vault_id)
        .bind(fid)
        .bind(allow_read as i32)
        .execute(&**self)
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_foreign_key_violation(&e) => Err(PolicyError::NotFound),
            Err(e) => Err(PolicyError::Database(e)),
        }
    }

    /// Fetch a debug policy. `None` means no explicit policy: allow.
    pub async fn get_debug_policy(
        &self,
        vault_id: &str,
        fid: &str,
    ) -> Result<Option<DebugPolicy>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT vault_id, fid, allow_read, updated_at
             FROM debug_policies WHERE vault_id = ?1 AND fid = ?2",
        )
        .bind(vault_id)
        .bind(fid)
        .fetch_optional(&**self)
        .await?;
        Ok(row.map(|r| DebugPolicy {
            vault_id: r.get("vault_id"),
            fid: r.get("fid"),
            allow_read: r.get::<i32, _>("allow_read") != 0,
            updated_at: r.get("updated_at"),
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_policy_round_trip() {
        let db = Database::connect(":memory:").await.unwrap();
        db.create_vault("v1", "V").await.unwrap();
        db.register_instance("f1", &[1u8; 32], "", "").await.unwrap();

        assert!(db.get_debug_policy("v1", "f1").await.unwrap().is_none());

        db.upsert_debug_policy("v1", "f1", false).await.unwrap();
        let policy = db.get_debug_policy("v1", "f1").await.unwrap().unwrap();
        assert!(!policy.allow_read);

        db.upsert_debug_policy("v1", "f1", true).await.unwrap();
        assert!(db
            .get_debug_policy("v1", "f1")
            .await
            .unwrap()
            .unwrap()
            .allow_read);
    }

    #[tokio::test]
    async fn test_policy_requires_targets() {
        let db = Database::connect(":memory:").await.unwrap();
        assert!(matches!(
            db.upsert_debug_policy("v", "f", true).await.unwrap_err(),
            PolicyError::NotFound
        ));
    }
}
