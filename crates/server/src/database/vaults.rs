use sqlx::Row;

use super::models::Vault;
use super::{is_foreign_key_violation, is_primary_key_violation, Database};

#[derive(Debug, thiserror::Error)]
pub enum DeleteVaultError {
    #[error("vault has dependent records; delete them first or use ?cascade=true")]
    HasDependents,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl Database {
    /// Insert a new vault. Returns `Ok(false)` if the id is already taken.
    pub async fn create_vault(&self, id: &str, name: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("INSERT INTO vaults (id, name) VALUES (?1, ?2)")
            .bind(id)
            .bind(name)
            .execute(&**self)
            .await;
        match result {
            Ok(_) => Ok(true),
            Err(e) if is_primary_key_violation(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn get_vault(&self, id: &str) -> Result<Option<Vault>, sqlx::Error> {
        let row = sqlx::query("SELECT id, name, created_at FROM vaults WHERE id = ?1")
            .bind(id)
            .fetch_optional(&**self)
            .await?;
        Ok(row.map(|r| Vault {
            id: r.get("id"),
            name: r.get("name"),
            created_at: r.get("created_at"),
        }))
    }

    pub async fn list_vaults(&self) -> Result<Vec<Vault>, sqlx::Error> {
        let rows = sqlx::query("SELECT id, name, created_at FROM vaults ORDER BY created_at")
            .fetch_all(&**self)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| Vault {
                id: r.get("id"),
                name: r.get("name"),
                created_at: r.get("created_at"),
            })
            .collect())
    }

    /// Rename a vault. Returns true if a row was updated.
    pub async fn update_vault(&self, id: &str, name: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE vaults SET name = ?1 WHERE id = ?2")
            .bind(name)
            .bind(id)
            .execute(&**self)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a vault with no dependents. Returns true if a row was deleted.
    pub async fn delete_vault(&self, id: &str) -> Result<bool, DeleteVaultError> {
        let result = sqlx::query("DELETE FROM vaults WHERE id = ?1")
            .bind(id)
            .execute(&**self)
            .await;
        match result {
            Ok(r) => Ok(r.rows_affected() > 0),
            Err(e) if is_foreign_key_violation(&e) => Err(DeleteVaultError::HasDependents),
            Err(e) => Err(DeleteVaultError::Database(e)),
        }
    }

    /// Delete a vault and all dependent records in one transaction.
    /// Returns true if the vault existed.
    pub async fn delete_vault_cascade(&self, id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = self.begin().await?;

        sqlx::query("DELETE FROM debug_policies WHERE vault_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM vault_instance_access WHERE vault_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM vault_items WHERE vault_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM vaults WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }
        tx.commit().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    async fn test_db() -> Database {
        Database::connect(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_create_get_list() {
        let db = test_db().await;
        assert!(db.create_vault("v1", "Vault One").await.unwrap());
        assert!(!db.create_vault("v1", "Duplicate").await.unwrap());

        let v = db.get_vault("v1").await.unwrap().unwrap();
        assert_eq!(v.name, "Vault One");
        assert!(db.get_vault("missing").await.unwrap().is_none());

        db.create_vault("v2", "Vault Two").await.unwrap();
        assert_eq!(db.list_vaults().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = test_db().await;
        db.create_vault("v1", "Old").await.unwrap();

        assert!(db.update_vault("v1", "New").await.unwrap());
        assert!(!db.update_vault("missing", "x").await.unwrap());
        assert_eq!(db.get_vault("v1").await.unwrap().unwrap().name, "New");

        assert!(db.delete_vault("v1").await.unwrap());
        assert!(!db.delete_vault("v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_with_dependents() {
        let db = test_db().await;
        db.create_vault("v1", "V").await.unwrap();
        db.upsert_field("v1", "sec", "f", b"val").await.unwrap();

        let err = db.delete_vault("v1").await.unwrap_err();
        assert!(matches!(err, DeleteVaultError::HasDependents));

        assert!(db.delete_vault_cascade("v1").await.unwrap());
        assert!(db.get_vault("v1").await.unwrap().is_none());
        assert!(db.get_field("v1", "sec", "f").await.unwrap().is_none());
    }
}
