mod access;
mod debug_policy;
mod instances;
mod models;
mod vault_items;
mod vaults;

use std::ops::Deref;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

pub use access::GrantError;
pub use debug_policy::PolicyError;
pub use instances::RegisterInstanceError;
pub use models::{DebugPolicy, TeeInstance, Vault, VaultItemMeta};
pub use vault_items::UpsertFieldError;
pub use vaults::DeleteVaultError;

/// Handle to the SQLite store. Cheap to clone; all query methods live in
/// per-entity modules as `impl Database` blocks.
#[derive(Clone, Debug)]
pub struct Database(SqlitePool);

impl Database {
    /// Open (or create) the database at `path` and apply migrations.
    /// `":memory:"` opens an in-memory store, used by tests.
    pub async fn connect(path: &str) -> Result<Self, DatabaseSetupError> {
        let options = if path == ":memory:" {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(DatabaseSetupError::Unavailable)?
        } else {
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };
        let options = options.foreign_keys(true);

        // SQLite PRAGMAs are per-connection; a single connection keeps them
        // consistent and serializes writers the way SQLite wants anyway.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(DatabaseSetupError::Unavailable)?;

        let db = Database(pool);
        db.migrate().await?;
        Ok(db)
    }

    pub fn new(pool: SqlitePool) -> Self {
        Database(pool)
    }

    async fn migrate(&self) -> Result<(), DatabaseSetupError> {
        for statement in MIGRATIONS {
            sqlx::query(statement)
                .execute(&self.0)
                .await
                .map_err(DatabaseSetupError::MigrationFailed)?;
        }
        Ok(())
    }
}

impl Deref for Database {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseSetupError {
    #[error("error occurred while attempting database migration: {0}")]
    MigrationFailed(sqlx::Error),

    #[error("unable to perform initial connection and check of the database: {0}")]
    Unavailable(sqlx::Error),
}

const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS vaults (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS vault_items (
        vault_id TEXT NOT NULL,
        section TEXT NOT NULL,
        field TEXT NOT NULL,
        value BLOB NOT NULL,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (vault_id, section, field),
        FOREIGN KEY (vault_id) REFERENCES vaults(id)
    )",
    "CREATE TABLE IF NOT EXISTS tee_instances (
        fid TEXT PRIMARY KEY,
        label TEXT NOT NULL DEFAULT '',
        public_key BLOB NOT NULL UNIQUE,
        app_id TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        last_used_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS vault_instance_access (
        vault_id TEXT NOT NULL,
        fid TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (vault_id, fid),
        FOREIGN KEY (vault_id) REFERENCES vaults(id),
        FOREIGN KEY (fid) REFERENCES tee_instances(fid)
    )",
    "CREATE INDEX IF NOT EXISTS idx_vault_instance_access_vault
        ON vault_instance_access(vault_id)",
    "CREATE INDEX IF NOT EXISTS idx_vault_instance_access_fid
        ON vault_instance_access(fid)",
    "CREATE TABLE IF NOT EXISTS debug_policies (
        vault_id TEXT NOT NULL,
        fid TEXT NOT NULL,
        allow_read INTEGER NOT NULL DEFAULT 1,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (vault_id, fid),
        FOREIGN KEY (vault_id) REFERENCES vaults(id),
        FOREIGN KEY (fid) REFERENCES tee_instances(fid)
    )",
];

/// SQLite extended result codes, as reported through sqlx.
const SQLITE_CONSTRAINT_PRIMARYKEY: &str = "1555";
const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";
const SQLITE_CONSTRAINT_FOREIGNKEY: &str = "787";

pub(crate) fn is_primary_key_violation(err: &sqlx::Error) -> bool {
    has_code(err, SQLITE_CONSTRAINT_PRIMARYKEY)
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    has_code(err, SQLITE_CONSTRAINT_UNIQUE)
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    has_code(err, SQLITE_CONSTRAINT_FOREIGNKEY)
}

fn has_code(err: &sqlx::Error, code: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(code),
        _ => false,
    }
}
