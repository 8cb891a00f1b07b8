//! Shared service state handed to every request handler

use std::sync::Arc;

use jingui_common::attestation::{Collector, FileCollector, RatlsVerifier, Verifier};
use jingui_common::crypto::MasterKey;

use crate::challenge::ChallengeLedger;
use crate::config::Config;
use crate::database::{Database, DatabaseSetupError};

/// Main service state. Clones share the same database pool and ledger.
#[derive(Clone)]
pub struct ServiceState {
    database: Database,
    ledger: Arc<ChallengeLedger>,
    master_key: MasterKey,
    admin_token: String,
    strict: bool,
    verifier: Arc<dyn Verifier>,
    collector: Option<Arc<dyn Collector>>,
}

impl ServiceState {
    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        let database = Database::connect(&config.db_path).await?;
        tracing::info!(db_path = %config.db_path, strict = config.ratls_strict, "store ready");

        let collector = FileCollector::from_env()
            .map(|c| Arc::new(c) as Arc<dyn Collector>);
        if config.ratls_strict && collector.is_none() {
            tracing::warn!(
                "strict attestation enabled but no bundle source configured; \
                 challenge requests will fail until one is provided"
            );
        }

        Ok(ServiceState {
            database,
            ledger: Arc::new(ChallengeLedger::new()),
            master_key: config.master_key.clone(),
            admin_token: config.admin_token.clone(),
            strict: config.ratls_strict,
            verifier: Arc::new(RatlsVerifier::new()),
            collector,
        })
    }

    /// Assemble state from parts. Tests use this to swap in their own
    /// ledger, verifier, or collector.
    pub fn new(
        database: Database,
        ledger: Arc<ChallengeLedger>,
        master_key: MasterKey,
        admin_token: String,
        strict: bool,
        verifier: Arc<dyn Verifier>,
        collector: Option<Arc<dyn Collector>>,
    ) -> Self {
        ServiceState {
            database,
            ledger,
            master_key,
            admin_token,
            strict,
            verifier,
            collector,
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn ledger(&self) -> &ChallengeLedger {
        &self.ledger
    }

    pub fn master_key(&self) -> &MasterKey {
        &self.master_key
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn verifier(&self) -> &dyn Verifier {
        self.verifier.as_ref()
    }

    pub fn collector(&self) -> Option<&dyn Collector> {
        self.collector.as_deref()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("database setup error: {0}")]
    DatabaseSetupError(#[from] DatabaseSetupError),
}
