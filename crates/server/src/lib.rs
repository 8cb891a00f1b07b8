// Service modules (broker daemon functionality)
pub mod challenge;
pub mod config;
pub mod database;
pub mod http_server;
pub mod process;
pub mod state;

// Re-exports for consumers (CLI, tests)
pub use challenge::ChallengeLedger;
pub use config::Config;
pub use process::spawn_service;
pub use state::ServiceState;
