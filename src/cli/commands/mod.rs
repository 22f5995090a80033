//! CLI command handlers for `plantracker`.
//!
//! Each command group is implemented in its own submodule. Handlers return
//! errors to `main`, which reports them and sets the exit status.

pub mod config;
pub mod progress;
pub mod state;

use plan_tracker::config::Config;
use plan_tracker::core::models::PlanIdentity;
use plan_tracker::core::storage::StorageError;
use plan_tracker::core::sync::{BackendConfig, SyncOrchestrator};
use std::error::Error;

/// Result of a command handler
pub type CommandResult = Result<(), Box<dyn Error>>;

/// Build the orchestrator for the backend the configuration selects
pub fn open_sync(config: &Config) -> Result<SyncOrchestrator, StorageError> {
    let backend = BackendConfig::select(config);
    SyncOrchestrator::from_config(&backend, PlanIdentity::new(&config.catalog.plan_id))
}
