//! Storage traits and error types
//!
//! [`Storage`] is the write side the crawl pipeline depends on. [`ServiceCatalog`]
//! is the read side used by reporting and by the outside administration layer.

use crate::record::{Form, Service};
use crate::storage::{RunCounts, RunRecord, RunStatus, ServiceFilter};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(i64),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Write operations needed by the crawl pipeline
///
/// Each insert either fully succeeds or surfaces an error; nothing is retried.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run in the `running` state
    fn create_run(&mut self, config_hash: &str, seed_url: &str) -> StorageResult<i64>;

    /// Records the final status and counters of a run
    fn finish_run(&mut self, run_id: i64, status: RunStatus, counts: &RunCounts)
        -> StorageResult<()>;

    /// Gets the most recent run for a seed URL and configuration hash
    fn find_latest_run(&self, config_hash: &str, seed_url: &str)
        -> StorageResult<Option<RunRecord>>;

    /// Puts an unfinished run back into the `running` state
    fn reopen_run(&mut self, run_id: i64) -> StorageResult<()>;

    /// Source URLs of the services stored under a run
    fn persisted_source_urls(&self, run_id: i64) -> StorageResult<HashSet<String>>;

    // ===== Records =====

    /// Inserts a service row (without its forms)
    fn insert_service(&mut self, service: &Service, run_id: Option<i64>) -> StorageResult<i64>;

    /// Inserts one form row under an existing service
    fn insert_form(&mut self, form: &Form, service_id: i64) -> StorageResult<i64>;

    /// Inserts a service and all of its forms as one atomic unit
    ///
    /// On error nothing of the service is stored.
    fn persist_service(&mut self, service: &Service, run_id: Option<i64>) -> StorageResult<i64>;
}

/// Read and administration operations over stored services
pub trait ServiceCatalog {
    // ===== Runs =====

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Services =====

    /// Gets a service with its forms
    fn get_service(&self, service_id: i64) -> StorageResult<Service>;

    /// Gets the forms of a service
    fn get_forms(&self, service_id: i64) -> StorageResult<Vec<Form>>;

    /// Lists services by ID with offset/limit pagination
    fn list_services(&self, offset: u64, limit: u64) -> StorageResult<Vec<Service>>;

    /// Lists services matching every set filter field
    fn find_services(&self, filter: &ServiceFilter) -> StorageResult<Vec<Service>>;

    /// Sets the attributes extraction never fills
    fn set_service_attributes(
        &mut self,
        service_id: i64,
        is_digital_service: Option<bool>,
        responsible_office: Option<&str>,
    ) -> StorageResult<()>;

    /// Deletes a service and, through the cascade, its forms
    ///
    /// Returns false if no such service existed.
    fn delete_service(&mut self, service_id: i64) -> StorageResult<bool>;

    // ===== Statistics =====

    /// Gets total service count
    fn count_services(&self) -> StorageResult<u64>;

    /// Gets total form count
    fn count_forms(&self) -> StorageResult<u64>;

    /// Counts services that have no forms
    fn count_services_without_forms(&self) -> StorageResult<u64>;

    /// Counts services whose fees equal `fees`
    fn count_services_with_fees(&self, fees: &str) -> StorageResult<u64>;
}
