//! Crawler module for fetching and processing service pages
//!
//! This module contains the crawl machinery, including:
//! - HTTP fetching with failure classification and optional retry
//! - The shared work queue and cancellation
//! - The per-link fetch, extract and build pipeline
//! - Overall crawl coordination and persistence

mod coordinator;
mod fetcher;
mod pipeline;
mod scheduler;
mod summary;

pub use coordinator::Coordinator;
pub use fetcher::{
    build_http_client, fetch_document, fetch_with_retry, user_agent_string, FetchError,
    RetryPolicy,
};
pub use pipeline::{LinkOutcome, LinkReport, Pipeline};
pub use scheduler::{CancelHandle, QueuedLink, Scheduler};
pub use summary::CrawlSummary;

use crate::config::Config;
use crate::storage::open_storage;
use crate::HarvestError;
use std::path::Path;

/// Runs a complete crawl against the configured SQLite database
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the storage layer
/// 2. Fetch the seed listing and enumerate service links
/// 3. Process every link and persist the valid records
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `config_hash` - Hash of the configuration file
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl finished (possibly with skipped pages)
/// * `Err(HarvestError)` - Crawl-fatal failure
pub async fn crawl(config: Config, config_hash: String) -> Result<CrawlSummary, HarvestError> {
    let storage = open_storage(Path::new(&config.output.database_path))?;
    let mut coordinator = Coordinator::new(config, config_hash, storage)?;
    coordinator.run().await
}
