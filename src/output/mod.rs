//! Output module for crawl summaries and catalogue reports
//!
//! This module handles:
//! - Printing the summary of a finished crawl
//! - Printing catalogue statistics from storage
//! - Exporting the stored services as markdown

mod markdown;
pub mod stats;

pub use markdown::{export_catalogue, format_catalogue};
pub use stats::{load_statistics, print_crawl_summary, print_statistics, CatalogueStatistics};

use thiserror::Error;

/// Errors that can occur while producing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
