//! Statistics from the service database and from a finished crawl
//!
//! This module provides functionality for extracting and displaying
//! catalogue statistics from the storage layer.

use crate::crawler::CrawlSummary;
use crate::output::{OutputError, OutputResult};
use crate::state::SkipReason;
use crate::storage::{RunRecord, ServiceCatalog};

/// Catalogue statistics summary
#[derive(Debug, Clone)]
pub struct CatalogueStatistics {
    /// Number of stored services
    pub services: u64,

    /// Number of stored forms
    pub forms: u64,

    /// Services that have no forms
    pub services_without_forms: u64,

    /// Services whose fees section was missing
    pub services_with_fees_fallback: u64,

    /// The most recent crawl run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `catalog` - The storage to query
/// * `fees_fallback` - The configured fees fallback text
///
/// # Returns
///
/// * `Ok(CatalogueStatistics)` - Successfully loaded statistics
/// * `Err(OutputError)` - Failed to query statistics
pub fn load_statistics(
    catalog: &dyn ServiceCatalog,
    fees_fallback: &str,
) -> OutputResult<CatalogueStatistics> {
    let storage_err = |e: crate::storage::StorageError| OutputError::Storage(e.to_string());

    Ok(CatalogueStatistics {
        services: catalog.count_services().map_err(storage_err)?,
        forms: catalog.count_forms().map_err(storage_err)?,
        services_without_forms: catalog.count_services_without_forms().map_err(storage_err)?,
        services_with_fees_fallback: catalog
            .count_services_with_fees(fees_fallback)
            .map_err(storage_err)?,
        latest_run: catalog.get_latest_run().map_err(storage_err)?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CatalogueStatistics) {
    println!("=== Catalogue Statistics ===\n");

    println!("Overview:");
    println!("  Services: {}", stats.services);
    println!("  Forms: {}", stats.forms);
    println!(
        "  Services without forms: {} ({:.1}%)",
        stats.services_without_forms,
        percentage(stats.services_without_forms, stats.services)
    );
    println!(
        "  Services without fees section: {} ({:.1}%)",
        stats.services_with_fees_fallback,
        percentage(stats.services_with_fees_fallback, stats.services)
    );
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  Run ID: {}", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Seed: {}", run.seed_url);
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!(
                "  Links: {} total, {} attempted, {} persisted, {} skipped, {} persist failures",
                run.counts.links_total,
                run.counts.attempted,
                run.counts.persisted,
                run.counts.skipped,
                run.counts.persist_failures
            );
        }
        None => println!("No crawl runs recorded."),
    }
}

/// Prints the result of a finished crawl to stdout
pub fn print_crawl_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");

    if let Some(run_id) = summary.run_id {
        println!("  Run ID: {}", run_id);
    }
    println!(
        "  Status: {}",
        if summary.interrupted {
            "interrupted"
        } else {
            "completed"
        }
    );
    println!("  Duration: {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    println!("Links:");
    println!("  Found: {}", summary.total_links);
    if summary.already_persisted > 0 {
        println!("  Stored before resume: {}", summary.already_persisted);
    }
    println!("  Attempted: {}", summary.attempted);
    println!("  Persisted: {}", summary.persisted);
    println!("  Skipped: {}", summary.skipped);
    println!("  Persist failures: {}", summary.persist_failures);
    println!();

    println!("Forms:");
    println!("  Persisted: {}", summary.forms_persisted);
    println!("  Dropped: {}", summary.forms_dropped);

    for (heading, row_level) in [("Skipped Pages", false), ("Dropped Form Rows", true)] {
        let counts = reason_counts(summary, row_level);
        if !counts.is_empty() {
            println!();
            println!("{}:", heading);
            for (reason, count) in counts {
                println!("  {}: {}", reason, count);
            }
        }
    }
}

/// Non-zero reason counts of one level, in declaration order
fn reason_counts(summary: &CrawlSummary, row_level: bool) -> Vec<(SkipReason, u64)> {
    SkipReason::ALL
        .into_iter()
        .filter(|reason| reason.is_row_level() == row_level)
        .map(|reason| (reason, summary.reason_count(reason)))
        .filter(|(_, count)| *count > 0)
        .collect()
}

fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}
