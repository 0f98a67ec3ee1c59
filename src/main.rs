//! Service-Harvester main entry point
//!
//! This is the command-line interface for the Service-Harvester crawler.

use anyhow::Context;
use clap::Parser;
use service_harvester::config::{load_config_with_hash, Config};
use service_harvester::crawler::{
    build_http_client, Coordinator, LinkOutcome, Pipeline, QueuedLink,
};
use service_harvester::output::{
    export_catalogue, load_statistics, print_crawl_summary, print_statistics,
};
use service_harvester::storage::SqliteStorage;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Service-Harvester: structured records from public-service pages
///
/// Service-Harvester reads a listing of service description pages, extracts
/// prerequisites, required documents, fees, legal basis and forms from each
/// page, and stores them in a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "service-harvester")]
#[command(version)]
#[command(about = "Harvests public-service descriptions into SQLite", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the number of concurrent workers
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=32))]
    workers: Option<u32>,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Start a new run even if an interrupted one exists
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "export_catalogue", "extract"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_catalogue", "extract"])]
    stats: bool,

    /// Write the stored services as markdown and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "extract"])]
    export_catalogue: bool,

    /// Extract a single service page and print the record without storing it
    #[arg(long, value_name = "URL", conflicts_with_all = ["dry_run", "stats", "export_catalogue"])]
    extract: Option<Url>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_catalogue {
        handle_export_catalogue(&config)?;
    } else if let Some(url) = cli.extract {
        handle_extract(&config, url).await?;
    } else {
        let show_progress = !cli.no_progress && !cli.quiet;
        handle_crawl(config, config_hash, show_progress, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("service_harvester=info,warn"),
            1 => EnvFilter::new("service_harvester=debug,info"),
            2 => EnvFilter::new("service_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Service-Harvester Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Seed URL: {}", config.crawler.seed_url);
    println!("  Link selector: {}", config.crawler.link_selector);
    println!("  Workers: {}", config.crawler.workers);
    println!(
        "  Request timeout: {}s",
        config.crawler.request_timeout_secs
    );
    println!(
        "  Retries: {} (backoff {}ms)",
        config.crawler.max_retries, config.crawler.retry_backoff_ms
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nExtraction:");
    println!("  Title tag: {}", config.extraction.title_tag);
    println!("  Section tag: {}", config.extraction.section_tag);
    println!("  Fees fallback: {}", config.extraction.fees_fallback);
    println!(
        "  Max form URL length: {}",
        config.extraction.max_form_url_length
    );
    println!("  Section labels:");
    for label in config.extraction.labels.all() {
        println!("    - {}", label);
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Catalogue: {}", config.output.catalogue_path);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would crawl the service links on {}",
        config.crawler.seed_url
    );
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_database(config)?;
    let stats = load_statistics(&storage, &config.extraction.fees_fallback)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-catalogue mode: writes the stored services as markdown
fn handle_export_catalogue(config: &Config) -> anyhow::Result<()> {
    println!("=== Exporting Service Catalogue ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", config.output.catalogue_path);
    println!();

    let storage = open_database(config)?;

    tracing::info!("Loading services from database...");
    let count = export_catalogue(
        &storage,
        &config.extraction.labels,
        Path::new(&config.output.catalogue_path),
    )
    .context("Failed to export catalogue")?;

    println!(
        "✓ {} services exported to: {}",
        count, config.output.catalogue_path
    );

    Ok(())
}

/// Handles the --extract mode: previews the record of a single page
async fn handle_extract(config: &Config, url: Url) -> anyhow::Result<()> {
    let timeout = Duration::from_secs(config.crawler.request_timeout_secs);
    let client = build_http_client(&config.user_agent, timeout)?;
    let pipeline = Pipeline::new(client, config);

    let report = pipeline.process_link(QueuedLink { index: 0, url }).await;

    match report.outcome {
        LinkOutcome::Built(built) => {
            let service = &built.service;
            println!("=== {} ===\n", service.title);
            println!("Source: {}\n", service.source_url);

            let labels = &config.extraction.labels;
            for (label, text) in [
                (&labels.prerequisites, &service.prerequisites),
                (&labels.required_documents, &service.required_documents),
                (&labels.fees, &service.fees),
                (&labels.legal_basis, &service.legal_basis),
            ] {
                println!("{}:", label);
                println!("{}\n", if text.is_empty() { "-" } else { text.as_str() });
            }

            println!("{} ({}):", labels.forms, service.forms.len());
            for form in &service.forms {
                println!("  - {} <{}>", form.title, form.url);
            }
            for dropped in &built.dropped_forms {
                println!("  ! dropped <{}> ({})", dropped.row.url, dropped.reason);
            }
            Ok(())
        }
        LinkOutcome::Skipped { reason, detail } => {
            anyhow::bail!("Page skipped ({}): {}", reason, detail)
        }
    }
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: String,
    show_progress: bool,
    fresh: bool,
) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} with {} worker(s)",
        config.crawler.seed_url,
        config.crawler.workers
    );
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring interrupted runs)");
    }

    let storage = open_database(&config)?;
    let mut coordinator = Coordinator::new(config, config_hash, storage)?
        .with_progress(show_progress)
        .with_resume(!fresh);

    let cancel = coordinator.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight links");
            cancel.cancel();
        }
    });

    let summary = coordinator.run().await.context("Crawl failed")?;
    print_crawl_summary(&summary);

    Ok(())
}

fn open_database(config: &Config) -> anyhow::Result<SqliteStorage> {
    SqliteStorage::new(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open database {}", config.output.database_path))
}
