//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop, including:
//! - Fetching the seed listing and enumerating service links
//! - Recording the run, or resuming an unfinished one
//! - Driving the worker pool over the shared queue
//! - Persisting each built record as it arrives
//! - Handling cancellation

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, fetch_with_retry};
use crate::crawler::pipeline::{LinkOutcome, LinkReport, Pipeline};
use crate::crawler::scheduler::{CancelHandle, QueuedLink, Scheduler};
use crate::crawler::summary::CrawlSummary;
use crate::extract::extract_listing_links;
use crate::record::BuiltService;
use crate::state::SkipReason;
use crate::storage::{RunStatus, Storage};
use crate::HarvestError;
use indicatif::{ProgressBar, ProgressStyle};
use scraper::Selector;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::Level;
use url::Url;

/// Progress line interval, in processed links
const PROGRESS_LOG_INTERVAL: u64 = 10;

/// Main crawler coordinator structure
///
/// The coordinator owns the storage and is the only place records are written.
pub struct Coordinator<S: Storage> {
    config: Arc<Config>,
    config_hash: String,
    storage: S,
    pipeline: Arc<Pipeline>,
    cancel: CancelHandle,
    show_progress: bool,
    resume: bool,
}

impl<S: Storage> Coordinator<S> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The validated harvester configuration
    /// * `config_hash` - Hash of the configuration file, stored on the run
    /// * `storage` - Storage the records are persisted to
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - Failed to build the HTTP client
    pub fn new(config: Config, config_hash: String, storage: S) -> Result<Self, HarvestError> {
        let timeout = Duration::from_secs(config.crawler.request_timeout_secs);
        let client = build_http_client(&config.user_agent, timeout)?;
        let pipeline = Pipeline::new(client, &config);

        Ok(Self {
            config: Arc::new(config),
            config_hash,
            storage,
            pipeline: Arc::new(pipeline),
            cancel: CancelHandle::new(),
            show_progress: false,
            resume: true,
        })
    }

    /// Enables the terminal progress bar
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Controls whether an unfinished run for the same seed and configuration
    /// is continued instead of starting a new one
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    /// Returns a handle that stops the crawl after the in-flight links
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Fetches the seed listing and returns the service links on it
    ///
    /// A failed seed fetch is the only fatal fetch error of a crawl.
    pub async fn discover_links(&self) -> Result<Vec<Url>, HarvestError> {
        let seed_url = Url::parse(&self.config.crawler.seed_url)?;
        tracing::info!("Fetching seed listing {}", seed_url);

        let listing = fetch_with_retry(
            self.pipeline.client(),
            &seed_url,
            self.pipeline.retry_policy(),
        )
        .await
        .map_err(|source| HarvestError::SeedFetch {
            url: seed_url.to_string(),
            source,
        })?;

        let selector = Selector::parse(&self.config.crawler.link_selector)
            .map_err(|_| HarvestError::InvalidSelector(self.config.crawler.link_selector.clone()))?;

        let links = extract_listing_links(&listing, &selector, &seed_url);
        tracing::info!("Found {} service links on {}", links.len(), seed_url);

        Ok(links)
    }

    /// Reopens the latest unfinished run for this seed and configuration, or
    /// records a new one
    ///
    /// Returns the run ID and the source URLs already stored under it.
    fn start_run(&mut self) -> Result<(i64, HashSet<String>), HarvestError> {
        let seed_url = &self.config.crawler.seed_url;

        if self.resume {
            if let Some(run) = self.storage.find_latest_run(&self.config_hash, seed_url)? {
                if matches!(run.status, RunStatus::Running | RunStatus::Interrupted) {
                    tracing::info!("Resuming interrupted run {}", run.id);
                    self.storage.reopen_run(run.id)?;
                    let stored = self.storage.persisted_source_urls(run.id)?;
                    return Ok((run.id, stored));
                }
            }
        }

        let run_id = self.storage.create_run(&self.config_hash, seed_url)?;
        tracing::info!("Starting crawl run {}", run_id);
        Ok((run_id, HashSet::new()))
    }

    /// Runs the crawl
    ///
    /// 1. Fetches the seed listing and enumerates links
    /// 2. Resumes the unfinished run or records a new one
    /// 3. Spawns the workers over the links not yet stored under the run
    /// 4. Persists each built record as its report arrives
    /// 5. Finishes the run with the final counters
    pub async fn run(&mut self) -> Result<CrawlSummary, HarvestError> {
        let start_time = Instant::now();

        let links = self.discover_links().await?;
        let (run_id, stored) = self.start_run()?;

        let mut summary = CrawlSummary::new(links.len());
        summary.run_id = Some(run_id);

        let pending: Vec<QueuedLink> = links
            .into_iter()
            .enumerate()
            .filter(|(_, url)| !stored.contains(url.as_str()))
            .map(|(index, url)| QueuedLink { index, url })
            .collect();
        summary.already_persisted = summary.total_links - pending.len() as u64;
        if summary.already_persisted > 0 {
            tracing::info!(
                "{} of {} links already stored under run {}",
                summary.already_persisted,
                summary.total_links,
                run_id
            );
        }

        let scheduler = Scheduler::new(pending, self.cancel.clone());
        let workers = self.config.crawler.workers.max(1) as usize;
        let (tx, mut rx) = mpsc::channel::<LinkReport>(workers * 2);

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let scheduler = scheduler.clone();
            let pipeline = Arc::clone(&self.pipeline);
            let tx = tx.clone();

            handles.push(tokio::spawn(async move {
                while let Some(link) = scheduler.next_link() {
                    let report = pipeline.process_link(link).await;
                    if tx.send(report).await.is_err() {
                        break;
                    }
                }
                tracing::debug!("Worker {} finished", worker_id);
            }));
        }

        // Drop our copy of tx so rx closes when all workers finish
        drop(tx);

        let progress = self.progress_bar(summary.total_links);
        progress.set_position(summary.already_persisted);

        while let Some(report) = rx.recv().await {
            self.handle_report(run_id, report, &mut summary);
            progress.inc(1);

            if summary.attempted % PROGRESS_LOG_INTERVAL == 0 {
                let rate = summary.attempted as f64 / start_time.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {}/{} links processed, {} persisted, {} skipped, {:.2} links/sec",
                    summary.attempted + summary.already_persisted,
                    summary.total_links,
                    summary.persisted,
                    summary.skipped,
                    rate
                );
            }
        }

        progress.finish_and_clear();

        let mut worker_failed = false;
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Worker task failed: {}", e);
                worker_failed = true;
            }
        }

        summary.interrupted = scheduler.is_cancelled() && scheduler.remaining() > 0;
        summary.elapsed = start_time.elapsed();

        let status = if worker_failed {
            RunStatus::Failed
        } else {
            summary.status()
        };
        self.storage
            .finish_run(run_id, status, &summary.run_counts())?;

        if summary.interrupted {
            tracing::warn!(
                "Crawl run {} interrupted after {} of {} links",
                run_id,
                summary.attempted,
                summary.total_links
            );
        } else {
            tracing::info!(
                "Crawl run {} finished: {} persisted, {} skipped, {} persist failures in {:?}",
                run_id,
                summary.persisted,
                summary.skipped,
                summary.persist_failures,
                summary.elapsed
            );
        }

        Ok(summary)
    }

    /// Applies one link report to storage and the counters
    fn handle_report(&mut self, run_id: i64, report: LinkReport, summary: &mut CrawlSummary) {
        summary.attempted += 1;

        match report.outcome {
            LinkOutcome::Built(built) => self.persist(run_id, &report.url, built, summary),
            LinkOutcome::Skipped { reason, detail } => {
                summary.skipped += 1;
                summary.record_reason(reason);
                if reason.log_level() == Level::ERROR {
                    tracing::error!(
                        reason = reason.code(),
                        url = %report.url,
                        "Skipping page: {}",
                        detail
                    );
                } else {
                    tracing::warn!(
                        reason = reason.code(),
                        url = %report.url,
                        "Skipping page: {}",
                        detail
                    );
                }
            }
        }
    }

    fn persist(&mut self, run_id: i64, url: &Url, built: BuiltService, summary: &mut CrawlSummary) {
        for dropped in &built.dropped_forms {
            summary.forms_dropped += 1;
            summary.record_reason(dropped.reason);
        }

        match self.storage.persist_service(&built.service, Some(run_id)) {
            Ok(service_id) => {
                summary.persisted += 1;
                summary.forms_persisted += built.service.forms.len() as u64;
                tracing::debug!(
                    service_id,
                    url = %url,
                    "Persisted '{}' with {} forms",
                    built.service.title,
                    built.service.forms.len()
                );
            }
            Err(e) => {
                summary.persist_failures += 1;
                summary.record_reason(SkipReason::PersistError);
                tracing::error!(
                    reason = SkipReason::PersistError.code(),
                    url = %url,
                    "Failed to persist service: {}",
                    e
                );
            }
        }
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        pb.set_style(style);
        pb
    }
}
