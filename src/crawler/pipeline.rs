//! Per-link processing: fetch, extract, build
//!
//! A [`Pipeline`] is shared by all workers. It never touches storage; its
//! result is a [`LinkReport`] handed to the persistence consumer.

use crate::config::{Config, ExtractionConfig};
use crate::crawler::fetcher::{fetch_with_retry, RetryPolicy};
use crate::crawler::scheduler::QueuedLink;
use crate::extract::extract_service_page;
use crate::record::{BuiltService, RecordBuilder};
use crate::state::SkipReason;
use reqwest::Client;
use url::Url;

/// What became of one service link
#[derive(Debug, Clone)]
pub enum LinkOutcome {
    /// A valid record ready for persistence
    Built(BuiltService),

    /// The page was skipped before a record could be built
    Skipped { reason: SkipReason, detail: String },
}

/// Result of processing one link
#[derive(Debug, Clone)]
pub struct LinkReport {
    pub index: usize,
    pub url: Url,
    pub outcome: LinkOutcome,
}

/// Shared fetch and extraction settings for the workers
#[derive(Debug, Clone)]
pub struct Pipeline {
    client: Client,
    retry: RetryPolicy,
    extraction: ExtractionConfig,
    builder: RecordBuilder,
}

impl Pipeline {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            retry: RetryPolicy::from_config(&config.crawler),
            extraction: config.extraction.clone(),
            builder: RecordBuilder::from_config(&config.extraction),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Fetches a service page and turns it into a record
    ///
    /// Never fails: every problem becomes a [`LinkOutcome::Skipped`].
    pub async fn process_link(&self, link: QueuedLink) -> LinkReport {
        tracing::debug!("Processing link #{}: {}", link.index, link.url);

        let outcome = match fetch_with_retry(&self.client, &link.url, self.retry).await {
            Ok(html) => self.build_record(&html, &link.url),
            Err(e) => LinkOutcome::Skipped {
                reason: e.reason(),
                detail: e.to_string(),
            },
        };

        LinkReport {
            index: link.index,
            url: link.url,
            outcome,
        }
    }

    /// Runs extraction and record building over an already fetched page
    pub fn build_record(&self, html: &str, page_url: &Url) -> LinkOutcome {
        let page = extract_service_page(html, &self.extraction);

        match self
            .builder
            .build(page_url.as_str(), page.title, page.sections, page.forms)
        {
            Ok(built) => LinkOutcome::Built(built),
            Err(e) => LinkOutcome::Skipped {
                reason: e.reason(),
                detail: e.to_string(),
            },
        }
    }
}
