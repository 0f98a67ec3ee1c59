//! Crawl outcome counters

use crate::state::SkipReason;
use crate::storage::{RunCounts, RunStatus};
use std::collections::BTreeMap;
use std::time::Duration;

/// Counters for one crawl
///
/// Every attempted link ends in exactly one of `persisted`, `skipped` or
/// `persist_failures`. Row-level reasons (dropped forms) are counted in
/// `reasons` and `forms_dropped` only. Links already stored under a resumed run
/// are not attempted again and only appear in `already_persisted`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Run row this crawl was recorded under
    pub run_id: Option<i64>,

    /// Service links found on the listing page
    pub total_links: u64,

    /// Links stored by an earlier session of the same run
    pub already_persisted: u64,

    /// Links whose pipeline completed
    pub attempted: u64,

    /// Services stored together with their forms
    pub persisted: u64,

    /// Pages skipped before a record could be built
    pub skipped: u64,

    /// Records built but rejected by storage
    pub persist_failures: u64,

    pub forms_persisted: u64,
    pub forms_dropped: u64,

    /// Occurrences per skip reason, page- and row-level
    pub reasons: BTreeMap<SkipReason, u64>,

    /// True if the crawl was cancelled before every link was attempted
    pub interrupted: bool,

    pub elapsed: Duration,
}

impl CrawlSummary {
    pub fn new(total_links: usize) -> Self {
        Self {
            total_links: total_links as u64,
            ..Self::default()
        }
    }

    pub fn record_reason(&mut self, reason: SkipReason) {
        *self.reasons.entry(reason).or_insert(0) += 1;
    }

    /// Occurrences of one skip reason
    pub fn reason_count(&self, reason: SkipReason) -> u64 {
        self.reasons.get(&reason).copied().unwrap_or(0)
    }

    /// Status the run row is finished with
    pub fn status(&self) -> RunStatus {
        if self.interrupted {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        }
    }

    /// Counters for the run row, including links stored before a resume
    pub fn run_counts(&self) -> RunCounts {
        RunCounts {
            links_total: self.total_links,
            attempted: self.attempted + self.already_persisted,
            persisted: self.persisted + self.already_persisted,
            skipped: self.skipped,
            persist_failures: self.persist_failures,
        }
    }
}
