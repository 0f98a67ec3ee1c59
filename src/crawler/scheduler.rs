//! Shared work queue for the worker pool
//!
//! The pending listing links are loaded once, in listing order. Workers pop
//! links until the queue is empty or the crawl is cancelled.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

/// A service link waiting to be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedLink {
    /// Position of the link on the listing page (0-based)
    pub index: usize,

    /// Absolute URL of the service page
    pub url: Url,
}

/// Handle that stops workers from taking further links
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Scheduler hands out queued links to workers
///
/// Cloning is cheap; all clones share the same queue and cancellation flag.
#[derive(Debug, Clone)]
pub struct Scheduler {
    queue: Arc<Mutex<VecDeque<QueuedLink>>>,
    cancel: CancelHandle,
}

impl Scheduler {
    /// Creates a scheduler over the given links, keeping their order
    pub fn new(links: Vec<QueuedLink>, cancel: CancelHandle) -> Self {
        Self {
            queue: Arc::new(Mutex::new(links.into())),
            cancel,
        }
    }

    /// Pops the next link, or None when the queue is drained or cancelled
    pub fn next_link(&self) -> Option<QueuedLink> {
        if self.cancel.is_cancelled() {
            return None;
        }

        // Poisoning leaves the queue intact.
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.pop_front()
    }

    /// Number of links not yet handed out
    pub fn remaining(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
