//! Outcome tracking for crawled pages
//!
//! This module defines the reason codes attached to every skipped page and
//! every dropped form row.

mod skip_reason;

pub use skip_reason::SkipReason;
