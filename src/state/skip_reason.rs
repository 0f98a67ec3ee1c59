//! Reason codes for skipped pages and dropped form rows
//!
//! Every recoverable failure in the pipeline is logged under one of these codes
//! so a crawl can be diagnosed from its log without re-crawling.

use std::fmt;
use tracing::Level;

/// Why a page or a form row did not make it into storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    // ===== Page-level =====
    /// The page fetch timed out
    FetchTimeout,

    /// Transport failure or non-success HTTP status
    FetchError,

    /// The page has no resolvable title heading
    MissingTitle,

    /// The record was built but its transaction failed
    PersistError,

    // ===== Row-level =====
    /// A form anchor without visible text
    FormTitleMissing,

    /// A form URL over the configured length bound
    UrlTooLong,
}

impl SkipReason {
    /// All reasons, page-level first
    pub const ALL: [SkipReason; 6] = [
        Self::FetchTimeout,
        Self::FetchError,
        Self::MissingTitle,
        Self::PersistError,
        Self::FormTitleMissing,
        Self::UrlTooLong,
    ];

    /// Returns true if only a single form row was dropped
    pub fn is_row_level(&self) -> bool {
        matches!(self, Self::FormTitleMissing | Self::UrlTooLong)
    }

    /// The reason code used in log lines
    pub fn code(&self) -> &'static str {
        match self {
            Self::FetchTimeout => "fetch-timeout",
            Self::FetchError => "fetch-error",
            Self::MissingTitle => "missing-title",
            Self::PersistError => "persist-error",
            Self::FormTitleMissing => "form-title-missing",
            Self::UrlTooLong => "url-too-long",
        }
    }

    /// Level the skip is logged at
    ///
    /// A page without a title or a record storage rejected is an error; the
    /// other reasons are warnings.
    pub fn log_level(&self) -> Level {
        match self {
            Self::MissingTitle | Self::PersistError => Level::ERROR,
            Self::FetchTimeout | Self::FetchError | Self::FormTitleMissing | Self::UrlTooLong => {
                Level::WARN
            }
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
