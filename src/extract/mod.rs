//! Extraction of service records from HTML
//!
//! This module contains the document-level logic of the harvester:
//! - Enumerating service links on the listing page
//! - Locating heading-delimited sections on a service page
//! - Reading the forms list

mod document;
mod forms;
mod listing;
mod section;

pub use document::{following_siblings, inline_text, normalized_text, Document};
pub use forms::extract_forms;
pub use listing::extract_listing_links;
pub use section::{extract_section, extract_sections, section_siblings, SectionField};

use crate::config::ExtractionConfig;
use crate::record::{FormRow, SectionValues};

/// Everything extracted from one service page, before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePage {
    /// Text of the title heading, if present and non-blank
    pub title: Option<String>,
    pub sections: SectionValues,
    pub forms: Vec<FormRow>,
}

/// Parses a service page and runs every extractor over it
///
/// # Example
///
/// ```
/// use service_harvester::config::ExtractionConfig;
/// use service_harvester::extract::extract_service_page;
///
/// let html = "<h1>Anmeldung</h1><h2>Gebühren</h2><p>10 EUR</p>";
/// let page = extract_service_page(html, &ExtractionConfig::default());
/// assert_eq!(page.title.as_deref(), Some("Anmeldung"));
/// assert_eq!(page.sections.fees.as_deref(), Some("10 EUR"));
/// ```
pub fn extract_service_page(html: &str, config: &ExtractionConfig) -> ServicePage {
    let doc = Document::parse(html);

    ServicePage {
        title: doc.first_text(&config.title_tag),
        sections: extract_sections(&doc, config),
        forms: extract_forms(&doc, &config.section_tag, &config.labels.forms),
    }
}
