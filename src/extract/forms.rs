//! Forms list extraction
//!
//! The forms section is a heading followed by an unordered list of anchors,
//! one per downloadable document.

use crate::extract::document::{inline_text, Document};
use crate::extract::section::section_siblings;
use crate::record::FormRow;
use scraper::Selector;

/// Extracts the `(title, url)` rows of the forms section
///
/// The list is the first `ul` among the heading's section siblings. Every
/// anchor with an `href` inside that list yields one row; the title is the
/// anchor's visible text (`None` when blank) and the URL is the `href` exactly
/// as written, relative or not. A missing heading or list yields no rows.
///
/// Rows are not validated here; see [`crate::record::RecordBuilder`].
pub fn extract_forms(doc: &Document, heading_tag: &str, label: &str) -> Vec<FormRow> {
    let Some(heading) = doc.find_heading(heading_tag, label) else {
        return Vec::new();
    };

    let Some(list) = section_siblings(heading).find(|sibling| sibling.value().name() == "ul") else {
        return Vec::new();
    };

    let mut rows = Vec::new();

    if let Ok(anchor_selector) = Selector::parse("a[href]") {
        for anchor in list.select(&anchor_selector) {
            if let Some(href) = anchor.value().attr("href") {
                let title = Some(inline_text(anchor)).filter(|t| !t.is_empty());
                rows.push(FormRow {
                    title,
                    url: href.to_string(),
                });
            }
        }
    }

    rows
}
