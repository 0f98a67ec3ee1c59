//! Heading-delimited section extraction
//!
//! A section starts at a heading whose text equals the label and runs over the
//! heading's following siblings up to (not including) the next element with the
//! same tag, or to the end of the parent.

use crate::config::{ExtractionConfig, SectionLabels};
use crate::extract::document::{following_siblings, normalized_text, Document};
use crate::record::SectionValues;
use scraper::ElementRef;

/// Service fields that are filled from a document section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionField {
    Prerequisites,
    RequiredDocuments,
    Fees,
    LegalBasis,
}

impl SectionField {
    pub const ALL: [SectionField; 4] = [
        Self::Prerequisites,
        Self::RequiredDocuments,
        Self::Fees,
        Self::LegalBasis,
    ];

    /// The configured heading text for this field
    pub fn label<'a>(&self, labels: &'a SectionLabels) -> &'a str {
        match self {
            Self::Prerequisites => labels.prerequisites.as_str(),
            Self::RequiredDocuments => labels.required_documents.as_str(),
            Self::Fees => labels.fees.as_str(),
            Self::LegalBasis => labels.legal_basis.as_str(),
        }
    }

    fn slot<'a>(&self, values: &'a mut SectionValues) -> &'a mut Option<String> {
        match self {
            Self::Prerequisites => &mut values.prerequisites,
            Self::RequiredDocuments => &mut values.required_documents,
            Self::Fees => &mut values.fees,
            Self::LegalBasis => &mut values.legal_basis,
        }
    }
}

/// Siblings belonging to the section opened by `heading`
///
/// Stops at the first sibling sharing the heading's tag name.
pub fn section_siblings(heading: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    let boundary = heading.value().name();
    following_siblings(heading).take_while(move |sibling| sibling.value().name() != boundary)
}

/// Extracts the text of the first section labelled `label`
///
/// Returns `None` if no heading matches or the section holds no text. Each
/// sibling contributes its normalized text; siblings are joined by newlines.
pub fn extract_section(doc: &Document, heading_tag: &str, label: &str) -> Option<String> {
    let heading = doc.find_heading(heading_tag, label)?;

    let parts: Vec<String> = section_siblings(heading)
        .map(normalized_text)
        .filter(|text| !text.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

/// Extracts every configured section of a service page
pub fn extract_sections(doc: &Document, config: &ExtractionConfig) -> SectionValues {
    let mut values = SectionValues::default();
    for field in SectionField::ALL {
        *field.slot(&mut values) =
            extract_section(doc, &config.section_tag, field.label(&config.labels));
    }
    values
}
