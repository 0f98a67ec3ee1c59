//! Service and form records
//!
//! A [`Service`] owns its [`Form`]s: forms are built, validated and persisted
//! together with their parent and never exist on their own.

mod builder;

pub use builder::{BuildError, BuiltService, DroppedForm, FormRow, RecordBuilder, SectionValues};

/// A public-service description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Database ID (None until persisted)
    pub id: Option<i64>,

    pub title: String,
    pub prerequisites: String,
    pub required_documents: String,
    pub fees: String,
    pub legal_basis: String,

    /// Set by the administration layer, never by extraction
    pub is_digital_service: Option<bool>,

    /// Set by the administration layer, never by extraction
    pub responsible_office: Option<String>,

    /// Page the record was extracted from (not a uniqueness key)
    pub source_url: String,

    pub forms: Vec<Form>,
}

/// A downloadable document linked from a service page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    /// Database ID (None until persisted)
    pub id: Option<i64>,
    pub title: String,
    pub url: String,
}

impl Form {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            url: url.into(),
        }
    }
}
