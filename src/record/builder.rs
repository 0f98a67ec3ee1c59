//! Record assembly and validation
//!
//! Turns raw extractor output into a [`Service`] with its valid [`Form`]s.
//!
//! # Field Policy
//!
//! | Field | Section absent or empty |
//! |-------|-------------------------|
//! | prerequisites, required_documents, legal_basis | empty string |
//! | fees | configured fallback text |
//!
//! The fees fallback is the only substitution.

use crate::config::ExtractionConfig;
use crate::record::{Form, Service};
use crate::state::SkipReason;
use thiserror::Error;

/// Section texts as extracted; `None` means the section was absent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionValues {
    pub prerequisites: Option<String>,
    pub required_documents: Option<String>,
    pub fees: Option<String>,
    pub legal_basis: Option<String>,
}

/// A raw `(title, url)` row from the forms list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormRow {
    pub title: Option<String>,
    pub url: String,
}

/// A form row rejected during validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedForm {
    pub row: FormRow,
    pub reason: SkipReason,
}

/// A valid service together with the rows that were dropped from it
#[derive(Debug, Clone)]
pub struct BuiltService {
    pub service: Service,
    pub dropped_forms: Vec<DroppedForm>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("No title found on {source_url}")]
    MissingTitle { source_url: String },
}

impl BuildError {
    pub fn reason(&self) -> SkipReason {
        match self {
            Self::MissingTitle { .. } => SkipReason::MissingTitle,
        }
    }
}

/// Applies field fallbacks and form row validation
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    fees_fallback: String,
    max_form_url_length: usize,
}

impl RecordBuilder {
    pub fn new(fees_fallback: impl Into<String>, max_form_url_length: usize) -> Self {
        Self {
            fees_fallback: fees_fallback.into(),
            max_form_url_length,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.fees_fallback.clone(), config.max_form_url_length)
    }

    /// Builds a service record
    ///
    /// Returns `BuildError::MissingTitle` when `title` is absent or blank; none of
    /// the page's forms survive in that case. Invalid form rows are dropped one by
    /// one and reported in [`BuiltService::dropped_forms`], each logged with the
    /// form URL and the service's source URL.
    pub fn build(
        &self,
        source_url: &str,
        title: Option<String>,
        sections: SectionValues,
        forms: Vec<FormRow>,
    ) -> Result<BuiltService, BuildError> {
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BuildError::MissingTitle {
                source_url: source_url.to_string(),
            })?;

        let fees = sections
            .fees
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| self.fees_fallback.clone());

        let mut valid_forms = Vec::with_capacity(forms.len());
        let mut dropped_forms = Vec::new();

        for row in forms {
            match self.validate_form(&row) {
                Ok(form) => valid_forms.push(form),
                Err(reason) => {
                    tracing::warn!(
                        reason = reason.code(),
                        form_url = %row.url,
                        service_url = %source_url,
                        "Dropping form row"
                    );
                    dropped_forms.push(DroppedForm { row, reason });
                }
            }
        }

        let service = Service {
            id: None,
            title,
            prerequisites: sections.prerequisites.unwrap_or_default(),
            required_documents: sections.required_documents.unwrap_or_default(),
            fees,
            legal_basis: sections.legal_basis.unwrap_or_default(),
            is_digital_service: None,
            responsible_office: None,
            source_url: source_url.to_string(),
            forms: valid_forms,
        };

        Ok(BuiltService {
            service,
            dropped_forms,
        })
    }

    fn validate_form(&self, row: &FormRow) -> Result<Form, SkipReason> {
        let title = row
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(SkipReason::FormTitleMissing)?;

        if row.url.chars().count() > self.max_form_url_length {
            return Err(SkipReason::UrlTooLong);
        }

        Ok(Form::new(title, row.url.clone()))
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}
