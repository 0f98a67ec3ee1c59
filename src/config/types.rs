use serde::Deserialize;

/// Fees text stored when a page has no usable "Gebühren" section
pub const DEFAULT_FEES_FALLBACK: &str = "Keine Gebühren gefunden";

/// Maximum stored length of a form URL, in characters
pub const DEFAULT_MAX_FORM_URL_LENGTH: usize = 2048;

/// Main configuration structure for Service-Harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Listing page whose outbound links are crawled
    #[serde(rename = "seed-url")]
    pub seed_url: String,

    /// CSS selector matching the service links on the listing page
    #[serde(rename = "link-selector", default = "default_link_selector")]
    pub link_selector: String,

    /// Number of concurrent fetch+extract pipelines
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Retries for timeouts and transport errors (0 disables retrying)
    #[serde(rename = "max-retries", default)]
    pub max_retries: u32,

    /// Initial retry backoff (milliseconds), doubled per attempt
    #[serde(rename = "retry-backoff-ms", default = "default_backoff")]
    pub retry_backoff_ms: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Document structure the extractors rely on
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Tag holding the service title
    #[serde(rename = "title-tag", default = "default_title_tag")]
    pub title_tag: String,

    /// Tag of the section headings (also the section boundary)
    #[serde(rename = "section-tag", default = "default_section_tag")]
    pub section_tag: String,

    /// Text stored in `fees` when the fees section is absent or empty
    #[serde(rename = "fees-fallback", default = "default_fees_fallback")]
    pub fees_fallback: String,

    /// Forms with a longer URL are dropped
    #[serde(rename = "max-form-url-length", default = "default_max_url_length")]
    pub max_form_url_length: usize,

    #[serde(default)]
    pub labels: SectionLabels,
}

/// Exact heading texts of the sections, in the source document's language
#[derive(Debug, Clone, Deserialize)]
pub struct SectionLabels {
    #[serde(default = "default_prerequisites_label")]
    pub prerequisites: String,

    #[serde(rename = "required-documents", default = "default_required_documents_label")]
    pub required_documents: String,

    #[serde(default = "default_fees_label")]
    pub fees: String,

    #[serde(rename = "legal-basis", default = "default_legal_basis_label")]
    pub legal_basis: String,

    #[serde(default = "default_forms_label")]
    pub forms: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path of the markdown catalogue written by `--export-catalogue`
    #[serde(rename = "catalogue-path", default = "default_catalogue_path")]
    pub catalogue_path: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            title_tag: default_title_tag(),
            section_tag: default_section_tag(),
            fees_fallback: default_fees_fallback(),
            max_form_url_length: default_max_url_length(),
            labels: SectionLabels::default(),
        }
    }
}

impl Default for SectionLabels {
    fn default() -> Self {
        Self {
            prerequisites: default_prerequisites_label(),
            required_documents: default_required_documents_label(),
            fees: default_fees_label(),
            legal_basis: default_legal_basis_label(),
            forms: default_forms_label(),
        }
    }
}

impl SectionLabels {
    /// All labels in declaration order, forms last
    pub fn all(&self) -> [&str; 5] {
        [
            self.prerequisites.as_str(),
            self.required_documents.as_str(),
            self.fees.as_str(),
            self.legal_basis.as_str(),
            self.forms.as_str(),
        ]
    }
}

fn default_link_selector() -> String {
    "div.span7 a".to_string()
}

fn default_workers() -> u32 {
    1
}

fn default_timeout() -> u64 {
    10
}

fn default_backoff() -> u64 {
    2000
}

fn default_title_tag() -> String {
    "h1".to_string()
}

fn default_section_tag() -> String {
    "h2".to_string()
}

fn default_fees_fallback() -> String {
    DEFAULT_FEES_FALLBACK.to_string()
}

fn default_max_url_length() -> usize {
    DEFAULT_MAX_FORM_URL_LENGTH
}

fn default_prerequisites_label() -> String {
    "Voraussetzungen".to_string()
}

fn default_required_documents_label() -> String {
    "Erforderliche Unterlagen".to_string()
}

fn default_fees_label() -> String {
    "Gebühren".to_string()
}

fn default_legal_basis_label() -> String {
    "Rechtsgrundlagen".to_string()
}

fn default_forms_label() -> String {
    "Formulare".to_string()
}

fn default_catalogue_path() -> String {
    "./services.md".to_string()
}
