use crate::config::types::{
    Config, CrawlerConfig, ExtractionConfig, OutputConfig, UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Upper bound on concurrent link pipelines
const MAX_WORKERS: u32 = 32;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_extraction_config(&config.extraction)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let seed = Url::parse(&config.seed_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", config.seed_url, e))
    })?;

    if seed.scheme() != "http" && seed.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use HTTP or HTTPS",
            config.seed_url
        )));
    }

    validate_selector(&config.link_selector)?;

    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates the document structure settings
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    validate_tag(&config.title_tag)?;
    validate_tag(&config.section_tag)?;

    if config.max_form_url_length < 1 {
        return Err(ConfigError::Validation(
            "max_form_url_length must be >= 1".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for label in config.labels.all() {
        if label.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Section labels cannot be empty".to_string(),
            ));
        }
        if !seen.insert(label) {
            return Err(ConfigError::Validation(format!(
                "Section label '{}' is used for more than one section",
                label
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.catalogue_path.is_empty() {
        return Err(ConfigError::Validation(
            "catalogue_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

/// Tags are used both as selectors and for name comparison, so only bare names pass
fn validate_tag(tag: &str) -> Result<(), ConfigError> {
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::Validation(format!(
            "'{}' is not a plain tag name",
            tag
        )));
    }
    validate_selector(tag)
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SectionLabels, UserAgentConfig};

    fn valid_crawler() -> CrawlerConfig {
        CrawlerConfig {
            seed_url: "https://service.example.org/dienstleistungen/".to_string(),
            link_selector: "div.span7 a".to_string(),
            workers: 1,
            request_timeout_secs: 10,
            max_retries: 0,
            retry_backoff_ms: 2000,
        }
    }

    fn valid_user_agent() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "Harvester".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    #[test]
    fn test_valid_crawler_config() {
        assert!(validate_crawler_config(&valid_crawler()).is_ok());
    }

    #[test]
    fn test_seed_url_must_be_http() {
        let mut config = valid_crawler();
        config.seed_url = "ftp://service.example.org/".to_string();
        assert!(matches!(
            validate_crawler_config(&config),
            Err(ConfigError::Validation(_))
        ));

        config.seed_url = "not a url".to_string();
        assert!(matches!(
            validate_crawler_config(&config),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_invalid_link_selector() {
        let mut config = valid_crawler();
        config.link_selector = "div[[".to_string();
        assert!(matches!(
            validate_crawler_config(&config),
            Err(ConfigError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_worker_bounds() {
        let mut config = valid_crawler();
        config.workers = 0;
        assert!(validate_crawler_config(&config).is_err());
        config.workers = MAX_WORKERS + 1;
        assert!(validate_crawler_config(&config).is_err());
        config.workers = MAX_WORKERS;
        assert!(validate_crawler_config(&config).is_ok());
    }

    #[test]
    fn test_crawler_name_characters() {
        let mut config = valid_user_agent();
        assert!(validate_user_agent_config(&config).is_ok());
        config.crawler_name = "Service Harvester".to_string();
        assert!(validate_user_agent_config(&config).is_err());
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let config = ExtractionConfig {
            labels: SectionLabels {
                fees: "Voraussetzungen".to_string(),
                ..SectionLabels::default()
            },
            ..ExtractionConfig::default()
        };
        assert!(matches!(
            validate_extraction_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_tag_must_be_plain_name() {
        assert!(validate_tag("h2").is_ok());
        assert!(validate_tag("h2.section").is_err());
        assert!(validate_tag("").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
    }
}
