//! Listing page link enumeration
//!
//! The seed page is a listing whose service links live inside a known
//! container; the configured CSS selector picks them out.

use crate::extract::document::Document;
use scraper::Selector;
use url::Url;

/// Extracts the service page links matched by `selector`
///
/// # Link Rules
///
/// - Only elements with an `href` attribute count
/// - Relative links are resolved against `base_url`
/// - `javascript:`, `mailto:`, `tel:`, `data:` and fragment-only links are skipped
/// - Only HTTP(S) targets are kept
/// - Repeated links are kept, once per matching anchor, in document order
///
/// # Example
///
/// ```
/// use scraper::Selector;
/// use service_harvester::extract::extract_listing_links;
/// use url::Url;
///
/// let html = r#"<div class="span7"><a href="/dienstleistung/1/">Anmeldung</a></div>"#;
/// let base = Url::parse("https://service.example.org/dienstleistungen/").unwrap();
/// let selector = Selector::parse("div.span7 a").unwrap();
/// let links = extract_listing_links(html, &selector, &base);
/// assert_eq!(links[0].as_str(), "https://service.example.org/dienstleistung/1/");
/// ```
pub fn extract_listing_links(html: &str, selector: &Selector, base_url: &Url) -> Vec<Url> {
    let document = Document::parse(html);
    let mut links = Vec::new();

    for element in document.select(selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        match resolve_link(href, base_url) {
            Some(url) => links.push(url),
            None => tracing::debug!("Skipping listing link '{}'", href),
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url)
    } else {
        None
    }
}
