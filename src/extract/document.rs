//! Thin adapter over `scraper::Html`
//!
//! The extractors only need three things from a parsed page: find the first
//! element by tag (optionally with an exact text), walk the element siblings
//! that follow a node, and read an element's text in normalized form.

use scraper::{ElementRef, Html, Selector};

/// A parsed HTML document
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses raw markup; html5ever recovers from malformed input, so this never fails
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    /// Returns the first element with the given tag name, in document order
    pub fn first_element(&self, tag: &str) -> Option<ElementRef<'_>> {
        let selector = Selector::parse(tag).ok()?;
        self.html.select(&selector).next()
    }

    /// Returns the trimmed text of the first `tag` element, if it has any
    pub fn first_text(&self, tag: &str) -> Option<String> {
        self.first_element(tag)
            .map(inline_text)
            .filter(|text| !text.is_empty())
    }

    /// Finds the first `tag` element whose normalized text equals `label` exactly
    ///
    /// Matching is case- and accent-sensitive. Later elements with the same text
    /// are never considered.
    pub fn find_heading(&self, tag: &str, label: &str) -> Option<ElementRef<'_>> {
        let selector = Selector::parse(tag).ok()?;
        self.html
            .select(&selector)
            .find(|element| inline_text(*element) == label)
    }

    /// Selects all elements matching a CSS selector
    pub fn select<'a>(&'a self, selector: &'a Selector) -> impl Iterator<Item = ElementRef<'a>> {
        self.html.select(selector)
    }
}

/// Lazily iterates the element siblings after `element`, skipping text and comments
pub fn following_siblings(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    element.next_siblings().filter_map(ElementRef::wrap)
}

/// Element text as lines: each text node trimmed, blank ones dropped, joined by `\n`
pub fn normalized_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Element text on a single line with runs of whitespace collapsed
pub fn inline_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
