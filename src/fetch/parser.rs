//! Document parsing collaborator
//!
//! Parsers turn fetched bytes into a [`Document`]; the [`ParserRegistry`]
//! picks one by content type.

use crate::url::resolve_url;
use crate::CrawlError;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// Structured view of a fetched resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// The page title, if any
    pub title: Option<String>,

    /// Absolute, normalized outgoing links
    pub links: Vec<Url>,
}

/// Turns bytes into a document
pub trait Parser: Send + Sync {
    fn parse(&self, base: &Url, body: &[u8]) -> Result<Document, CrawlError>;
}

/// Maps content types to parsers
///
/// Lookups use the media type essence: `text/html; charset=utf-8` finds the
/// parser registered for `text/html`.
#[derive(Clone, Default)]
pub struct ParserRegistry {
    parsers: HashMap<String, Arc<dyn Parser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with [`HtmlParser`] registered for HTML content types
    pub fn with_html() -> Self {
        let mut registry = Self::new();
        let html: Arc<dyn Parser> = Arc::new(HtmlParser);
        registry.register("text/html", Arc::clone(&html));
        registry.register("application/xhtml+xml", html);
        registry
    }

    pub fn register(&mut self, content_type: &str, parser: Arc<dyn Parser>) {
        self.parsers.insert(essence(content_type), parser);
    }

    pub fn parser_for(&self, content_type: &str) -> Option<Arc<dyn Parser>> {
        self.parsers.get(&essence(content_type)).cloned()
    }
}

fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// HTML link and title extraction
///
/// # Link Extraction Rules
///
/// **Include:** `<a href>` and `<link rel="canonical" href>`
///
/// **Exclude:** `<a download>`, special schemes (`javascript:`, `mailto:`,
/// `tel:`, `data:`) and anything that does not resolve to http(s)
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl Parser for HtmlParser {
    fn parse(&self, base: &Url, body: &[u8]) -> Result<Document, CrawlError> {
        let html = String::from_utf8_lossy(body);
        let document = Html::parse_document(&html);

        Ok(Document {
            title: extract_title(&document),
            links: extract_links(&document, base),
        })
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_links(document: &Html, base: &Url) -> Vec<Url> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(url) = element.value().attr("href").and_then(|h| resolve(h, base)) {
                links.push(url);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(url) = element.value().attr("href").and_then(|h| resolve(h, base)) {
                links.push(url);
            }
        }
    }

    links
}

fn resolve(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| href.starts_with(scheme))
    {
        return None;
    }
    resolve_url(base, href).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/docs/").unwrap()
    }

    #[test]
    fn test_extracts_title_and_links() {
        let html = br#"<html><head><title> Docs </title>
            <link rel="canonical" href="https://example.com/docs">
            <link rel="stylesheet" href="/style.css"></head>
            <body>
              <a href="intro">Intro</a>
              <a href="https://other.org/page#x">Other</a>
              <a href="mailto:me@example.com">Mail</a>
              <a href="/file.zip" download>File</a>
            </body></html>"#;

        let document = HtmlParser.parse(&base(), html).unwrap();

        assert_eq!(document.title.as_deref(), Some("Docs"));
        let links: Vec<_> = document.links.iter().map(|u| u.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://example.com/docs/intro",
                "https://other.org/page",
                "https://example.com/docs"
            ]
        );
    }

    #[test]
    fn test_empty_title_is_none() {
        let document = HtmlParser
            .parse(&base(), b"<html><head><title>  </title></head></html>")
            .unwrap();
        assert!(document.title.is_none());
        assert!(document.links.is_empty());
    }

    #[test]
    fn test_registry_matches_essence() {
        let registry = ParserRegistry::with_html();

        assert!(registry.parser_for("text/html").is_some());
        assert!(registry.parser_for("Text/HTML; charset=utf-8").is_some());
        assert!(registry.parser_for("application/pdf").is_none());
    }
}
