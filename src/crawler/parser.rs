//! HTML extraction for fetched pages
//!
//! This module handles parsing HTML content to extract:
//! - Title and meta description
//! - Text of paragraph, heading and anchor elements
//! - Absolute anchor links, and the cross-domain subset fed to ranking

use crate::url::{domain_of, normalize_url_str};
use crate::DriftnetError;
use scraper::{Html, Selector};
use std::collections::HashSet;

/// Elements whose text content is indexed
const TEXT_SELECTOR: &str = "p, h1, h2, h3, h4, h5, h6, a";

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// Text of the first `<title>`, empty if absent
    pub title: String,

    /// `content` of `<meta name="description">`, empty if absent
    pub description: String,

    /// Text of every text element in document order, space separated
    pub text: String,

    /// Every absolute http(s) anchor href, in document order
    pub links: Vec<String>,
}

impl ParsedPage {
    /// Links to other domains, at most one per target domain
    ///
    /// The first link seen for a domain is kept and normalized. Links back to
    /// `source_domain` are excluded, but still mark that domain as seen.
    pub fn outgoing(&self, source_domain: &str) -> Vec<String> {
        let mut seen_domains: HashSet<String> = HashSet::new();
        let mut outgoing = Vec::new();

        for link in &self.links {
            let Some(domain) = domain_of(link) else {
                continue;
            };
            if !seen_domains.insert(domain.clone()) || domain == source_domain {
                continue;
            }
            if let Ok(normalized) = normalize_url_str(link) {
                outgoing.push(normalized);
            }
        }

        outgoing
    }
}

/// Parses HTML content and extracts text, metadata and absolute links
///
/// Relative hrefs are not followed; only values starting with `http` are kept.
///
/// # Arguments
///
/// * `html` - Raw page body
/// * `page_url` - URL the body was fetched from, used in error messages
///
/// # Example
///
/// ```
/// use driftnet::crawler::parse_html;
///
/// let html = r#"<html><head><title>Test</title></head>
///     <body><p>Hello</p><a href="https://b.com/">B</a><a href="/rel">R</a></body></html>"#;
/// let parsed = parse_html(html, "https://a.com/").unwrap();
/// assert_eq!(parsed.title, "Test");
/// assert_eq!(parsed.links, vec!["https://b.com/"]);
/// ```
pub fn parse_html(html: &str, page_url: &str) -> Result<ParsedPage, DriftnetError> {
    let document = Html::parse_document(html);

    Ok(ParsedPage {
        title: extract_title(&document, page_url)?,
        description: extract_description(&document, page_url)?,
        text: extract_text(&document, page_url)?,
        links: extract_links(&document, page_url)?,
    })
}

fn selector(css: &str, page_url: &str) -> Result<Selector, DriftnetError> {
    Selector::parse(css).map_err(|e| DriftnetError::HtmlParse {
        url: page_url.to_string(),
        message: format!("selector '{}': {:?}", css, e),
    })
}

fn extract_title(document: &Html, page_url: &str) -> Result<String, DriftnetError> {
    let title_selector = selector("title", page_url)?;

    Ok(document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default())
}

fn extract_description(document: &Html, page_url: &str) -> Result<String, DriftnetError> {
    let meta_selector = selector("meta[name='description']", page_url)?;

    Ok(document
        .select(&meta_selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .unwrap_or_default())
}

fn extract_text(document: &Html, page_url: &str) -> Result<String, DriftnetError> {
    let text_selector = selector(TEXT_SELECTOR, page_url)?;

    let parts: Vec<String> = document
        .select(&text_selector)
        .map(|element| element.text().collect::<String>())
        .filter(|text| !text.trim().is_empty())
        .collect();

    Ok(parts.join(" "))
}

fn extract_links(document: &Html, page_url: &str) -> Result<Vec<String>, DriftnetError> {
    let a_selector = selector("a[href]", page_url)?;

    Ok(document
        .select(&a_selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| href.starts_with("http"))
        .map(str::to_string)
        .collect())
}
