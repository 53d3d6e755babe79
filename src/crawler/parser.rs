//! HTML parser for extracting links, text and assets
//!
//! This module handles parsing HTML content to extract:
//! - Links to follow (from <a> tags and canonical links)
//! - Page title, meta description, top-level headings and visible text
//! - Referenced assets (images, scripts, stylesheets)
//!
//! Links are returned as written in the document; the controller resolves
//! them against the address the page was served from.

use scraper::{ElementRef, Html, Selector};

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Content of `<meta name="description">`
    pub meta_description: Option<String>,

    /// Text of every <h1>, in document order
    pub headings: Vec<String>,

    /// Visible body text, whitespace collapsed
    pub text: String,

    /// Link targets, absolute or relative
    pub links: Vec<String>,

    /// Referenced resources, absolute or relative
    pub assets: Vec<String>,
}

/// Parses HTML content and extracts links, text and assets
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - Fragment-only links (same-page anchors)
///
/// # Example
///
/// ```
/// use wayfinder::crawler::parse_html;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let parsed = parse_html(html);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["/page".to_string()]);
/// ```
pub fn parse_html(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        meta_description: extract_meta_description(&document),
        headings: extract_headings(&document),
        text: extract_text(&document),
        links: extract_links(&document),
        assets: extract_assets(&document),
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = selector("title")?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(element.text()))
        .filter(|s| !s.is_empty())
}

fn extract_meta_description(document: &Html) -> Option<String> {
    let meta_selector = selector("meta[name='description'][content]")?;

    document
        .select(&meta_selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(|content| collapse_whitespace([content]))
        .filter(|s| !s.is_empty())
}

fn extract_headings(document: &Html) -> Vec<String> {
    let Some(h1_selector) = selector("h1") else {
        return Vec::new();
    };

    document
        .select(&h1_selector)
        .map(|element| collapse_whitespace(element.text()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Collects the text of <body>, skipping script and style contents
fn extract_text(document: &Html) -> String {
    let Some(body_selector) = selector("body") else {
        return String::new();
    };
    let Some(body) = document.select(&body_selector).next() else {
        return String::new();
    };

    let mut fragments = Vec::new();
    collect_text(body, &mut fragments);
    collapse_whitespace(fragments)
}

fn collect_text<'a>(element: ElementRef<'a>, fragments: &mut Vec<&'a str>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            fragments.push(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            if !matches!(child.value().name(), "script" | "style" | "noscript") {
                collect_text(child, fragments);
            }
        }
    }
}

fn collapse_whitespace<'a>(fragments: impl IntoIterator<Item = &'a str>) -> String {
    fragments
        .into_iter()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts all followable links from the HTML document
fn extract_links(document: &Html) -> Vec<String> {
    let mut links = Vec::new();

    if let Some(a_selector) = selector("a[href]") {
        for element in document.select(&a_selector) {
            // Skip if it has the download attribute
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href").and_then(followable) {
                links.push(href.to_string());
            }
        }
    }

    if let Some(canonical_selector) = selector("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href").and_then(followable) {
                links.push(href.to_string());
            }
        }
    }

    links
}

/// Extracts image, script and stylesheet references
fn extract_assets(document: &Html) -> Vec<String> {
    let mut assets = Vec::new();

    for (css, attr) in [
        ("img[src]", "src"),
        ("script[src]", "src"),
        ("link[rel='stylesheet'][href]", "href"),
    ] {
        if let Some(asset_selector) = selector(css) {
            for element in document.select(&asset_selector) {
                if let Some(value) = element.value().attr(attr).map(str::trim) {
                    if !value.is_empty() && !value.starts_with("data:") {
                        assets.push(value.to_string());
                    }
                }
            }
        }
    }

    assets
}

/// Returns the trimmed href if it can lead to another page
///
/// Returns None for:
/// - empty hrefs
/// - javascript:, mailto:, tel: and data: schemes
/// - fragment-only links
fn followable(href: &str) -> Option<&str> {
    let href = href.trim();
    let lower = href.to_ascii_lowercase();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    Some(href)
}
