//! HTTP fetch engine
//!
//! This module handles all HTTP requests for the command-line crawler:
//! - Building HTTP clients with the configured user agent and timeout
//! - GET requests with redirect following
//! - Error classification into [`FetchErrorKind`]s
//! - Handing HTML bodies to the parser
//!
//! It does not run page scripts, so [`FetchedPage::script`] is always None.

use crate::config::CrawlSettings;
use crate::crawler::engine::{FetchEngine, FetchError, FetchedPage, PageContext};
use crate::crawler::parser::parse_html;
use crate::url::NormalizedUrl;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;

/// Maximum redirect hops followed for one fetch
const MAX_REDIRECTS: usize = 10;

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use wayfinder::crawler::build_http_client;
///
/// let client = build_http_client("wayfinder/0.1", Duration::from_secs(15)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Lightweight, non-rendering [`FetchEngine`] built on reqwest and scraper
///
/// # Error Classification
///
/// | Condition | Kind |
/// |-----------|------|
/// | Request or body timeout | Timeout |
/// | Connection, TLS, redirect errors | Transport |
/// | Non-2xx status | Transport |
/// | Body is not valid text | Rendering |
///
/// Non-HTML responses are fetched successfully but yield no text or links.
#[derive(Debug, Clone)]
pub struct HttpFetchEngine {
    client: Client,
}

impl HttpFetchEngine {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds an engine from the validated crawl settings
    pub fn from_settings(settings: &CrawlSettings) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(
            &settings.user_agent,
            settings.fetch_timeout,
        )?))
    }
}

#[async_trait]
impl FetchEngine for HttpFetchEngine {
    async fn fetch(
        &self,
        url: &NormalizedUrl,
        context: &PageContext,
    ) -> Result<FetchedPage, FetchError> {
        tracing::debug!("GET {} (depth {})", url, context.depth);

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Err(FetchError::transport(status_message(status)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(media_type)
            .unwrap_or_default();

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(e.to_string())
            } else if e.is_decode() {
                FetchError::rendering(e.to_string())
            } else {
                FetchError::transport(e.to_string())
            }
        })?;

        if !is_html(&content_type) {
            tracing::debug!("Not following links of {} ({})", final_url, content_type);
            return Ok(FetchedPage {
                final_url: Some(final_url),
                content_type: Some(content_type),
                ..FetchedPage::default()
            });
        }

        let parsed = parse_html(&body);
        if let Some(title) = &parsed.title {
            tracing::trace!("{} has title {:?}", final_url, title);
        }

        Ok(FetchedPage {
            final_url: Some(final_url),
            content_type: Some(if content_type.is_empty() {
                "text/html".to_string()
            } else {
                content_type
            }),
            title: parsed.title,
            meta_description: parsed.meta_description,
            headings: parsed.headings,
            content: parsed.text,
            links: parsed.links,
            assets: parsed.assets,
            script: None,
        })
    }
}

/// Lowercased media type of a Content-Type header, parameters dropped
fn media_type(header: &str) -> String {
    header
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Treats a missing Content-Type as HTML
fn is_html(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type.contains("text/html")
        || content_type.contains("application/xhtml+xml")
}

fn status_message(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("HTTP {} {}", status.as_u16(), reason),
        None => format!("HTTP {}", status.as_u16()),
    }
}

fn classify_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::timeout(error.to_string())
    } else if error.is_connect() {
        FetchError::transport(format!("connection failed: {}", error))
    } else if error.is_redirect() {
        FetchError::transport(format!("redirect error: {}", error))
    } else {
        FetchError::transport(error.to_string())
    }
}
