//! Fetch engine contract and the injected-script control channel
//!
//! The controller never talks to the network itself. It hands a
//! [`NormalizedUrl`] and a read-only [`PageContext`] to a [`FetchEngine`] and
//! receives the page content, its raw outbound links and, for engines that run
//! page scripts, a [`ScriptResult`] batch read at the end of page processing.

use crate::url::NormalizedUrl;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// The page did not answer in time
    Timeout,
    /// Connection, TLS, HTTP status or body errors
    Transport,
    /// The engine could not render or extract the page
    Rendering,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timeout => "timeout",
            Self::Transport => "transport",
            Self::Rendering => "rendering",
        };
        f.write_str(name)
    }
}

/// Error returned by a [`FetchEngine`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} error: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Timeout, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Transport, message)
    }

    pub fn rendering(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Rendering, message)
    }
}

/// Read-only snapshot handed to the engine (and to any script it injects)
/// before a page is processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageContext {
    pub url: NormalizedUrl,
    pub pages_fetched: u32,
    pub depth: u32,
    pub visited_count: usize,
}

/// Severity of a log entry produced by an injected script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptLogLevel {
    Info,
    Warn,
    Error,
}

/// One log entry produced by an injected script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptLog {
    pub level: ScriptLogLevel,
    pub message: String,
}

/// An arbitrary record collected by an injected script
///
/// Records must carry a non-empty classification `tag`; untagged records are
/// rejected by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedRecord {
    pub tag: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Result batch posted by an injected script after page processing
///
/// A `stop` request is a message, not an unwind: the controller reads it at
/// the end of the page and halts the crawl at that safe point. `skip` only
/// keeps the page from being recorded as collected; the fetch already
/// happened and its links are still followed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptResult {
    pub logs: Vec<ScriptLog>,
    pub records: Vec<CollectedRecord>,
    pub stop: Option<String>,
    pub skip: Option<String>,
}

/// A successfully fetched page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedPage {
    /// Address the content was finally served from, if it differs from the
    /// requested one (redirects); relative links resolve against it
    pub final_url: Option<String>,
    /// Media type of the response without parameters, e.g. `text/html`
    pub content_type: Option<String>,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    /// Top-level headings (<h1>) in document order
    pub headings: Vec<String>,
    /// Extracted text content
    pub content: String,
    /// Outbound links as found on the page, absolute or relative
    pub links: Vec<String>,
    /// Referenced resources (images, scripts); opaque to the controller
    pub assets: Vec<String>,
    /// Injected-script results (rendering engines only)
    pub script: Option<ScriptResult>,
}

impl FetchedPage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links = links.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_final_url(mut self, final_url: impl Into<String>) -> Self {
        self.final_url = Some(final_url.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_headings<I, S>(mut self, headings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headings = headings.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_script(mut self, script: ScriptResult) -> Self {
        self.script = Some(script);
        self
    }
}

/// Fetches a page and extracts its outbound links
///
/// Implementations may be a lightweight HTTP client or a full rendering
/// engine; the controller only relies on this contract. `fetch` must
/// eventually return or fail, however the engine schedules its work.
#[async_trait]
pub trait FetchEngine: Send + Sync {
    async fn fetch(&self, url: &NormalizedUrl, context: &PageContext)
        -> Result<FetchedPage, FetchError>;
}
