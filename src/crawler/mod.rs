//! Crawler module for navigation and page processing
//!
//! This module contains the core crawling logic, including:
//! - The fetch engine contract and the script control channel
//! - HTTP fetching and HTML link extraction for the command-line tool
//! - Link scoring against the stop target
//! - The frontier with admission control
//! - Overall crawl control

mod controller;
mod engine;
mod fetcher;
mod frontier;
mod parser;
mod scorer;

pub use controller::{Controller, StepOutcome, StopHandle};
pub use engine::{
    CollectedRecord, FetchEngine, FetchError, FetchErrorKind, FetchedPage, PageContext,
    ScriptLog, ScriptLogLevel, ScriptResult,
};
pub use fetcher::{build_http_client, HttpFetchEngine};
pub use frontier::{Admission, Candidate, DiscardReason, Frontier, FrontierEntry, Poll};
pub use parser::{parse_html, ParsedPage};
pub use scorer::score_link;
