//! Terminal crawl report and per-page records

use crate::crawler::{CollectedRecord, FetchErrorKind};
use crate::state::{CrawlState, LinkGraph};
use crate::url::NormalizedUrl;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Number of entries kept in each link analysis ranking
pub const LINK_ANALYSIS_LIMIT: usize = 10;

/// A URL whose fetch failed after every retry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageFailure {
    pub url: NormalizedUrl,
    pub kind: FetchErrorKind,
    pub message: String,
    /// Total fetch attempts, including the first one
    pub attempts: u32,
    pub depth: u32,
    /// Page that linked to the failed URL
    pub parent: Option<NormalizedUrl>,
}

/// A successfully fetched page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectedPage {
    pub url: NormalizedUrl,
    pub depth: u32,
    pub parent: Option<NormalizedUrl>,
    pub content_type: Option<String>,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub headings: Vec<String>,
    /// Extracted text content
    pub content: String,
    pub content_length: usize,
    pub link_count: usize,
    pub asset_count: usize,
    /// False when a script skipped the page or the content filter did not match
    pub collected: bool,
    pub skip_reason: Option<String>,
}

/// A script record together with the page it was collected on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageRecord {
    pub page: NormalizedUrl,
    #[serde(flatten)]
    pub record: CollectedRecord,
}

/// A URL with a link count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkCount {
    pub url: NormalizedUrl,
    pub count: usize,
}

/// Summary of the discovered link structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkAnalysis {
    pub total_links: usize,
    /// Most linked-to URLs, highest count first
    pub most_linked: Vec<LinkCount>,
    /// Fetched pages with the most outgoing links, highest count first
    pub most_outgoing: Vec<LinkCount>,
}

impl LinkAnalysis {
    pub fn from_graph(graph: &LinkGraph, limit: usize) -> Self {
        Self {
            total_links: graph.total_links(),
            most_linked: graph
                .most_linked(limit)
                .into_iter()
                .map(|(url, count)| LinkCount {
                    url: url.clone(),
                    count: count as usize,
                })
                .collect(),
            most_outgoing: graph
                .most_outgoing(limit)
                .into_iter()
                .map(|(url, count)| LinkCount {
                    url: url.clone(),
                    count,
                })
                .collect(),
        }
    }
}

/// Terminal report of one crawl, emitted exactly once
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub state: CrawlState,
    /// Why the crawl stopped, for stop and failure states
    pub stop_reason: Option<String>,
    pub seeds: Vec<NormalizedUrl>,
    pub stop_target: Option<NormalizedUrl>,

    pub pages_fetched: u32,
    pub pages_collected: usize,
    pub visited_count: usize,
    pub records_collected: usize,
    /// Links that could not be normalized
    pub invalid_links: u64,
    /// Discarded candidates by reason (duplicates excluded)
    pub skipped: BTreeMap<String, u64>,
    pub errors: Vec<PageFailure>,
    /// Fetched pages by media type (`unknown` when the engine reports none)
    pub content_types: BTreeMap<String, u64>,

    /// Fetched pages by depth
    pub site_map: BTreeMap<u32, Vec<NormalizedUrl>>,
    pub link_analysis: LinkAnalysis,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub config_hash: Option<String>,
}

impl CrawlReport {
    /// A report with no activity, in the given state
    pub fn empty(state: CrawlState) -> Self {
        let now = Utc::now();
        Self {
            state,
            stop_reason: None,
            seeds: Vec::new(),
            stop_target: None,
            pages_fetched: 0,
            pages_collected: 0,
            visited_count: 0,
            records_collected: 0,
            invalid_links: 0,
            skipped: BTreeMap::new(),
            errors: Vec::new(),
            content_types: BTreeMap::new(),
            site_map: BTreeMap::new(),
            link_analysis: LinkAnalysis::default(),
            started_at: now,
            finished_at: now,
            elapsed: Duration::ZERO,
            config_hash: None,
        }
    }

    pub fn total_skipped(&self) -> u64 {
        self.skipped.values().sum()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Fetch rate over the whole crawl
    pub fn pages_per_second(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds <= 0.0 {
            return 0.0;
        }
        f64::from(self.pages_fetched) / seconds
    }

    /// Deepest depth at which a page was fetched
    pub fn max_depth_reached(&self) -> Option<u32> {
        self.site_map.keys().next_back().copied()
    }

    /// Returns false only for a failed crawl
    pub fn is_success(&self) -> bool {
        self.state != CrawlState::Failed
    }
}
