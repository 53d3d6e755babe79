//! Output module for crawl reports and exports
//!
//! This module handles:
//! - The terminal [`CrawlReport`] and the [`Reporter`] collaborator
//! - Plain-text statistics and markdown summaries
//! - Exporting the crawl snapshot as JSON

mod export;
mod markdown;
mod report;
pub mod stats;
mod traits;

pub use export::{write_snapshot, CrawlSnapshot, SearchHit};
pub use markdown::{format_markdown_summary, generate_markdown_summary, MarkdownReporter};
pub use report::{
    CollectedPage, CrawlReport, LinkAnalysis, LinkCount, PageFailure, PageRecord,
    LINK_ANALYSIS_LIMIT,
};
pub use stats::{format_statistics, print_statistics, StatsReporter};
pub use traits::{OutputError, OutputResult, Reporter};
