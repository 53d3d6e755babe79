//! Reporter trait and output errors
//!
//! A [`Reporter`] receives the terminal [`CrawlReport`] of a crawl exactly
//! once. Implementations must be thread-safe: the report is emitted by
//! whichever worker finishes last.

use crate::output::report::CrawlReport;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Receives the terminal report of a crawl
pub trait Reporter: Send + Sync {
    /// Handles the report
    ///
    /// Errors are logged by the controller and never change the crawl
    /// outcome.
    fn report(&self, report: &CrawlReport) -> OutputResult<()>;
}

/// Forwards the report to every reporter in order
///
/// Every reporter is called even if an earlier one fails; the first error
/// is returned.
impl Reporter for Vec<Box<dyn Reporter>> {
    fn report(&self, report: &CrawlReport) -> OutputResult<()> {
        let mut first_error = None;
        for reporter in self {
            if let Err(e) = reporter.report(report) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
