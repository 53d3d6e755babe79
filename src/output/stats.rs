//! Plain-text crawl statistics
//!
//! This module renders a [`CrawlReport`] for the terminal: overview counts,
//! skipped links, errors, broken links and link analysis.

use crate::output::report::CrawlReport;
use crate::output::traits::{OutputResult, Reporter};
use std::fmt::Write;

/// Maximum number of errors listed individually
const MAX_LISTED_ERRORS: usize = 20;

/// Formats the report as plain text
pub fn format_statistics(report: &CrawlReport) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_statistics(&mut out, report);
    out
}

fn write_statistics(out: &mut String, report: &CrawlReport) -> std::fmt::Result {
    writeln!(out, "=== Crawl Statistics ===\n")?;

    writeln!(out, "Overview:")?;
    writeln!(out, "  Final state: {}", report.state)?;
    if let Some(reason) = &report.stop_reason {
        writeln!(out, "  Reason: {}", reason)?;
    }
    writeln!(out, "  Pages fetched: {}", report.pages_fetched)?;
    writeln!(out, "  Pages collected: {}", report.pages_collected)?;
    writeln!(out, "  URLs visited: {}", report.visited_count)?;
    writeln!(out, "  Links skipped: {}", report.total_skipped())?;
    writeln!(out, "  Invalid links: {}", report.invalid_links)?;
    writeln!(out, "  Errors: {}", report.error_count())?;
    if report.records_collected > 0 {
        writeln!(out, "  Script records: {}", report.records_collected)?;
    }
    writeln!(
        out,
        "  Elapsed: {:.1}s ({:.2} pages/sec)",
        report.elapsed.as_secs_f64(),
        report.pages_per_second()
    )?;
    if let Some(depth) = report.max_depth_reached() {
        writeln!(out, "  Deepest page: depth {}", depth)?;
    }
    writeln!(out)?;

    if !report.skipped.is_empty() {
        writeln!(out, "Skipped by Reason:")?;
        let mut skipped: Vec<_> = report.skipped.iter().collect();
        skipped.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (reason, count) in skipped {
            writeln!(out, "  {}: {}", reason, count)?;
        }
        writeln!(out)?;
    }

    if !report.content_types.is_empty() {
        writeln!(out, "Content Types:")?;
        let mut types: Vec<_> = report.content_types.iter().collect();
        types.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (content_type, count) in types {
            writeln!(out, "  {}: {}", content_type, count)?;
        }
        writeln!(out)?;
    }

    if !report.errors.is_empty() {
        writeln!(out, "Failed URLs:")?;
        for failure in report.errors.iter().take(MAX_LISTED_ERRORS) {
            writeln!(
                out,
                "  {} [{}] {} ({} attempts)",
                failure.url, failure.kind, failure.message, failure.attempts
            )?;
        }
        if report.errors.len() > MAX_LISTED_ERRORS {
            writeln!(
                out,
                "  ... and {} more",
                report.errors.len() - MAX_LISTED_ERRORS
            )?;
        }
        writeln!(out)?;

        let broken: Vec<_> = report
            .errors
            .iter()
            .filter_map(|failure| failure.parent.as_ref().map(|parent| (parent, &failure.url)))
            .collect();
        if !broken.is_empty() {
            writeln!(out, "Broken Links ({}):", broken.len())?;
            for (parent, url) in broken.iter().take(MAX_LISTED_ERRORS) {
                writeln!(out, "  {} -> {}", parent, url)?;
            }
            writeln!(out)?;
        }
    }

    let analysis = &report.link_analysis;
    if analysis.total_links > 0 {
        writeln!(out, "Link Analysis ({} links):", analysis.total_links)?;
        writeln!(out, "  Most linked pages:")?;
        for entry in &analysis.most_linked {
            writeln!(out, "    {} ({})", entry.url, entry.count)?;
        }
        writeln!(out, "  Most outgoing links:")?;
        for entry in &analysis.most_outgoing {
            writeln!(out, "    {} ({})", entry.url, entry.count)?;
        }
    }

    Ok(())
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(report: &CrawlReport) {
    print!("{}", format_statistics(report));
}

/// Reporter that prints the statistics to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsReporter;

impl Reporter for StatsReporter {
    fn report(&self, report: &CrawlReport) -> OutputResult<()> {
        print_statistics(report);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::FetchErrorKind;
    use crate::output::report::{LinkCount, PageFailure};
    use crate::state::CrawlState;
    use crate::url::{normalize_url, NormalizedUrl};
    use std::time::Duration;

    fn url(raw: &str) -> NormalizedUrl {
        normalize_url(raw, None).unwrap()
    }

    fn sample_report() -> CrawlReport {
        let mut report = CrawlReport::empty(CrawlState::StoppedByBudget);
        report.stop_reason = Some("page budget of 20 reached".to_string());
        report.pages_fetched = 20;
        report.pages_collected = 18;
        report.visited_count = 64;
        report.elapsed = Duration::from_secs(10);
        report.skipped.insert("off_site".to_string(), 7);
        report.skipped.insert("excluded".to_string(), 2);
        report.content_types.insert("text/html".to_string(), 17);
        report.content_types.insert("application/pdf".to_string(), 3);
        report.errors.push(PageFailure {
            url: url("https://a.com/gone"),
            kind: FetchErrorKind::Transport,
            message: "HTTP 404 Not Found".to_string(),
            attempts: 3,
            depth: 1,
            parent: Some(url("https://a.com/")),
        });
        report.link_analysis.total_links = 40;
        report.link_analysis.most_linked.push(LinkCount {
            url: url("https://a.com/docs"),
            count: 12,
        });
        report
    }

    #[test]
    fn test_overview() {
        let text = format_statistics(&sample_report());
        assert!(text.contains("Final state: stopped_by_budget"));
        assert!(text.contains("Reason: page budget of 20 reached"));
        assert!(text.contains("Pages fetched: 20"));
        assert!(text.contains("Links skipped: 9"));
        assert!(text.contains("2.00 pages/sec"));
    }

    #[test]
    fn test_skipped_sorted_by_count() {
        let text = format_statistics(&sample_report());
        let off_site = text.find("off_site: 7").unwrap();
        let excluded = text.find("excluded: 2").unwrap();
        assert!(off_site < excluded);
    }

    #[test]
    fn test_content_types_sorted_by_count() {
        let text = format_statistics(&sample_report());
        let html = text.find("text/html: 17").unwrap();
        let pdf = text.find("application/pdf: 3").unwrap();
        assert!(text.contains("Content Types:"));
        assert!(html < pdf);
    }

    #[test]
    fn test_errors_and_broken_links() {
        let text = format_statistics(&sample_report());
        assert!(text.contains("https://a.com/gone [transport] HTTP 404 Not Found (3 attempts)"));
        assert!(text.contains("Broken Links (1):"));
        assert!(text.contains("https://a.com/ -> https://a.com/gone"));
    }

    #[test]
    fn test_link_analysis() {
        let text = format_statistics(&sample_report());
        assert!(text.contains("Link Analysis (40 links):"));
        assert!(text.contains("https://a.com/docs (12)"));
    }

    #[test]
    fn test_empty_report_has_no_sections() {
        let text = format_statistics(&CrawlReport::empty(CrawlState::Completed));
        assert!(!text.contains("Failed URLs:"));
        assert!(!text.contains("Link Analysis"));
        assert!(!text.contains("Skipped by Reason"));
        assert!(!text.contains("Content Types"));
    }
}
