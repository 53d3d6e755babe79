//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of crawl results,
//! including statistics, a site map by depth, error reports and link analysis.

use crate::output::report::CrawlReport;
use crate::output::traits::{OutputResult, Reporter};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Maximum number of pages listed per depth in the site map
const SITE_MAP_LIMIT: usize = 50;

/// Generates a markdown summary and writes it to `output_path`
pub fn generate_markdown_summary(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    tracing::info!("Wrote crawl summary to {}", output_path.display());
    Ok(())
}

/// Formats a crawl report as markdown
pub fn format_markdown_summary(report: &CrawlReport) -> String {
    let mut md = String::new();

    md.push_str("# Wayfinder Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!(
        "- **Started**: {}\n",
        report.started_at.to_rfc3339()
    ));
    md.push_str(&format!(
        "- **Finished**: {}\n",
        report.finished_at.to_rfc3339()
    ));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n",
        report.elapsed.as_secs_f64()
    ));
    md.push_str(&format!("- **Final State**: {}\n", report.state));
    if let Some(reason) = &report.stop_reason {
        md.push_str(&format!("- **Reason**: {}\n", reason));
    }
    if let Some(hash) = &report.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    if !report.seeds.is_empty() {
        md.push_str("### Seeds\n\n");
        for seed in &report.seeds {
            md.push_str(&format!("- {}\n", seed));
        }
        md.push('\n');
    }
    if let Some(target) = &report.stop_target {
        md.push_str(&format!("**Stop Target**: {}\n\n", target));
    }

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Pages Fetched | {} |\n", report.pages_fetched));
    md.push_str(&format!("| Pages Collected | {} |\n", report.pages_collected));
    md.push_str(&format!("| URLs Visited | {} |\n", report.visited_count));
    md.push_str(&format!("| Links Skipped | {} |\n", report.total_skipped()));
    md.push_str(&format!("| Invalid Links | {} |\n", report.invalid_links));
    md.push_str(&format!("| Errors | {} |\n", report.error_count()));
    md.push_str(&format!(
        "| Script Records | {} |\n",
        report.records_collected
    ));
    md.push_str(&format!(
        "| Pages/sec | {:.2} |\n\n",
        report.pages_per_second()
    ));

    // Skipped breakdown
    if !report.skipped.is_empty() {
        md.push_str("## Skipped Links\n\n");
        md.push_str("| Reason | Count |\n");
        md.push_str("|--------|-------|\n");
        for (reason, count) in &report.skipped {
            md.push_str(&format!("| {} | {} |\n", reason, count));
        }
        md.push('\n');
    }

    // Content types
    if !report.content_types.is_empty() {
        md.push_str("## Content Types\n\n");
        md.push_str("| Content Type | Pages |\n");
        md.push_str("|--------------|-------|\n");
        for (content_type, count) in &report.content_types {
            md.push_str(&format!("| {} | {} |\n", content_type, count));
        }
        md.push('\n');
    }

    // Site map
    if !report.site_map.is_empty() {
        md.push_str("## Site Map\n\n");
        for (depth, pages) in &report.site_map {
            md.push_str(&format!("### Depth {} ({} pages)\n\n", depth, pages.len()));
            for page in pages.iter().take(SITE_MAP_LIMIT) {
                md.push_str(&format!("- {}\n", page));
            }
            if pages.len() > SITE_MAP_LIMIT {
                md.push_str(&format!(
                    "\n... and {} more\n",
                    pages.len() - SITE_MAP_LIMIT
                ));
            }
            md.push('\n');
        }
    }

    // Errors
    if !report.errors.is_empty() {
        md.push_str("## Errors\n\n");
        md.push_str("| URL | Kind | Attempts | Linked From | Message |\n");
        md.push_str("|-----|------|----------|-------------|---------|\n");
        for failure in &report.errors {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                failure.url,
                failure.kind,
                failure.attempts,
                failure
                    .parent
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ToString::to_string),
                failure.message.replace('|', "\\|")
            ));
        }
        md.push('\n');
    }

    // Link analysis
    let analysis = &report.link_analysis;
    if analysis.total_links > 0 {
        md.push_str("## Link Analysis\n\n");
        md.push_str(&format!("Total links found: {}\n\n", analysis.total_links));

        md.push_str("### Most Linked Pages\n\n");
        md.push_str("| URL | Inbound Links |\n");
        md.push_str("|-----|---------------|\n");
        for entry in &analysis.most_linked {
            md.push_str(&format!("| {} | {} |\n", entry.url, entry.count));
        }
        md.push('\n');

        md.push_str("### Most Outgoing Links\n\n");
        md.push_str("| URL | Outbound Links |\n");
        md.push_str("|-----|----------------|\n");
        for entry in &analysis.most_outgoing {
            md.push_str(&format!("| {} | {} |\n", entry.url, entry.count));
        }
        md.push('\n');
    }

    md
}

/// Reporter that writes the markdown summary to a file
#[derive(Debug, Clone)]
pub struct MarkdownReporter {
    path: PathBuf,
}

impl MarkdownReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Reporter for MarkdownReporter {
    fn report(&self, report: &CrawlReport) -> OutputResult<()> {
        generate_markdown_summary(report, &self.path)
    }
}
