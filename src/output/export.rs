//! Crawl snapshot and its JSON export

use crate::output::report::{CollectedPage, PageRecord};
use crate::output::traits::OutputResult;
use crate::state::LinkGraph;
use crate::url::NormalizedUrl;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Everything a crawl learned, captured at the end of the crawl
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlSnapshot {
    /// Every URL ever offered to the frontier, sorted
    pub visited: Vec<NormalizedUrl>,
    /// Fetched pages in fetch order
    pub pages: Vec<CollectedPage>,
    pub graph: LinkGraph,
    pub records: Vec<PageRecord>,
}

/// Points for a query found in the page title
const SEARCH_TITLE_SCORE: usize = 10;
/// Points per <h1> containing the query
const SEARCH_HEADING_SCORE: usize = 5;

/// A collected page matching a search query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub url: NormalizedUrl,
    pub title: Option<String>,
    pub score: usize,
}

impl CrawlSnapshot {
    /// Pages that were collected (not skipped, content filter matched)
    pub fn collected_pages(&self) -> impl Iterator<Item = &CollectedPage> {
        self.pages.iter().filter(|page| page.collected)
    }

    /// Ranks collected pages by case-insensitive matches of `query`
    ///
    /// A title match scores 10, every <h1> containing the query scores 5 and
    /// every occurrence in the content scores 1. Pages without a match are
    /// left out; ties are ordered by URL.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<SearchHit> = self
            .collected_pages()
            .filter_map(|page| {
                let mut score = page.content.to_lowercase().matches(query.as_str()).count();
                if page
                    .title
                    .as_ref()
                    .is_some_and(|title| title.to_lowercase().contains(&query))
                {
                    score += SEARCH_TITLE_SCORE;
                }
                score += SEARCH_HEADING_SCORE
                    * page
                        .headings
                        .iter()
                        .filter(|heading| heading.to_lowercase().contains(&query))
                        .count();

                (score > 0).then(|| SearchHit {
                    url: page.url.clone(),
                    title: page.title.clone(),
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.url.cmp(&b.url)));
        hits
    }
}

/// Writes the snapshot as pretty-printed JSON
pub fn write_snapshot(snapshot: &CrawlSnapshot, output_path: &Path) -> OutputResult<()> {
    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, snapshot)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    tracing::info!("Wrote crawl snapshot to {}", output_path.display());
    Ok(())
}
