use std::sync::atomic::{AtomicU32, Ordering};

/// Depth and page limits of a crawl, plus the shared page counter
///
/// `pages_fetched` only ever grows and is shared by every worker of one
/// controller; a limit of 0 means unlimited.
#[derive(Debug)]
pub struct CrawlBudget {
    max_depth: u32,
    max_pages: u32,
    pages_fetched: AtomicU32,
}

impl CrawlBudget {
    pub fn new(max_depth: u32, max_pages: u32) -> Self {
        Self {
            max_depth,
            max_pages,
            pages_fetched: AtomicU32::new(0),
        }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched.load(Ordering::Acquire)
    }

    /// Checks whether an entry at `depth` may be enqueued
    pub fn allows_depth(&self, depth: u32) -> bool {
        self.max_depth == 0 || depth <= self.max_depth
    }

    /// Returns true once the page limit has been reached
    pub fn is_exhausted(&self) -> bool {
        self.max_pages > 0 && self.pages_fetched() >= self.max_pages
    }

    /// Checks whether one more fetch may start while `in_flight` are running
    ///
    /// Every in-flight fetch may still succeed, so it counts against the
    /// limit until it completes.
    pub fn has_room(&self, in_flight: usize) -> bool {
        if self.max_pages == 0 {
            return true;
        }
        let committed = u64::from(self.pages_fetched()) + in_flight as u64;
        committed < u64::from(self.max_pages)
    }

    /// Records one successfully fetched page and returns the new total
    pub fn record_fetch(&self) -> u32 {
        self.pages_fetched.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Returns how many pages may still be fetched, or None when unlimited
    pub fn pages_remaining(&self) -> Option<u32> {
        (self.max_pages > 0).then(|| self.max_pages.saturating_sub(self.pages_fetched()))
    }
}
