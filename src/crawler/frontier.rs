//! Frontier for the crawl: priority queue, visited set and admission control
//!
//! This module handles:
//! - Ordering pending URLs by score, then by discovery order
//! - Recording every offered URL in the visited set, admitted or not
//! - Discarding candidates that break depth, budget or filter rules
//! - Tracking in-flight fetches so idle workers know when to wait
//!
//! `push` and `pop` each run as one critical section, so concurrent workers
//! never admit the same URL twice or hand the same entry to two fetches.

use crate::state::CrawlBudget;
use crate::url::{NormalizedUrl, Rejection, UrlFilter};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

/// A link offered to the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: NormalizedUrl,
    pub depth: u32,
    pub score: i32,
    /// Page the link was found on; None for seeds
    pub parent: Option<NormalizedUrl>,
}

impl Candidate {
    /// A depth-0 candidate with a neutral score
    pub fn seed(url: NormalizedUrl) -> Self {
        Self {
            url,
            depth: 0,
            score: 0,
            parent: None,
        }
    }
}

/// A URL queued for fetching with priority information
#[derive(Debug, Clone)]
pub struct FrontierEntry {
    pub url: NormalizedUrl,
    pub depth: u32,
    /// Higher scores are popped first
    pub score: i32,
    pub parent: Option<NormalizedUrl>,
    /// Admission order; breaks score ties and is never reused
    pub sequence: u64,
}

// BinaryHeap is a max-heap: highest score first, then lowest sequence
impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.sequence == other.sequence
    }
}

impl Eq for FrontierEntry {}

/// Why a candidate was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiscardReason {
    /// Already offered earlier in this crawl
    Visited,
    /// Deeper than max-depth
    Depth,
    /// Page limit already reached
    Budget,
    /// An admission rule did not match
    Rejected(Rejection),
}

impl DiscardReason {
    /// Stable label used as the key of skipped counts
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visited => "visited",
            Self::Depth => "depth",
            Self::Budget => "budget",
            Self::Rejected(rejection) => rejection.as_str(),
        }
    }
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visited => f.write_str("already visited"),
            Self::Depth => f.write_str("depth limit"),
            Self::Budget => f.write_str("page budget"),
            Self::Rejected(rejection) => write!(f, "{}", rejection),
        }
    }
}

/// Outcome of [`Frontier::push`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Discarded(DiscardReason),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Outcome of [`Frontier::pop`]
#[derive(Debug)]
pub enum Poll {
    /// An entry to fetch; it is in flight until [`Frontier::complete`]
    Ready(FrontierEntry),
    /// Nothing can be handed out now, but in-flight work may change that
    Pending,
    /// Nothing queued and nothing in flight
    Exhausted,
}

#[derive(Debug, Default)]
struct FrontierInner {
    queue: BinaryHeap<FrontierEntry>,
    visited: HashSet<NormalizedUrl>,
    in_flight: usize,
    next_sequence: u64,
}

/// Frontier shared by every worker of one controller
#[derive(Debug)]
pub struct Frontier {
    inner: Mutex<FrontierInner>,
    budget: Arc<CrawlBudget>,
    filter: UrlFilter,
    wakeup: Arc<Notify>,
}

impl Frontier {
    pub fn new(budget: Arc<CrawlBudget>, filter: UrlFilter) -> Self {
        Self::with_wakeup(budget, filter, Arc::new(Notify::new()))
    }

    /// Creates a frontier whose idle workers are also woken through `wakeup`
    pub fn with_wakeup(budget: Arc<CrawlBudget>, filter: UrlFilter, wakeup: Arc<Notify>) -> Self {
        Self {
            inner: Mutex::new(FrontierInner::default()),
            budget,
            filter,
            wakeup,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Offers a candidate to the frontier
    ///
    /// The URL is recorded as visited whatever the outcome. Checks run in
    /// order: visited, depth, budget, admission rules.
    pub fn push(&self, candidate: Candidate) -> Admission {
        let admission = {
            let mut inner = self.lock();

            if !inner.visited.insert(candidate.url.clone()) {
                Admission::Discarded(DiscardReason::Visited)
            } else if !self.budget.allows_depth(candidate.depth) {
                Admission::Discarded(DiscardReason::Depth)
            } else if self.budget.is_exhausted() {
                Admission::Discarded(DiscardReason::Budget)
            } else if let Err(rejection) = self.filter.check(&candidate.url) {
                Admission::Discarded(DiscardReason::Rejected(rejection))
            } else {
                let sequence = inner.next_sequence;
                inner.next_sequence += 1;
                inner.queue.push(FrontierEntry {
                    url: candidate.url,
                    depth: candidate.depth,
                    score: candidate.score,
                    parent: candidate.parent,
                    sequence,
                });
                Admission::Admitted
            }
        };

        if admission.is_admitted() {
            self.wakeup.notify_waiters();
        }
        admission
    }

    /// Takes the highest-priority entry and marks it in flight
    ///
    /// An entry is only handed out while the page budget has room for it
    /// on top of every fetch already in flight.
    pub fn pop(&self) -> Poll {
        let mut inner = self.lock();

        if !self.budget.has_room(inner.in_flight) {
            return if inner.in_flight > 0 {
                Poll::Pending
            } else {
                Poll::Exhausted
            };
        }

        match inner.queue.pop() {
            Some(entry) => {
                inner.in_flight += 1;
                tracing::trace!(
                    "Popped {} (score {}, depth {})",
                    entry.url,
                    entry.score,
                    entry.depth
                );
                Poll::Ready(entry)
            }
            None if inner.in_flight > 0 => Poll::Pending,
            None => Poll::Exhausted,
        }
    }

    /// Releases the in-flight mark of a popped entry and wakes idle workers
    pub fn complete(&self, entry: &FrontierEntry) {
        {
            let mut inner = self.lock();
            inner.in_flight = inner.in_flight.saturating_sub(1);
        }
        tracing::trace!("Completed {}", entry.url);
        self.wakeup.notify_waiters();
    }

    /// Future resolved by the next push, completion or [`Frontier::wake_all`]
    ///
    /// Enable it before calling [`Frontier::pop`] so no wakeup is lost in
    /// between.
    pub fn notified(&self) -> Notified<'_> {
        self.wakeup.notified()
    }

    /// Wakes every idle worker
    pub fn wake_all(&self) {
        self.wakeup.notify_waiters();
    }

    pub fn is_visited(&self, url: &NormalizedUrl) -> bool {
        self.lock().visited.contains(url)
    }

    pub fn visited_count(&self) -> usize {
        self.lock().visited.len()
    }

    /// Sorted copy of the visited set
    pub fn visited(&self) -> Vec<NormalizedUrl> {
        let mut visited: Vec<NormalizedUrl> = self.lock().visited.iter().cloned().collect();
        visited.sort();
        visited
    }

    /// Number of queued entries, excluding in-flight ones
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }
}
