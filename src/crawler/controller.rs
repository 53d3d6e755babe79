//! Crawl controller - main crawl orchestration logic
//!
//! This module contains the state machine that drives a crawl:
//! - Validating the configuration and seeding the frontier
//! - Popping entries and delegating fetches to the [`FetchEngine`]
//! - Retrying failed fetches with linear backoff
//! - Normalizing, scoring and offering discovered links
//! - Evaluating the target, budget and stop-signal terminal conditions
//! - Emitting the terminal report exactly once

use crate::config::{validate, Config, CrawlSettings};
use crate::crawler::engine::{
    FetchEngine, FetchError, FetchedPage, PageContext, ScriptLogLevel, ScriptResult,
};
use crate::crawler::frontier::{Admission, Candidate, DiscardReason, Frontier, FrontierEntry, Poll};
use crate::crawler::scorer::score_link;
use crate::output::{
    CollectedPage, CrawlReport, CrawlSnapshot, LinkAnalysis, PageFailure, PageRecord, Reporter,
    LINK_ANALYSIS_LIMIT,
};
use crate::state::{CrawlBudget, CrawlState, LinkGraph};
use crate::url::{normalize_url, resolve_link, NormalizedUrl};
use crate::WayfinderError;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Instant;
use tokio::sync::Notify;
use url::Url;

/// Result of one [`Controller::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// One entry was fetched (or failed) and processed
    Processed,
    /// Nothing to pop right now, other fetches are in flight
    Idle,
    /// The crawl is not running
    Halted,
}

#[derive(Debug)]
struct StopSignal {
    raised: AtomicBool,
    reason: Mutex<Option<String>>,
    wakeup: Arc<Notify>,
}

/// Cloneable handle that asks a running crawl to stop
///
/// The signal is observed before every pop and at the end of every page;
/// fetches already in flight are allowed to finish.
#[derive(Debug, Clone)]
pub struct StopHandle {
    inner: Arc<StopSignal>,
}

impl StopHandle {
    fn new(wakeup: Arc<Notify>) -> Self {
        Self {
            inner: Arc::new(StopSignal {
                raised: AtomicBool::new(false),
                reason: Mutex::new(None),
                wakeup,
            }),
        }
    }

    /// Raises the stop signal; the first reason wins
    pub fn stop(&self, reason: impl Into<String>) {
        {
            let mut current = self
                .inner
                .reason
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            current.get_or_insert_with(|| reason.into());
        }
        self.inner.raised.store(true, Ordering::Release);
        self.inner.wakeup.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.raised.load(Ordering::Acquire)
    }

    pub fn reason(&self) -> Option<String> {
        self.inner
            .reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Mutable bookkeeping shared by the workers
#[derive(Debug, Default)]
struct Progress {
    graph: LinkGraph,
    pages: Vec<CollectedPage>,
    records: Vec<PageRecord>,
    errors: Vec<PageFailure>,
    skipped: BTreeMap<String, u64>,
    content_types: BTreeMap<String, u64>,
    invalid_links: u64,
    stop_reason: Option<String>,
}

impl Progress {
    fn count_discard(&mut self, reason: DiscardReason) {
        if reason != DiscardReason::Visited {
            *self.skipped.entry(reason.as_str().to_string()).or_insert(0) += 1;
        }
    }
}

struct FetchFailure {
    error: FetchError,
    attempts: u32,
}

/// Runtime state of a started crawl, shared by every worker
struct Crawl {
    settings: CrawlSettings,
    engine: Arc<dyn FetchEngine>,
    reporter: Option<Arc<dyn Reporter>>,
    config_hash: Option<String>,
    budget: Arc<CrawlBudget>,
    frontier: Frontier,
    stop: StopHandle,
    state: Mutex<CrawlState>,
    progress: Mutex<Progress>,
    started: Instant,
    started_at: DateTime<Utc>,
    emitted: AtomicBool,
    report: OnceLock<CrawlReport>,
}

/// Main crawl controller
///
/// Starts `Idle`; [`Controller::start`] validates the configuration and
/// seeds the frontier. The crawl is then driven either one [`step`] at a
/// time or by [`Controller::run`], which spawns the configured number of
/// workers.
///
/// [`step`]: Controller::step
pub struct Controller {
    config: Config,
    engine: Arc<dyn FetchEngine>,
    reporter: Option<Arc<dyn Reporter>>,
    config_hash: Option<String>,
    wakeup: Arc<Notify>,
    stop: StopHandle,
    crawl: Option<Arc<Crawl>>,
}

impl Controller {
    /// Creates an idle controller; nothing is validated until [`Controller::start`]
    pub fn new(config: Config, engine: Arc<dyn FetchEngine>) -> Self {
        let wakeup = Arc::new(Notify::new());
        Self {
            config,
            engine,
            reporter: None,
            config_hash: None,
            stop: StopHandle::new(Arc::clone(&wakeup)),
            wakeup,
            crawl: None,
        }
    }

    /// Sets the collaborator that receives the terminal report
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Records the configuration file hash in the report
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Handle that stops this crawl from another task
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn state(&self) -> CrawlState {
        self.crawl
            .as_ref()
            .map_or(CrawlState::Idle, |crawl| crawl.state())
    }

    /// Validated settings, once started
    pub fn settings(&self) -> Option<&CrawlSettings> {
        self.crawl.as_ref().map(|crawl| &crawl.settings)
    }

    pub fn pages_fetched(&self) -> u32 {
        self.crawl
            .as_ref()
            .map_or(0, |crawl| crawl.budget.pages_fetched())
    }

    /// Validates the configuration, seeds the frontier and enters `Running`
    ///
    /// On a configuration error the controller stays `Idle`. Seeds go
    /// through the same admission rules as discovered links.
    pub fn start(&mut self) -> crate::Result<()> {
        self.begin().map(|_| ())
    }

    fn begin(&mut self) -> crate::Result<Arc<Crawl>> {
        if self.crawl.is_some() {
            return Err(WayfinderError::InvalidTransition {
                from: self.state(),
                to: CrawlState::Running,
            });
        }

        let settings = validate(&self.config)?;
        let crawl = Arc::new(Crawl::new(
            settings,
            Arc::clone(&self.engine),
            self.reporter.clone(),
            self.config_hash.clone(),
            self.stop.clone(),
            Arc::clone(&self.wakeup),
        ));

        tracing::info!(
            "Starting crawl from {} seed(s), target: {}",
            crawl.settings.seeds.len(),
            crawl
                .settings
                .stop_target
                .as_ref()
                .map_or_else(|| "none".to_string(), ToString::to_string)
        );

        for seed in &crawl.settings.seeds {
            match crawl.frontier.push(Candidate::seed(seed.clone())) {
                Admission::Admitted => tracing::debug!("Seeded {}", seed),
                Admission::Discarded(reason) => {
                    tracing::warn!("Seed {} discarded: {}", seed, reason);
                    crawl.lock_progress().count_discard(reason);
                }
            }
        }

        crawl.transition(CrawlState::Running, None);
        self.crawl = Some(Arc::clone(&crawl));
        Ok(crawl)
    }

    /// Runs one iteration of the crawl loop
    ///
    /// Returns `Halted` when the controller was never started or has reached
    /// a terminal state.
    pub async fn step(&self) -> StepOutcome {
        match &self.crawl {
            Some(crawl) => crawl.step().await,
            None => StepOutcome::Halted,
        }
    }

    /// Runs the crawl to a terminal state and returns the report
    ///
    /// Starts the controller first if needed, then spawns `workers` tasks
    /// that step concurrently against the shared frontier.
    pub async fn run(&mut self) -> crate::Result<CrawlReport> {
        let crawl = match &self.crawl {
            Some(crawl) => Arc::clone(crawl),
            None => self.begin()?,
        };

        let handles: Vec<_> = (0..crawl.settings.workers)
            .map(|worker| {
                let crawl = Arc::clone(&crawl);
                tokio::spawn(async move { crawl.work(worker).await })
            })
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Crawl worker failed: {}", e);
            }
        }

        // Only reachable with a non-terminal state if every worker died
        if !crawl.state().is_terminal() {
            crawl.transition(CrawlState::Failed, Some("all workers exited".to_string()));
        }
        Ok(crawl.emit_report().clone())
    }

    /// The terminal report, once emitted
    pub fn report(&self) -> Option<&CrawlReport> {
        self.crawl.as_ref().and_then(|crawl| crawl.report.get())
    }

    /// Current visited set, pages, link graph and records
    pub fn snapshot(&self) -> CrawlSnapshot {
        self.crawl
            .as_ref()
            .map(|crawl| crawl.snapshot())
            .unwrap_or_default()
    }
}

impl Crawl {
    fn new(
        settings: CrawlSettings,
        engine: Arc<dyn FetchEngine>,
        reporter: Option<Arc<dyn Reporter>>,
        config_hash: Option<String>,
        stop: StopHandle,
        wakeup: Arc<Notify>,
    ) -> Self {
        let budget = Arc::new(CrawlBudget::new(settings.max_depth, settings.max_pages));
        let frontier = Frontier::with_wakeup(Arc::clone(&budget), settings.filter.clone(), wakeup);

        Self {
            settings,
            engine,
            reporter,
            config_hash,
            budget,
            frontier,
            stop,
            state: Mutex::new(CrawlState::Idle),
            progress: Mutex::new(Progress::default()),
            started: Instant::now(),
            started_at: Utc::now(),
            emitted: AtomicBool::new(false),
            report: OnceLock::new(),
        }
    }

    fn state(&self) -> CrawlState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_progress(&self) -> MutexGuard<'_, Progress> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves to `next` if the state machine allows it
    ///
    /// Returns false when another worker already reached a terminal state.
    fn transition(&self, next: CrawlState, reason: Option<String>) -> bool {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if !state.can_transition_to(next) {
                return false;
            }
            *state = next;
        }

        if next.is_terminal() {
            match &reason {
                Some(reason) => tracing::info!("Crawl {}: {}", next, reason),
                None => tracing::info!("Crawl {}", next),
            }
            self.lock_progress().stop_reason = reason;
            self.frontier.wake_all();
            self.emit_if_settled();
        } else {
            tracing::debug!("Crawl state -> {}", next);
        }
        true
    }

    /// Emits the report once the crawl is terminal and no fetch is in flight
    fn emit_if_settled(&self) {
        if self.state().is_terminal() && self.frontier.in_flight() == 0 {
            self.emit_report();
        }
    }

    fn emit_report(&self) -> &CrawlReport {
        if !self.emitted.swap(true, Ordering::AcqRel) {
            let report = self.report.get_or_init(|| self.build_report());
            tracing::info!(
                "Crawl finished ({}): {} pages fetched, {} errors in {:.1?}",
                report.state,
                report.pages_fetched,
                report.error_count(),
                report.elapsed
            );
            if let Some(reporter) = &self.reporter {
                if let Err(e) = reporter.report(report) {
                    tracing::error!("Failed to report crawl results: {}", e);
                }
            }
            return report;
        }
        self.report.get_or_init(|| self.build_report())
    }

    fn build_report(&self) -> CrawlReport {
        let progress = self.lock_progress();

        let mut site_map: BTreeMap<u32, Vec<NormalizedUrl>> = BTreeMap::new();
        for page in &progress.pages {
            site_map.entry(page.depth).or_default().push(page.url.clone());
        }

        CrawlReport {
            state: self.state(),
            stop_reason: progress.stop_reason.clone(),
            seeds: self.settings.seeds.clone(),
            stop_target: self.settings.stop_target.clone(),
            pages_fetched: self.budget.pages_fetched(),
            pages_collected: progress.pages.iter().filter(|page| page.collected).count(),
            visited_count: self.frontier.visited_count(),
            records_collected: progress.records.len(),
            invalid_links: progress.invalid_links,
            skipped: progress.skipped.clone(),
            errors: progress.errors.clone(),
            content_types: progress.content_types.clone(),
            site_map,
            link_analysis: LinkAnalysis::from_graph(&progress.graph, LINK_ANALYSIS_LIMIT),
            started_at: self.started_at,
            finished_at: Utc::now(),
            elapsed: self.started.elapsed(),
            config_hash: self.config_hash.clone(),
        }
    }

    fn snapshot(&self) -> CrawlSnapshot {
        let visited = self.frontier.visited();
        let progress = self.lock_progress();
        CrawlSnapshot {
            visited,
            pages: progress.pages.clone(),
            graph: progress.graph.clone(),
            records: progress.records.clone(),
        }
    }

    /// Worker loop: step until halted, sleeping while only others have work
    async fn work(self: Arc<Self>, worker: usize) {
        tracing::debug!("Worker {} started", worker);

        loop {
            let notified = self.frontier.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.step().await {
                StepOutcome::Processed => {}
                StepOutcome::Idle => notified.await,
                StepOutcome::Halted => break,
            }
        }

        tracing::debug!("Worker {} stopped", worker);
    }

    async fn step(&self) -> StepOutcome {
        if self.state() != CrawlState::Running {
            return StepOutcome::Halted;
        }

        if self.stop.is_stopped() {
            self.transition(CrawlState::StoppedByExternalSignal, self.stop.reason());
            return StepOutcome::Halted;
        }

        let entry = match self.frontier.pop() {
            Poll::Ready(entry) => entry,
            Poll::Pending => return StepOutcome::Idle,
            Poll::Exhausted => {
                if self.budget.is_exhausted() {
                    self.transition(CrawlState::StoppedByBudget, Some(self.budget_reason()));
                } else {
                    self.transition(CrawlState::Completed, Some("frontier exhausted".to_string()));
                }
                return StepOutcome::Halted;
            }
        };

        // Another worker may have reached a terminal state since the check above
        if self.state() != CrawlState::Running {
            self.frontier.complete(&entry);
            self.emit_if_settled();
            return StepOutcome::Halted;
        }

        self.process(&entry).await;
        self.frontier.complete(&entry);
        self.emit_if_settled();
        StepOutcome::Processed
    }

    /// Fetches one entry and applies every post-fetch rule
    async fn process(&self, entry: &FrontierEntry) {
        let context = PageContext {
            url: entry.url.clone(),
            pages_fetched: self.budget.pages_fetched(),
            depth: entry.depth,
            visited_count: self.frontier.visited_count(),
        };

        let page = match self.fetch_with_retry(entry, &context).await {
            Ok(page) => page,
            Err(failure) => {
                self.record_failure(entry, failure);
                return;
            }
        };

        let fetched = self.budget.record_fetch();
        tracing::info!(
            "Fetched {} (depth {}, {} links, {} fetched)",
            entry.url,
            entry.depth,
            page.links.len(),
            fetched
        );

        // Relative links resolve against where the content was served from
        let served_from = page
            .final_url
            .as_deref()
            .and_then(|raw| Url::parse(raw).ok())
            .unwrap_or_else(|| entry.url.as_url().clone());

        let skip_reason = match &page.script {
            Some(script) => self.apply_script(&entry.url, script),
            None => None,
        };
        let content_matches = self.content_matches(&page);
        let collected = skip_reason.is_none() && content_matches;
        let skip_reason = skip_reason.or_else(|| (!content_matches).then(|| "content filter".to_string()));

        {
            let mut progress = self.lock_progress();
            if !collected {
                *progress.skipped.entry("not_collected".to_string()).or_insert(0) += 1;
            }
            let content_type = page.content_type.as_deref().unwrap_or("unknown");
            *progress
                .content_types
                .entry(content_type.to_string())
                .or_insert(0) += 1;
            progress.graph.record_page(&entry.url);
            progress.pages.push(CollectedPage {
                url: entry.url.clone(),
                depth: entry.depth,
                parent: entry.parent.clone(),
                content_type: page.content_type.clone(),
                title: page.title.clone(),
                meta_description: page.meta_description.clone(),
                headings: page.headings.clone(),
                content: page.content.clone(),
                content_length: page.content.len(),
                link_count: page.links.len(),
                asset_count: page.assets.len(),
                collected,
                skip_reason,
            });
        }

        if self.is_stop_target(&entry.url, &served_from) {
            self.transition(
                CrawlState::StoppedByTarget,
                Some(format!("reached stop target {}", entry.url)),
            );
            return;
        }

        if content_matches || self.settings.follow_filtered_links {
            self.expand_links(entry, &served_from, &page.links);
        } else {
            tracing::debug!("Not following links of filtered page {}", entry.url);
        }

        if self.budget.is_exhausted() {
            self.transition(CrawlState::StoppedByBudget, Some(self.budget_reason()));
            return;
        }

        if self.stop.is_stopped() {
            self.transition(CrawlState::StoppedByExternalSignal, self.stop.reason());
        }
    }

    /// Calls the engine, retrying with linearly increasing backoff
    async fn fetch_with_retry(
        &self,
        entry: &FrontierEntry,
        context: &PageContext,
    ) -> Result<FetchedPage, FetchFailure> {
        let max_attempts = self.settings.retries + 1;
        let mut attempt = 1;

        loop {
            let result = tokio::time::timeout(
                self.settings.fetch_timeout,
                self.engine.fetch(&entry.url, context),
            )
            .await
            .unwrap_or_else(|_| {
                Err(FetchError::timeout(format!(
                    "no response after {:?}",
                    self.settings.fetch_timeout
                )))
            });

            match result {
                Ok(page) => return Ok(page),
                Err(error) if attempt < max_attempts && !self.stop.is_stopped() => {
                    let backoff = self.settings.retry_backoff * attempt;
                    tracing::warn!(
                        "Fetch {} failed (attempt {}/{}): {}; retrying in {:?}",
                        entry.url,
                        attempt,
                        max_attempts,
                        error,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(error) => {
                    return Err(FetchFailure {
                        error,
                        attempts: attempt,
                    })
                }
            }
        }
    }

    fn record_failure(&self, entry: &FrontierEntry, failure: FetchFailure) {
        tracing::error!(
            "Giving up on {} after {} attempt(s): {}",
            entry.url,
            failure.attempts,
            failure.error
        );

        let is_primary_seed = entry.depth == 0 && entry.url == *self.settings.primary_seed();
        let reason = format!("primary seed {} unreachable: {}", entry.url, failure.error);

        self.lock_progress().errors.push(PageFailure {
            url: entry.url.clone(),
            kind: failure.error.kind,
            message: failure.error.message,
            attempts: failure.attempts,
            depth: entry.depth,
            parent: entry.parent.clone(),
        });

        if is_primary_seed {
            self.transition(CrawlState::Failed, Some(reason));
        }
    }

    /// Forwards script logs, keeps tagged records and reads stop/skip
    ///
    /// Returns the skip reason, if the script asked for one.
    fn apply_script(&self, page: &NormalizedUrl, script: &ScriptResult) -> Option<String> {
        for log in &script.logs {
            match log.level {
                ScriptLogLevel::Info => tracing::info!(page = %page, "script: {}", log.message),
                ScriptLogLevel::Warn => tracing::warn!(page = %page, "script: {}", log.message),
                ScriptLogLevel::Error => tracing::error!(page = %page, "script: {}", log.message),
            }
        }

        let records: Vec<PageRecord> = script
            .records
            .iter()
            .filter(|record| {
                let tagged = !record.tag.trim().is_empty();
                if !tagged {
                    tracing::warn!(page = %page, "Dropping script record without a tag");
                }
                tagged
            })
            .map(|record| PageRecord {
                page: page.clone(),
                record: record.clone(),
            })
            .collect();
        if !records.is_empty() {
            self.lock_progress().records.extend(records);
        }

        if let Some(reason) = &script.stop {
            tracing::info!(page = %page, "Script requested stop: {}", reason);
            self.stop.stop(reason.clone());
        }

        script.skip.clone()
    }

    fn content_matches(&self, page: &FetchedPage) -> bool {
        match &self.settings.content_filter {
            Some(needle) => page.content.to_lowercase().contains(needle.as_str()),
            None => true,
        }
    }

    fn is_stop_target(&self, url: &NormalizedUrl, served_from: &Url) -> bool {
        let Some(target) = &self.settings.stop_target else {
            return false;
        };
        target == url
            || normalize_url(served_from.as_str(), None).is_ok_and(|served| &served == target)
    }

    /// Normalizes, scores and offers every link found on a page
    fn expand_links(&self, entry: &FrontierEntry, base: &Url, links: &[String]) {
        let target = self.settings.stop_target.as_ref();
        let mut admitted = 0usize;

        for raw in links {
            let url = match resolve_link(raw, base) {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!("Dropping link {:?} on {}: {}", raw, entry.url, e);
                    self.lock_progress().invalid_links += 1;
                    continue;
                }
            };

            self.lock_progress().graph.record_link(&entry.url, &url);

            let candidate = Candidate {
                score: score_link(&url, &entry.url, target),
                url,
                depth: entry.depth + 1,
                parent: Some(entry.url.clone()),
            };
            let url = candidate.url.clone();
            match self.frontier.push(candidate) {
                Admission::Admitted => admitted += 1,
                Admission::Discarded(reason) => {
                    tracing::debug!("Discarded {}: {}", url, reason);
                    self.lock_progress().count_discard(reason);
                }
            }
        }

        tracing::debug!(
            "{} of {} links on {} admitted",
            admitted,
            links.len(),
            entry.url
        );
    }

    fn budget_reason(&self) -> String {
        format!("page budget of {} reached", self.budget.max_pages())
    }
}
