//! In-memory fetch engine and helpers shared by the crawl scenarios

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wayfinder::crawler::{FetchEngine, FetchError, FetchedPage, PageContext};
use wayfinder::output::{CrawlReport, OutputResult, Reporter};
use wayfinder::{normalize_url, Config, Controller, CrawlState, NormalizedUrl};

/// One scripted answer for a URL
#[derive(Debug, Clone)]
pub enum Reply {
    Page(FetchedPage),
    Fail(FetchError),
    Slow(Duration, FetchedPage),
}

/// Engine serving canned replies per URL
///
/// Replies for a URL are used in order; the last one repeats. Unknown URLs
/// answer with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    routes: HashMap<String, Vec<Reply>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, page: FetchedPage) -> Self {
        self.replies(url, vec![Reply::Page(page)])
    }

    pub fn replies(mut self, url: &str, replies: Vec<Reply>) -> Self {
        self.routes.insert(key(url), replies);
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// URLs in the order they were fetched, retries included
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        let url = key(url);
        self.calls.lock().unwrap().iter().filter(|c| **c == url).count()
    }
}

#[async_trait]
impl FetchEngine for ScriptedEngine {
    async fn fetch(
        &self,
        url: &NormalizedUrl,
        _context: &PageContext,
    ) -> Result<FetchedPage, FetchError> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            let attempt = calls.iter().filter(|c| c.as_str() == url.as_str()).count();
            calls.push(url.to_string());
            attempt
        };

        let reply = match self.routes.get(url.as_str()) {
            Some(replies) => replies[attempt.min(replies.len() - 1)].clone(),
            None => return Err(FetchError::transport(format!("HTTP 404 for {}", url))),
        };

        match reply {
            Reply::Page(page) => Ok(page),
            Reply::Fail(error) => Err(error),
            Reply::Slow(delay, page) => {
                tokio::time::sleep(delay).await;
                Ok(page)
            }
        }
    }
}

/// Reporter remembering how often and with what it was called
#[derive(Debug, Default)]
pub struct RecordingReporter {
    calls: AtomicUsize,
    last_state: Mutex<Option<CrawlState>>,
}

impl RecordingReporter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_state(&self) -> Option<CrawlState> {
        *self.last_state.lock().unwrap()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, report: &CrawlReport) -> OutputResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_state.lock().unwrap() = Some(report.state);
        Ok(())
    }
}

pub fn key(raw: &str) -> String {
    url(raw).to_string()
}

pub fn url(raw: &str) -> NormalizedUrl {
    normalize_url(raw, None).unwrap()
}

/// Page with the given body and links
pub fn html(content: &str, links: &[&str]) -> FetchedPage {
    FetchedPage::new(content).with_links(links.iter().copied())
}

/// Default configuration for one seed with near-zero retry backoff
pub fn config(seed: &str) -> Config {
    let mut config = Config::default();
    config.crawl.seeds = vec![seed.to_string()];
    config.fetch.retry_backoff_ms = 1;
    config
}

pub async fn crawl(config: Config, engine: Arc<ScriptedEngine>) -> (Controller, CrawlReport) {
    let mut controller = Controller::new(config, engine);
    let report = controller.run().await.unwrap();
    (controller, report)
}
