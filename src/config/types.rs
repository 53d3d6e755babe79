use serde::Deserialize;

/// Main configuration structure for Wayfinder
///
/// Every recognized option is listed here with its default. The record is
/// validated once by [`crate::config::validate`], which produces the
/// immutable [`crate::config::CrawlSettings`] used by the controller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Navigation configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Seed URLs; the first one is the primary seed
    pub seeds: Vec<String>,

    /// Only follow links on the seed hosts
    pub on_site: bool,

    /// Host/path restriction such as `https://*.example.com/docs/*`
    pub force_domain: Option<String>,

    /// Stop the crawl once this URL has been fetched
    pub stop_target: Option<String>,

    /// Maximum discovery depth (0 = unlimited)
    pub max_depth: u32,

    /// Maximum number of fetched pages (0 = unlimited)
    pub max_pages: u32,

    /// Regex a URL must match to be crawled
    pub include: Option<String>,

    /// Regex a URL must not match to be crawled
    pub exclude: Option<String>,

    /// Resource extensions to accept (e.g. `["pdf"]`)
    pub file_types: Option<Vec<String>>,

    /// Text a page must contain to be collected
    pub content_filter: Option<String>,

    /// Whether pages failing the content filter still expand their links
    pub follow_filtered_links: bool,

    /// Number of concurrent workers (1 = single-flow)
    pub workers: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            seeds: Vec::new(),
            on_site: false,
            force_domain: None,
            stop_target: None,
            max_depth: 0,
            max_pages: 0,
            include: None,
            exclude: None,
            file_types: None,
            content_filter: None,
            follow_filtered_links: true,
            workers: 1,
        }
    }
}

/// Fetch engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Per-request timeout (milliseconds)
    pub timeout_ms: u64,

    /// Retries after the first failed attempt
    pub retries: u32,

    /// Base delay between attempts; attempt `n` waits `n * retry_backoff_ms`
    pub retry_backoff_ms: u64,

    /// User-Agent header sent by the HTTP engine
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            retries: 2,
            retry_backoff_ms: 500,
            user_agent: format!("wayfinder/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the markdown summary file
    pub summary_path: Option<String>,

    /// Path to the JSON snapshot of the crawl
    pub snapshot_path: Option<String>,
}
