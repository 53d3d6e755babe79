use crate::config::types::{Config, CrawlConfig, FetchConfig};
use crate::url::{normalize_url, DomainPattern, NormalizedUrl, UrlFilter};
use crate::ConfigError;
use regex::Regex;
use std::time::Duration;

/// Maximum number of concurrent workers
const MAX_WORKERS: u32 = 64;

/// Maximum number of retries per URL
const MAX_RETRIES: u32 = 10;

/// Validated, immutable crawl settings
///
/// Produced once by [`validate`]; the controller never sees an unvalidated
/// [`Config`].
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Normalized seed URLs; the first one is the primary seed
    pub seeds: Vec<NormalizedUrl>,
    pub stop_target: Option<NormalizedUrl>,
    /// On-site, force-domain, include/exclude and file-type rules
    pub filter: UrlFilter,
    pub max_depth: u32,
    pub max_pages: u32,
    /// Lowercased text a page must contain to be collected
    pub content_filter: Option<String>,
    pub follow_filtered_links: bool,
    pub workers: usize,
    pub retries: u32,
    pub retry_backoff: Duration,
    pub fetch_timeout: Duration,
    pub user_agent: String,
}

impl CrawlSettings {
    /// The seed whose failure fails the whole crawl
    pub fn primary_seed(&self) -> &NormalizedUrl {
        &self.seeds[0]
    }
}

/// Validates the entire configuration and compiles it into [`CrawlSettings`]
pub fn validate(config: &Config) -> Result<CrawlSettings, ConfigError> {
    validate_fetch_config(&config.fetch)?;
    let crawl = &config.crawl;

    if crawl.workers < 1 || crawl.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, crawl.workers
        )));
    }

    let seeds = validate_seeds(crawl)?;

    let stop_target = optional_setting(&crawl.stop_target)
        .map(|raw| {
            normalize_url(raw, None).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid stop target '{}': {}", raw, e))
            })
        })
        .transpose()?;

    let filter = build_filter(crawl, &seeds)?;

    Ok(CrawlSettings {
        seeds,
        stop_target,
        filter,
        max_depth: crawl.max_depth,
        max_pages: crawl.max_pages,
        content_filter: optional_setting(&crawl.content_filter).map(str::to_lowercase),
        follow_filtered_links: crawl.follow_filtered_links,
        workers: crawl.workers as usize,
        retries: config.fetch.retries,
        retry_backoff: Duration::from_millis(config.fetch.retry_backoff_ms),
        fetch_timeout: Duration::from_millis(config.fetch.timeout_ms),
        user_agent: config.fetch.user_agent.clone(),
    })
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "timeout-ms must be >= 100ms, got {}ms",
            config.timeout_ms
        )));
    }

    if config.retries > MAX_RETRIES {
        return Err(ConfigError::Validation(format!(
            "retries must be <= {}, got {}",
            MAX_RETRIES, config.retries
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Normalizes every seed URL
fn validate_seeds(crawl: &CrawlConfig) -> Result<Vec<NormalizedUrl>, ConfigError> {
    if crawl.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }

    let mut seeds: Vec<NormalizedUrl> = Vec::with_capacity(crawl.seeds.len());
    for raw in &crawl.seeds {
        let seed = normalize_url(raw, None)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", raw, e)))?;
        if !seeds.contains(&seed) {
            seeds.push(seed);
        }
    }

    Ok(seeds)
}

/// Compiles the admission rules
fn build_filter(crawl: &CrawlConfig, seeds: &[NormalizedUrl]) -> Result<UrlFilter, ConfigError> {
    let mut filter = UrlFilter::new();

    if crawl.on_site {
        filter = filter.with_on_site(seeds.iter().map(NormalizedUrl::host));
    }

    if let Some(pattern) = optional_setting(&crawl.force_domain) {
        filter = filter.with_force_domain(DomainPattern::compile(pattern)?);
    }

    if let Some(include) = optional_setting(&crawl.include) {
        filter = filter.with_include(compile_regex(include)?);
    }

    if let Some(exclude) = optional_setting(&crawl.exclude) {
        filter = filter.with_exclude(compile_regex(exclude)?);
    }

    if let Some(file_types) = crawl.file_types.as_ref().filter(|types| !types.is_empty()) {
        filter = filter.with_file_types(file_types.clone());
    }

    Ok(filter)
}

fn compile_regex(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

/// Treats blank values and the `N/A` sentinel as "not set"
fn optional_setting(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("n/a"))
}
