//! Wayfinder: a navigation core for web crawls
//!
//! This crate decides where a crawl goes next. It normalizes discovered
//! addresses, restricts them to the configured domains and paths, ranks them
//! against an optional stop target, enforces depth and page budgets, and drives
//! the fetch/extract/score/enqueue cycle until a terminal condition is reached.
//! Fetching itself is delegated to a pluggable [`crawler::FetchEngine`].

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Wayfinder operations
#[derive(Debug, Error)]
pub enum WayfinderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlState,
        to: state::CrawlState,
    },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid regular expression '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },
}

/// URL-specific errors
///
/// Every variant means the same thing to the crawl: the address cannot be
/// turned into a [`url::NormalizedUrl`] and the candidate is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Relative URL without a base: {0}")]
    RelativeWithoutBase(String),
}

/// Result type alias for Wayfinder operations
pub type Result<T> = std::result::Result<T, WayfinderError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, CrawlSettings};
pub use crawler::{Controller, FetchEngine, StopHandle};
pub use state::CrawlState;
pub use url::{normalize_url, DomainPattern, NormalizedUrl};
