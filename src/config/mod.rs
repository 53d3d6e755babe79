//! Configuration module for Wayfinder
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! A [`Config`] is the raw, serde-facing record; [`validate`] turns it into the
//! immutable [`CrawlSettings`] the controller runs with.
//!
//! # Example
//!
//! ```no_run
//! use wayfinder::config::{load_config, validate};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("wayfinder.toml")).unwrap();
//! let settings = validate(&config).unwrap();
//! println!("Primary seed: {}", settings.primary_seed());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlConfig, FetchConfig, OutputConfig};
pub use validation::{validate, CrawlSettings};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_config, read_config,
};
