//! URL handling module for Wayfinder
//!
//! This module provides URL normalization, domain/path pattern matching and
//! the conjunctive admission filter applied to every discovered link.

mod filter;
mod normalize;
mod pattern;

// Re-export main types and functions
pub use filter::{Rejection, UrlFilter};
pub use normalize::{normalize_url, resolve_link, NormalizedUrl};
pub use pattern::{matches_wildcard, DomainPattern, HostRule, PathRule};
