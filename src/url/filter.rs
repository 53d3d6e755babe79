//! Conjunctive admission rules for discovered URLs
//!
//! Every active rule must accept a URL for it to be crawled: on-site AND
//! force-domain AND include-regex AND NOT exclude-regex AND file-type.
//! No rule ever replaces another.

use crate::url::{DomainPattern, NormalizedUrl};
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// Extensions treated as non-page resources by the file-type rule
const RESOURCE_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "zip", "exe", "jpg", "png", "gif", "mp4", "mp3",
];

/// Why a URL was refused by a [`UrlFilter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Host differs from every seed host while on-site mode is active
    OffSite,
    /// Does not match the force-domain pattern
    OutsideForcedDomain,
    /// Does not match the include regex
    NotIncluded,
    /// Matches the exclude regex
    Excluded,
    /// Points at a resource type that was not asked for
    FileType,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OffSite => "off_site",
            Self::OutsideForcedDomain => "outside_forced_domain",
            Self::NotIncluded => "not_included",
            Self::Excluded => "excluded",
            Self::FileType => "file_type",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The compiled set of admission rules for one crawl
#[derive(Debug, Clone, Default)]
pub struct UrlFilter {
    on_site: Vec<DomainPattern>,
    force_domain: Option<DomainPattern>,
    include: Option<Regex>,
    exclude: Option<Regex>,
    file_types: Option<Vec<String>>,
}

impl UrlFilter {
    /// Creates a filter that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts URLs to the given seed hosts (one exact-host rule per host)
    pub fn with_on_site<'a>(mut self, hosts: impl IntoIterator<Item = &'a str>) -> Self {
        for host in hosts {
            let rule = DomainPattern::on_site(host);
            if !self.on_site.contains(&rule) {
                self.on_site.push(rule);
            }
        }
        self
    }

    pub fn with_force_domain(mut self, pattern: DomainPattern) -> Self {
        self.force_domain = Some(pattern);
        self
    }

    pub fn with_include(mut self, include: Regex) -> Self {
        self.include = Some(include);
        self
    }

    pub fn with_exclude(mut self, exclude: Regex) -> Self {
        self.exclude = Some(exclude);
        self
    }

    /// Only accept resource links whose extension is listed
    pub fn with_file_types(mut self, file_types: Vec<String>) -> Self {
        let normalized = file_types
            .iter()
            .map(|ft| ft.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ft| !ft.is_empty())
            .collect();
        self.file_types = Some(normalized);
        self
    }

    /// Checks every active rule, returning the first one that refuses the URL
    pub fn check(&self, url: &NormalizedUrl) -> Result<(), Rejection> {
        if !self.on_site.is_empty() && !self.on_site.iter().any(|rule| rule.matches(url)) {
            return Err(Rejection::OffSite);
        }

        if let Some(pattern) = &self.force_domain {
            if !pattern.matches(url) {
                return Err(Rejection::OutsideForcedDomain);
            }
        }

        if let Some(include) = &self.include {
            if !include.is_match(url.as_str()) {
                return Err(Rejection::NotIncluded);
            }
        }

        if let Some(exclude) = &self.exclude {
            if exclude.is_match(url.as_str()) {
                return Err(Rejection::Excluded);
            }
        }

        if let Some(file_types) = &self.file_types {
            if !passes_file_types(url.path(), file_types) {
                return Err(Rejection::FileType);
            }
        }

        Ok(())
    }
}

fn passes_file_types(path: &str, file_types: &[String]) -> bool {
    let path = path.to_ascii_lowercase();
    let has_ext = |ext: &str| {
        path.strip_suffix(ext)
            .is_some_and(|head| head.ends_with('.'))
    };

    if file_types.iter().any(|ft| has_ext(ft)) {
        return true;
    }

    !RESOURCE_EXTENSIONS.iter().any(|ext| has_ext(ext))
}
