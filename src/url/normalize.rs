use crate::UrlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::{ParseError, Url};

/// A URL in canonical form
///
/// This is the only identity key used by the crawl: two addresses are the
/// same page exactly when their normalized forms are equal. Instances can only
/// be obtained through [`normalize_url`], so every value upholds the
/// normalization rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NormalizedUrl(Url);

impl NormalizedUrl {
    /// Returns the canonical string form
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the underlying parsed URL
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns the lowercase host
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    /// Returns the path, always starting with `/`
    pub fn path(&self) -> &str {
        self.0.path()
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for NormalizedUrl {
    type Error = UrlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        normalize_url(&value, None)
    }
}

impl From<NormalizedUrl> for String {
    fn from(url: NormalizedUrl) -> Self {
        url.0.into()
    }
}

/// Normalizes a URL according to Wayfinder's normalization rules
///
/// # Normalization Steps
///
/// 1. Resolve `raw` against `base` when one is given, otherwise parse it as
///    an absolute URL
/// 2. Reject anything that is not `http` or `https`, or has no host
/// 3. Lowercase scheme and host, drop default ports (80/443)
/// 4. Collapse duplicate slashes and dot segments in the path
/// 5. Remove trailing slash (except for root /)
/// 6. Remove fragment (everything after #)
///
/// The query string is kept verbatim; parameter order is significant.
///
/// # Examples
///
/// ```
/// use wayfinder::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.COM:80//docs//intro/#top", None).unwrap();
/// assert_eq!(url.as_str(), "http://example.com/docs/intro");
///
/// let next = normalize_url("../faq?b=2&a=1", Some(&url)).unwrap();
/// assert_eq!(next.as_str(), "http://example.com/faq?b=2&a=1");
/// ```
pub fn normalize_url(raw: &str, base: Option<&NormalizedUrl>) -> Result<NormalizedUrl, UrlError> {
    let raw = raw.trim();

    // Step 1: Parse or resolve
    let parsed = match base {
        Some(base) => base.as_url().join(raw),
        None => Url::parse(raw),
    };
    canonicalize(parsed.map_err(|e| parse_error(raw, e))?)
}

/// Resolves a link found on a page against the address the page was served from
///
/// Unlike a [`NormalizedUrl`] base, `page` keeps its trailing slash, so
/// `intro` found on `https://a.com/docs/` resolves to
/// `https://a.com/docs/intro`.
pub fn resolve_link(raw: &str, page: &Url) -> Result<NormalizedUrl, UrlError> {
    let raw = raw.trim();
    canonicalize(page.join(raw).map_err(|e| parse_error(raw, e))?)
}

fn parse_error(raw: &str, error: ParseError) -> UrlError {
    match error {
        ParseError::RelativeUrlWithoutBase => UrlError::RelativeWithoutBase(raw.to_string()),
        other => UrlError::Parse(format!("{}: {}", raw, other)),
    }
}

/// Applies steps 2 to 6 to a parsed URL
fn canonicalize(mut url: Url) -> Result<NormalizedUrl, UrlError> {
    // Step 2: Validate scheme and host
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingHost),
    }

    // Step 3 is performed by the parser for special schemes: the scheme and
    // domain are lowercased and a port equal to the scheme default is dropped.

    // Steps 4 & 5: Normalize path
    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    // Step 6: Remove fragment
    url.set_fragment(None);

    Ok(NormalizedUrl(url))
}

/// Normalizes a URL path by removing empty/dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            // Skip empty segments (from multiple slashes) and current directory markers
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}
