use crate::url::NormalizedUrl;
use crate::ConfigError;

/// Host half of a [`DomainPattern`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRule {
    /// Matches exactly one host
    ExactHost(String),
    /// Matches the base host and every subdomain of it
    AnySubdomainOf(String),
}

impl HostRule {
    /// Returns true if `host` satisfies this rule
    pub fn matches(&self, host: &str) -> bool {
        match self {
            Self::ExactHost(expected) => matches_wildcard(expected, host),
            Self::AnySubdomainOf(base) => matches_wildcard(&format!("*.{}", base), host),
        }
    }
}

/// Path half of a [`DomainPattern`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRule {
    /// Matches every path (`/*` or no path given)
    Any,
    /// Matches the prefix itself and anything below it (`/docs/*`)
    Prefix(String),
    /// Matches any path starting with the string (`/doc*`)
    RawPrefix(String),
    /// Matches only this path
    Exact(String),
}

impl PathRule {
    /// Returns true if `path` satisfies this rule
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Prefix(prefix) => {
                // Segment-aware: `/docs` covers `/docs` and `/docs/...`, not `/docsx`
                path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            Self::RawPrefix(prefix) => path.starts_with(prefix.as_str()),
            Self::Exact(expected) => path == expected,
        }
    }
}

/// A compiled domain/path restriction such as `https://*.example.com/docs/*`
///
/// Patterns are immutable once compiled. One instance exists per active
/// restriction: the on-site rule synthesized from the seed host, and the
/// force-domain rule compiled from the user pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainPattern {
    pub host_rule: HostRule,
    pub path_rule: PathRule,
}

impl DomainPattern {
    /// Compiles a pattern of shape `scheme://host/path*`
    ///
    /// The scheme is optional (`example.com/docs/*` is accepted) and, when
    /// present, must be `http` or `https`; it does not take part in matching.
    ///
    /// # Examples
    ///
    /// ```
    /// use wayfinder::url::{normalize_url, DomainPattern};
    ///
    /// let pattern = DomainPattern::compile("https://*.example.com/docs/*").unwrap();
    /// let inside = normalize_url("https://api.example.com/docs/v2", None).unwrap();
    /// let outside = normalize_url("https://api.example.com/blog", None).unwrap();
    /// assert!(pattern.matches(&inside));
    /// assert!(!pattern.matches(&outside));
    /// ```
    pub fn compile(pattern: &str) -> Result<Self, ConfigError> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::InvalidPattern(
                "Domain pattern cannot be empty".to_string(),
            ));
        }

        let rest = match trimmed.split_once("://") {
            Some((scheme, rest)) => {
                let scheme = scheme.to_ascii_lowercase();
                if scheme != "http" && scheme != "https" {
                    return Err(ConfigError::InvalidPattern(format!(
                        "Pattern '{}' must use http or https, got '{}'",
                        pattern, scheme
                    )));
                }
                rest
            }
            None => trimmed,
        };

        let (host, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };

        let host = host.to_ascii_lowercase();
        let host_rule = match host.strip_prefix("*.") {
            Some(base) => {
                validate_host(base, pattern)?;
                HostRule::AnySubdomainOf(base.to_string())
            }
            None => {
                validate_host(&host, pattern)?;
                HostRule::ExactHost(host)
            }
        };

        Ok(Self {
            host_rule,
            path_rule: compile_path(path, pattern)?,
        })
    }

    /// Builds the implicit on-site rule for a seed host: exact host, any path
    pub fn on_site(host: &str) -> Self {
        Self {
            host_rule: HostRule::ExactHost(host.to_ascii_lowercase()),
            path_rule: PathRule::Any,
        }
    }

    /// Returns true if the URL satisfies both the host and the path rule
    pub fn matches(&self, url: &NormalizedUrl) -> bool {
        self.host_rule.matches(url.host()) && self.path_rule.matches(url.path())
    }
}

fn compile_path(path: &str, pattern: &str) -> Result<PathRule, ConfigError> {
    if path.is_empty() || path == "/" || path == "/*" {
        return Ok(PathRule::Any);
    }

    let (body, wildcard) = match path.strip_suffix('*') {
        Some(body) => (body, true),
        None => (path, false),
    };

    if body.contains('*') {
        return Err(ConfigError::InvalidPattern(format!(
            "Pattern '{}' may only use '*' at the end of the path",
            pattern
        )));
    }

    if !wildcard {
        // Same trailing-slash rule as URL normalization
        let exact = body.trim_end_matches('/');
        return Ok(PathRule::Exact(if exact.is_empty() {
            "/".to_string()
        } else {
            exact.to_string()
        }));
    }

    match body.strip_suffix('/') {
        Some(prefix) => Ok(PathRule::Prefix(prefix.to_string())),
        None => Ok(PathRule::RawPrefix(body.to_string())),
    }
}

/// Validates a host string (without wildcard prefix)
fn validate_host(host: &str, pattern: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::InvalidPattern(format!(
            "Pattern '{}' has an empty host",
            pattern
        )));
    }

    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' in pattern '{}' contains invalid characters",
            host, pattern
        )));
    }

    if host.starts_with('.')
        || host.ends_with('.')
        || host.starts_with('-')
        || host.ends_with('-')
        || host.contains("..")
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' in pattern '{}' is malformed",
            host, pattern
        )));
    }

    Ok(())
}

/// Checks if a host matches a wildcard pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Wildcard match: "*.example.com" matches:
///    - "example.com" (the bare domain)
///    - "blog.example.com" (single subdomain)
///    - "api.v2.example.com" (nested subdomains)
///
/// # Examples
///
/// ```
/// use wayfinder::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(!matches_wildcard("example.com", "other.com"));
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "myexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base
            || candidate
                .strip_suffix(base)
                .is_some_and(|head| head.ends_with('.'))
    } else {
        candidate == pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::normalize_url;

    fn url(raw: &str) -> NormalizedUrl {
        normalize_url(raw, None).unwrap()
    }

    #[test]
    fn test_wildcard_exact_match() {
        assert!(matches_wildcard("example.com", "example.com"));
        assert!(!matches_wildcard("example.com", "blog.example.com"));
        assert!(!matches_wildcard("blog.example.com", "example.com"));
    }

    #[test]
    fn test_wildcard_matches_bare_and_nested() {
        assert!(matches_wildcard("*.example.com", "example.com"));
        assert!(matches_wildcard("*.example.com", "blog.example.com"));
        assert!(matches_wildcard("*.example.com", "deep.nested.sub.example.com"));
    }

    #[test]
    fn test_wildcard_no_match_partial() {
        assert!(!matches_wildcard("*.example.com", "myexample.com"));
        assert!(!matches_wildcard("*.example.com", "example.com.org"));
        assert!(!matches_wildcard("*.example.com", ""));
    }

    #[test]
    fn test_compile_bare_host() {
        let pattern = DomainPattern::compile("example.com").unwrap();
        assert_eq!(pattern.host_rule, HostRule::ExactHost("example.com".to_string()));
        assert_eq!(pattern.path_rule, PathRule::Any);
    }

    #[test]
    fn test_compile_any_path_forms() {
        for raw in ["https://example.com", "https://example.com/", "https://example.com/*"] {
            let pattern = DomainPattern::compile(raw).unwrap();
            assert_eq!(pattern.path_rule, PathRule::Any, "for {}", raw);
        }
    }

    #[test]
    fn test_compile_subdomain_wildcard() {
        let pattern = DomainPattern::compile("https://*.Example.com/*").unwrap();
        assert_eq!(
            pattern.host_rule,
            HostRule::AnySubdomainOf("example.com".to_string())
        );
        assert!(pattern.matches(&url("https://example.com/")));
        assert!(pattern.matches(&url("https://a.b.example.com/x")));
        assert!(!pattern.matches(&url("https://badexample.com/x")));
    }

    #[test]
    fn test_prefix_path() {
        let pattern = DomainPattern::compile("https://example.com/docs/*").unwrap();
        assert_eq!(pattern.path_rule, PathRule::Prefix("/docs".to_string()));

        assert!(pattern.matches(&url("https://example.com/docs")));
        assert!(pattern.matches(&url("https://example.com/docs/")));
        assert!(pattern.matches(&url("https://example.com/docs/install/linux")));
        assert!(!pattern.matches(&url("https://example.com/docsx")));
        assert!(!pattern.matches(&url("https://example.com/")));
        assert!(!pattern.matches(&url("https://other.com/docs/a")));
    }

    #[test]
    fn test_raw_prefix_path() {
        let pattern = DomainPattern::compile("example.com/doc*").unwrap();
        assert_eq!(pattern.path_rule, PathRule::RawPrefix("/doc".to_string()));
        assert!(pattern.matches(&url("https://example.com/doc/a")));
        assert!(pattern.matches(&url("https://example.com/documents")));
        assert!(pattern.matches(&url("https://example.com/doc")));
        assert!(!pattern.matches(&url("https://example.com/blog")));
    }

    #[test]
    fn test_exact_path() {
        let pattern = DomainPattern::compile("https://example.com/docs/").unwrap();
        assert_eq!(pattern.path_rule, PathRule::Exact("/docs".to_string()));
        assert!(pattern.matches(&url("https://example.com/docs")));
        assert!(!pattern.matches(&url("https://example.com/docs/a")));
    }

    #[test]
    fn test_scheme_is_ignored_for_matching() {
        let pattern = DomainPattern::compile("https://example.com/*").unwrap();
        assert!(pattern.matches(&url("http://example.com/a")));
    }

    #[test]
    fn test_on_site() {
        let pattern = DomainPattern::on_site("A.com");
        assert!(pattern.matches(&url("https://a.com/anything")));
        assert!(!pattern.matches(&url("https://b.com/")));
        assert!(!pattern.matches(&url("https://sub.a.com/")));
    }

    #[test]
    fn test_invalid_patterns() {
        for raw in [
            "",
            "   ",
            "ftp://example.com/*",
            "https:///docs/*",
            "https://*./*",
            "https://exa*mple.com/",
            "https://example.com/a*/b",
            "https://.example.com/",
            "https://example..com/",
            "https://exam ple.com/",
        ] {
            let result = DomainPattern::compile(raw);
            assert!(
                matches!(result, Err(ConfigError::InvalidPattern(_))),
                "expected InvalidPattern for {:?}",
                raw
            );
        }
    }
}
