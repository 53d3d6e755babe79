//! Link scoring ("smart stop-on")
//!
//! Ranks a candidate link by its estimated proximity to the stop target. The
//! rules are additive; only an exact target match short-circuits.

use crate::url::NormalizedUrl;

/// Candidate is the stop target itself
pub const SCORE_EXACT_TARGET: i32 = 1000;
/// Candidate path contains the target path
pub const SCORE_TARGET_PATH: i32 = 100;
/// Candidate is on the target host
pub const SCORE_TARGET_HOST: i32 = 50;
/// Candidate is on the host of the page it was found on
pub const SCORE_CURRENT_HOST: i32 = 5;
/// Candidate path looks like a low-value page
pub const SCORE_LOW_VALUE: i32 = -10;

/// Path keywords of pages that rarely lead anywhere
const LOW_VALUE_KEYWORDS: &[&str] = &["about", "terms", "privacy", "contact"];

/// Computes the priority of `candidate`, found on `current_page`
///
/// Without a target only the current-host and low-value rules apply, so
/// scores collapse to a handful of values and the frontier's sequence
/// tie-break makes the crawl breadth-first. The result may be negative.
///
/// | Condition | Contribution |
/// |-----------|--------------|
/// | candidate == target | +1000, nothing else evaluated |
/// | path(candidate) contains path(target) | +100 |
/// | host(candidate) == host(target) | +50 |
/// | host(candidate) == host(current_page) | +5 |
/// | path contains about/terms/privacy/contact | -10 |
pub fn score_link(
    candidate: &NormalizedUrl,
    current_page: &NormalizedUrl,
    target: Option<&NormalizedUrl>,
) -> i32 {
    let mut score = 0;

    if let Some(target) = target {
        if candidate == target {
            return SCORE_EXACT_TARGET;
        }
        if candidate.path().contains(target.path()) {
            score += SCORE_TARGET_PATH;
        }
        if candidate.host() == target.host() {
            score += SCORE_TARGET_HOST;
        }
    }

    if candidate.host() == current_page.host() {
        score += SCORE_CURRENT_HOST;
    }

    if is_low_value(candidate.path()) {
        score += SCORE_LOW_VALUE;
    }

    score
}

fn is_low_value(path: &str) -> bool {
    let path = path.to_ascii_lowercase();
    LOW_VALUE_KEYWORDS.iter().any(|keyword| path.contains(keyword))
}
