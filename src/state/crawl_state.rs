/// Crawl state definitions
///
/// This module defines every state a crawl can be in and the transitions allowed
/// between them.
use serde::Serialize;
use std::fmt;

/// Represents the current state of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlState {
    // ===== Active States =====
    /// Created, configuration not yet validated
    Idle,

    /// Configuration validated, pages are being fetched
    Running,

    // ===== Terminal States =====
    /// The frontier ran dry
    Completed,

    /// The stop target was fetched
    StoppedByTarget,

    /// `max_pages` pages were fetched
    StoppedByBudget,

    /// An operator interrupt or an injected script asked the crawl to stop
    StoppedByExternalSignal,

    /// The primary seed could not be fetched
    Failed,
}

impl CrawlState {
    /// Returns true if this is a terminal state
    ///
    /// Terminal states are final: no transition ever leaves them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Idle | Self::Running)
    }

    /// Returns true if this terminal state represents a deliberate stop
    pub fn is_stopped(&self) -> bool {
        matches!(
            self,
            Self::StoppedByTarget | Self::StoppedByBudget | Self::StoppedByExternalSignal
        )
    }

    /// Returns true if the state machine may move from `self` to `next`
    ///
    /// Allowed moves are `Idle -> Running`, `Idle -> Failed` and
    /// `Running -> <any terminal state>`.
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        match self {
            Self::Idle => matches!(next, Self::Running | Self::Failed),
            Self::Running => next.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::StoppedByTarget => "stopped_by_target",
            Self::StoppedByBudget => "stopped_by_budget",
            Self::StoppedByExternalSignal => "stopped_by_external_signal",
            Self::Failed => "failed",
        }
    }

    /// Parses a state from its string representation
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn from_name(s: &str) -> Option<Self> {
        Self::all_states().into_iter().find(|state| state.as_str() == s)
    }

    /// Returns all possible crawl states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Idle,
            Self::Running,
            Self::Completed,
            Self::StoppedByTarget,
            Self::StoppedByBudget,
            Self::StoppedByExternalSignal,
            Self::Failed,
        ]
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
