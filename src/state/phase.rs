/// Crawl lifecycle states
///
/// A crawl moves `Init -> Running -> {Drained | BudgetExhausted | TimedOut | Cancelled} -> Done`.
/// The intermediate stop state is kept as the crawl's stop reason.
use serde::Serialize;
use std::fmt;

/// Represents the current phase of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlPhase {
    /// Frontier seeded, workers not yet started
    Init,

    /// Workers are popping and fetching
    Running,

    // ===== Stop States =====
    /// The frontier emptied with no fetch in flight
    Drained,

    /// The page budget was reached
    BudgetExhausted,

    /// The crawl-wide wall-clock timeout expired
    TimedOut,

    /// The caller cancelled the crawl
    Cancelled,

    /// Result aggregated
    Done,
}

impl CrawlPhase {
    /// Returns true if workers have stopped
    pub fn is_stopped(&self) -> bool {
        !matches!(self, Self::Init | Self::Running)
    }

    /// Returns true if this phase ends a running crawl
    pub fn is_stop_reason(&self) -> bool {
        matches!(
            self,
            Self::Drained | Self::BudgetExhausted | Self::TimedOut | Self::Cancelled
        )
    }

    /// Returns true if `next` is a legal successor of this phase
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        match self {
            Self::Init => next == Self::Running,
            Self::Running => next.is_stop_reason(),
            Self::Drained | Self::BudgetExhausted | Self::TimedOut | Self::Cancelled => {
                next == Self::Done
            }
            Self::Done => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Running => "running",
            Self::Drained => "drained",
            Self::BudgetExhausted => "budget_exhausted",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
