//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: The crawl lifecycle (init, running, stop reasons, done)
//! - `CrawlMetrics`: Counters and timestamps reported with the result
//! - `SharedCrawlState`: Visited set, collected page data and metrics behind one lock

mod metrics;
mod phase;
mod shared;

// Re-export main types
pub use metrics::CrawlMetrics;
pub use phase::CrawlPhase;
pub use shared::{
    Claim, CollectedData, CrawlState, SharedCrawlState, MAX_ABOUT_BUFFER, MAX_LEGAL_BUFFER,
    MAX_NAV_BUFFER, MAX_REVIEWS_BUFFER, MAX_TEXT_BUFFER,
};
