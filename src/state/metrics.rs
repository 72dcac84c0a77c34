//! Crawl counters and timestamps

use crate::state::CrawlPhase;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters recorded while a crawl runs
///
/// Mutated only under the shared crawl lock; read once when the result is
/// aggregated.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrawlMetrics {
    /// Pages fetched and extracted
    pub pages_crawled: usize,

    /// Pages skipped after a failed fetch or a bot challenge
    pub pages_failed: usize,

    /// Distinct URLs claimed by workers
    pub pages_visited: usize,

    /// Extra load attempts beyond the first, across all pages
    pub retry_count: usize,

    /// Pages that showed a CAPTCHA widget
    pub captcha_count: usize,

    /// Pages that answered with a block message or status
    pub blocked_count: usize,

    /// Sum of the main-text lengths of every extracted page
    pub total_text_extracted: usize,

    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Wall-clock crawl duration in seconds
    pub duration_secs: f64,

    /// Stop state that ended the crawl, once it has ended
    pub stop_reason: Option<CrawlPhase>,
}

impl CrawlMetrics {
    pub fn start(&mut self) {
        self.started_at = Some(Utc::now());
    }

    /// Records the end of the crawl and why it stopped
    pub fn finish(&mut self, reason: CrawlPhase) {
        let now = Utc::now();
        if let Some(started) = self.started_at {
            self.duration_secs = (now - started).num_milliseconds().max(0) as f64 / 1000.0;
        }
        self.finished_at = Some(now);
        self.stop_reason = Some(reason);
    }

    /// Average seconds per successfully crawled page
    pub fn avg_page_load_time(&self) -> f64 {
        self.duration_secs / self.pages_crawled.max(1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avg_page_load_time_without_pages() {
        let metrics = CrawlMetrics {
            duration_secs: 12.0,
            ..Default::default()
        };
        assert_eq!(metrics.avg_page_load_time(), 12.0);
    }

    #[test]
    fn test_avg_page_load_time() {
        let metrics = CrawlMetrics {
            duration_secs: 12.0,
            pages_crawled: 4,
            ..Default::default()
        };
        assert_eq!(metrics.avg_page_load_time(), 3.0);
    }

    #[test]
    fn test_finish_sets_reason_and_duration() {
        let mut metrics = CrawlMetrics::default();
        metrics.start();
        metrics.finish(CrawlPhase::Drained);

        assert_eq!(metrics.stop_reason, Some(CrawlPhase::Drained));
        assert!(metrics.finished_at.is_some());
        assert!(metrics.duration_secs >= 0.0);
    }
}
