//! Human-readable crawl summary
//!
//! This module condenses a [`CrawlResult`] into the handful of numbers an
//! operator wants to see after a run.

use crate::extract::PageType;
use crate::output::CrawlResult;
use std::collections::HashMap;
use std::fmt::Write;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Distinct URLs claimed by workers
    pub pages_visited: usize,

    /// Pages fetched and extracted
    pub pages_crawled: usize,

    /// Pages that could not be fetched
    pub pages_failed: usize,

    /// Count of extracted pages by page type
    pub pages_by_type: HashMap<PageType, usize>,

    pub retry_count: usize,
    pub captcha_count: usize,
    pub blocked_count: usize,
    pub duration_secs: f64,
    pub avg_page_load_time: f64,

    /// Terminal crawl state, if the crawl ran
    pub stop_reason: Option<String>,

    /// Which path produced the result
    pub source: String,

    pub error: Option<String>,
}

impl CrawlStatistics {
    pub fn from_result(result: &CrawlResult) -> Self {
        let mut pages_by_type = HashMap::new();
        for page in &result.pages {
            *pages_by_type.entry(page.page_type).or_insert(0) += 1;
        }

        let metrics = &result.metrics.crawl;
        Self {
            pages_visited: metrics.pages_visited,
            pages_crawled: result.pages_crawled,
            pages_failed: metrics.pages_failed,
            pages_by_type,
            retry_count: metrics.retry_count,
            captcha_count: metrics.captcha_count,
            blocked_count: metrics.blocked_count,
            duration_secs: metrics.duration_secs,
            avg_page_load_time: result.metrics.avg_page_load_time,
            stop_reason: metrics.stop_reason.map(|r| r.to_string()),
            source: format!("{:?}", result.source).to_lowercase(),
            error: result.error.clone(),
        }
    }

    /// Percentage of attempted pages that were extracted
    pub fn success_rate(&self) -> f64 {
        let attempted = self.pages_crawled + self.pages_failed;
        if attempted > 0 {
            (self.pages_crawled as f64 / attempted as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Renders statistics as the multi-line summary printed by the CLI
pub fn format_statistics(stats: &CrawlStatistics) -> String {
    let mut out = String::new();
    // writing to a String cannot fail
    let _ = write_statistics(&mut out, stats);
    out
}

fn write_statistics(out: &mut String, stats: &CrawlStatistics) -> std::fmt::Result {
    writeln!(out, "=== Crawl Statistics ===\n")?;

    writeln!(out, "Overview:")?;
    writeln!(out, "  Source: {}", stats.source)?;
    writeln!(out, "  Pages visited: {}", stats.pages_visited)?;
    writeln!(out, "  Pages crawled: {}", stats.pages_crawled)?;
    writeln!(out, "  Pages failed: {}", stats.pages_failed)?;
    writeln!(out, "  Duration: {:.1}s ({:.2}s per page)", stats.duration_secs, stats.avg_page_load_time)?;
    if let Some(reason) = &stats.stop_reason {
        writeln!(out, "  Stopped: {}", reason)?;
    }
    writeln!(out)?;

    if !stats.pages_by_type.is_empty() {
        writeln!(out, "Pages by Type:")?;
        // Sort types by count (descending), then name for stable output
        let mut type_counts: Vec<_> = stats.pages_by_type.iter().collect();
        type_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));

        for (page_type, count) in type_counts {
            writeln!(out, "  {}: {}", page_type, count)?;
        }
        writeln!(out)?;
    }

    if stats.retry_count + stats.captcha_count + stats.blocked_count > 0 {
        writeln!(out, "Fetch Problems:")?;
        writeln!(out, "  Retries: {}", stats.retry_count)?;
        writeln!(out, "  CAPTCHA pages: {}", stats.captcha_count)?;
        writeln!(out, "  Blocked pages: {}", stats.blocked_count)?;
        writeln!(out)?;
    }

    if let Some(error) = &stats.error {
        writeln!(out, "Error: {}", error)?;
        writeln!(out)?;
    }

    write!(
        out,
        "Success Rate: {:.1}% ({} / {} pages successfully extracted)",
        stats.success_rate(),
        stats.pages_crawled,
        stats.pages_crawled + stats.pages_failed
    )
}

/// Prints statistics to stderr, leaving stdout for the JSON result
pub fn print_statistics(stats: &CrawlStatistics) {
    eprintln!("{}", format_statistics(stats));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::PageSummary;
    use crate::state::CrawlPhase;

    fn summary(url: &str, page_type: PageType) -> PageSummary {
        PageSummary {
            url: url.to_string(),
            title: String::new(),
            page_type,
            depth: 0,
            char_count: 0,
            validation_score: 1.0,
        }
    }

    #[test]
    fn test_statistics_from_result() {
        let mut result = CrawlResult {
            success: true,
            pages_crawled: 3,
            pages: vec![
                summary("https://brand.com/", PageType::Home),
                summary("https://brand.com/shoes", PageType::Product),
                summary("https://brand.com/boots", PageType::Product),
            ],
            ..Default::default()
        };
        result.metrics.crawl.pages_failed = 1;
        result.metrics.crawl.pages_visited = 4;
        result.metrics.crawl.stop_reason = Some(CrawlPhase::Drained);

        let stats = CrawlStatistics::from_result(&result);
        assert_eq!(stats.pages_by_type[&PageType::Product], 2);
        assert_eq!(stats.pages_visited, 4);
        assert_eq!(stats.stop_reason.as_deref(), Some("drained"));
        assert_eq!(stats.source, "crawler");
        assert!((stats.success_rate() - 75.0).abs() < 1e-9);

        let text = format_statistics(&stats);
        assert!(text.contains("Pages crawled: 3"));
        assert!(text.contains("  product: 2\n  home: 1"));
        assert!(text.contains("Success Rate: 75.0% (3 / 4 pages"));
        assert!(!text.contains("Fetch Problems"));
    }

    #[test]
    fn test_success_rate_without_pages() {
        let stats = CrawlStatistics::from_result(&CrawlResult::default());
        assert_eq!(stats.success_rate(), 0.0);
    }
}
