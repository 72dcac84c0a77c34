//! Shared crawl state guarded by a single lock
//!
//! Workers share one [`SharedCrawlState`]. The visited set, the collected
//! page data and the metrics live behind the same mutex so that claiming a
//! URL and merging a page are atomic with respect to each other.

use crate::extract::{PageRecord, PageType};
use crate::state::CrawlMetrics;
use std::collections::HashSet;
use tokio::sync::{Mutex, MutexGuard};

pub const MAX_TEXT_BUFFER: usize = 2_000_000;
pub const MAX_NAV_BUFFER: usize = 50_000;
pub const MAX_REVIEWS_BUFFER: usize = 100_000;
pub const MAX_LEGAL_BUFFER: usize = 50_000;
pub const MAX_ABOUT_BUFFER: usize = 50_000;

/// Every page record plus the free-text buffers built from them
///
/// Only ever appended to. Buffers stop growing once they reach their cap.
#[derive(Debug, Clone, Default)]
pub struct CollectedData {
    pub pages: Vec<PageRecord>,
    pub text: String,
    pub nav_text: String,
    pub reviews_text: String,
    pub legal_text: String,
    pub about_text: String,
}

impl CollectedData {
    /// Takes ownership of a page record and appends its text to the buffers
    ///
    /// Legal pages feed only the legal buffer. Navigation and footer text
    /// repeated on every page is appended once.
    pub fn merge(&mut self, record: PageRecord) {
        if record.page_type == PageType::Legal {
            append_capped(&mut self.legal_text, &record.text, MAX_LEGAL_BUFFER);
        } else if !record.text.is_empty() {
            let section = format!("\n\n=== PAGE: {} ===\n{}\n", record.url, record.text);
            append_capped(&mut self.text, &section, MAX_TEXT_BUFFER);
        }

        if record.page_type == PageType::About {
            append_capped(&mut self.about_text, &record.text, MAX_ABOUT_BUFFER);
        }

        if !self.nav_text.contains(&record.nav_text) {
            append_capped(&mut self.nav_text, &record.nav_text, MAX_NAV_BUFFER);
        }
        if !self.legal_text.contains(&record.legal_footer) {
            append_capped(&mut self.legal_text, &record.legal_footer, MAX_LEGAL_BUFFER);
        }
        append_capped(&mut self.reviews_text, &record.reviews_text, MAX_REVIEWS_BUFFER);

        self.pages.push(record);
    }
}

/// Appends `text` followed by a space, never growing past `max` characters
fn append_capped(buffer: &mut String, text: &str, max: usize) {
    if text.is_empty() {
        return;
    }
    let used = buffer.chars().count();
    if used >= max {
        return;
    }
    buffer.extend(text.chars().take(max - used));
    if buffer.chars().count() < max {
        buffer.push(' ');
    }
}

/// Outcome of trying to claim a URL for fetching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The caller now owns the fetch of this URL
    Claimed,
    AlreadyVisited,
    BudgetExhausted,
}

/// Everything the workers mutate
#[derive(Debug, Default)]
pub struct CrawlState {
    pub visited: HashSet<String>,
    pub data: CollectedData,
    pub metrics: CrawlMetrics,
}

impl CrawlState {
    /// True if `key` may still be queued: not yet visited and budget left
    pub fn can_enqueue(&self, key: &str, max_pages: usize) -> bool {
        self.visited.len() < max_pages && !self.visited.contains(key)
    }
}

/// The single lock-protected aggregate shared by all workers
#[derive(Debug, Default)]
pub struct SharedCrawlState {
    inner: Mutex<CrawlState>,
}

impl SharedCrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the state for a compound read-modify-write
    pub async fn lock(&self) -> MutexGuard<'_, CrawlState> {
        self.inner.lock().await
    }

    /// Marks `key` visited unless it already is or the budget is spent
    ///
    /// This is the only way a URL enters the visited set, so at most one
    /// worker ever fetches a given URL.
    pub async fn try_claim(&self, key: &str, max_pages: usize) -> Claim {
        let mut state = self.inner.lock().await;
        if state.visited.contains(key) {
            return Claim::AlreadyVisited;
        }
        if state.visited.len() >= max_pages {
            return Claim::BudgetExhausted;
        }
        state.visited.insert(key.to_string());
        state.metrics.pages_visited = state.visited.len();
        Claim::Claimed
    }

    pub async fn visited_count(&self) -> usize {
        self.inner.lock().await.visited.len()
    }

    /// Merges a successfully extracted page and counts it
    ///
    /// Returns the visited count at the time of the merge.
    pub async fn record_page(&self, record: PageRecord, retries: usize) -> usize {
        let mut state = self.inner.lock().await;
        state.metrics.pages_crawled += 1;
        state.metrics.retry_count += retries;
        state.metrics.total_text_extracted += record.text.chars().count();
        state.data.merge(record);
        state.visited.len()
    }

    /// Counts a page that could not be fetched
    pub async fn record_failure(&self, retries: usize, captcha: bool, blocked: bool) {
        let mut state = self.inner.lock().await;
        state.metrics.pages_failed += 1;
        state.metrics.retry_count += retries;
        if captcha {
            state.metrics.captcha_count += 1;
        }
        if blocked {
            state.metrics.blocked_count += 1;
        }
    }

    /// Takes the collected data and metrics out, leaving the state empty
    pub async fn take(&self) -> (CollectedData, CrawlMetrics) {
        let mut state = self.inner.lock().await;
        (
            std::mem::take(&mut state.data),
            std::mem::take(&mut state.metrics),
        )
    }
}
