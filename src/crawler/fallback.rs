//! Single-page fallback scrape
//!
//! When the crawl cannot extract anything, the root page is loaded once more
//! through the coordinator's fallback loader, a plain HTTP request by
//! default: no stealth, no retries, no bot detection. The page
//! goes through the same extractor and aggregator so callers get the usual
//! result shape, marked with [`ResultSource::Fallback`].

use crate::config::Config;
use crate::crawler::coordinator::Coordinator;
use crate::crawler::loader::{LoadOptions, PageLoader, WaitUntil};
use crate::crawler::stealth::{FALLBACK_USER_AGENT, FALLBACK_VIEWPORT};
use crate::extract::PageExtractor;
use crate::output::{aggregate, CrawlResult, ResultSource};
use crate::state::{CollectedData, CrawlMetrics, CrawlPhase};
use crate::url::normalize_url;
use crate::CrawlError;
use std::time::Duration;

impl Coordinator {
    /// Runs the crawl, falling back to a single-page scrape if it fails
    ///
    /// The fallback runs when the crawl returns an error or extracts no page.
    /// A cancelled crawl is returned as is.
    pub async fn run_with_fallback(&self, root_url: &str) -> CrawlResult {
        let failure = match self.run(root_url).await {
            Ok(result) if result.success => return result,
            Ok(result) if self.cancellation_token().is_cancelled() => return result,
            Ok(result) => result.error.unwrap_or_default(),
            Err(e) => e.to_string(),
        };

        tracing::warn!(root = root_url, error = %failure, "Crawl failed, trying fallback scrape");
        fallback_scrape(self.fallback_loader(), self.config(), root_url).await
    }
}

/// Loads and extracts only the root page
///
/// Never fails: a load error becomes an unsuccessful result carrying the
/// error text.
pub async fn fallback_scrape(loader: &dyn PageLoader, config: &Config, root_url: &str) -> CrawlResult {
    match scrape_root(loader, config, root_url).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(root = root_url, error = %e, "Fallback scrape failed");
            CrawlResult::failed(ResultSource::Fallback, format!("fallback scrape failed: {}", e))
        }
    }
}

async fn scrape_root(
    loader: &dyn PageLoader,
    config: &Config,
    root_url: &str,
) -> Result<CrawlResult, CrawlError> {
    let root = normalize_url(root_url)?;

    let options = LoadOptions {
        wait_until: WaitUntil::NetworkIdle,
        timeout: Duration::from_millis(config.fetcher.network_idle_timeout_ms),
        user_agent: config
            .stealth
            .user_agents
            .first()
            .cloned()
            .unwrap_or_else(|| FALLBACK_USER_AGENT.to_string()),
        viewport: config
            .stealth
            .viewports
            .first()
            .copied()
            .unwrap_or(FALLBACK_VIEWPORT),
    };

    let mut metrics = CrawlMetrics::default();
    metrics.start();
    metrics.pages_visited = 1;

    let page = loader.load(&root, &options).await?;
    let record =
        PageExtractor::new(root.clone()).extract_document(&page.html, &root, &page.final_url, 0);

    metrics.pages_crawled = 1;
    metrics.total_text_extracted = record.text.chars().count();

    let mut data = CollectedData::default();
    data.merge(record);
    metrics.finish(CrawlPhase::Drained);

    let mut result = aggregate(&data, &metrics);
    result.source = ResultSource::Fallback;

    tracing::info!(root = %root, chars = result.char_count, "Fallback scrape succeeded");
    Ok(result)
}
