//! Crawler module for page fetching and crawl coordination
//!
//! This module contains the core crawling logic, including:
//! - Page loading behind the [`PageLoader`] seam, in Chromium or over HTTP
//! - Fetching with stealth, retries and bot-challenge detection
//! - The priority frontier shared by all workers
//! - Overall crawl coordination and the single-page fallback

mod browser;
mod coordinator;
mod fallback;
mod fetcher;
mod frontier;
mod loader;
mod stealth;

pub use browser::{find_chrome, BrowserPageLoader};
pub use coordinator::{Coordinator, ProgressCallback};
pub use fallback::fallback_scrape;
pub use fetcher::{detect_challenge, Challenge, FetchOutcome, PageFetcher};
pub use frontier::{score_link, CrawlTask, FrontierQueue, Pop, TaskGuard, ROOT_PRIORITY};
pub use loader::{
    build_http_client, HttpPageLoader, LoadError, LoadOptions, LoadedPage, PageLoader, WaitUntil,
};
pub use stealth::{backoff, human_delay, mouse_path, StealthProfile};

use crate::config::{BrowserConfig, Config};
use crate::output::{CrawlResult, ResultSource};
use crate::url::normalize_url;
use crate::CrawlError;
use std::sync::Arc;

/// Opens the loader pages are crawled with
///
/// Launches Chromium when the browser is enabled. When it is disabled or
/// cannot be launched, pages are loaded over plain HTTP instead; the crawl
/// goes on either way. Call [`PageLoader::close`] when done.
pub async fn open_loader(config: &BrowserConfig) -> Arc<dyn PageLoader> {
    if !config.enabled {
        tracing::info!("Browser disabled, loading pages over HTTP");
        return Arc::new(HttpPageLoader::new());
    }

    match BrowserPageLoader::launch(config).await {
        Ok(loader) => Arc::new(loader),
        Err(e) => {
            tracing::warn!(error = %e, "Could not launch browser, loading pages over HTTP");
            Arc::new(HttpPageLoader::new())
        }
    }
}

/// Crawls a site with the default configuration
///
/// This is the main entry point for a one-off crawl. The budgets override
/// the defaults; each must be at least 1.
///
/// # Returns
///
/// * `Ok(CrawlResult)` - The crawl ran; check `success` for whether any page
///   was extracted
/// * `Err(CrawlError)` - The root URL or a budget was invalid
pub async fn crawl(
    root_url: &str,
    max_depth: u32,
    max_pages: usize,
    concurrency: usize,
    progress: Option<ProgressCallback>,
) -> Result<CrawlResult, CrawlError> {
    if max_depth == 0 || max_pages == 0 || concurrency == 0 {
        return Err(CrawlError::InvalidInput(format!(
            "max_depth, max_pages and concurrency must be positive (got {}, {}, {})",
            max_depth, max_pages, concurrency
        )));
    }

    normalize_url(root_url)?;

    let mut config = Config::default();
    config.crawler.max_depth = max_depth;
    config.crawler.max_pages = max_pages;
    config.crawler.concurrency = concurrency;

    let loader = open_loader(&config.browser).await;
    let result = coordinator(config, loader.clone(), progress).run(root_url).await;
    loader.close().await;
    result
}

/// Crawls a site, falling back to a plain scrape of the root page
///
/// Never fails; an unusable site yields `success == false` with the error
/// text.
pub async fn crawl_with_fallback(
    root_url: &str,
    config: Config,
    progress: Option<ProgressCallback>,
) -> CrawlResult {
    if let Err(e) = normalize_url(root_url) {
        return CrawlResult::failed(ResultSource::Fallback, format!("fallback scrape failed: {}", e));
    }

    let loader = open_loader(&config.browser).await;
    let result = coordinator(config, loader.clone(), progress)
        .run_with_fallback(root_url)
        .await;
    loader.close().await;
    result
}

fn coordinator(
    config: Config,
    loader: Arc<dyn PageLoader>,
    progress: Option<ProgressCallback>,
) -> Coordinator {
    let coordinator = Coordinator::new(config, loader);
    match progress {
        Some(progress) => coordinator.with_progress(progress),
        None => coordinator,
    }
}
