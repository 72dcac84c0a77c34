//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the worker pool that drives a crawl, including:
//! - Seeding the frontier with the root page
//! - Running a fixed number of workers that pop, fetch, extract and enqueue
//! - Enforcing the page budget, depth limit and same-site confinement
//! - Stopping on drain, budget, crawl timeout or cancellation
//! - Aggregating whatever was collected into the final result
//!
//! # Concurrency
//!
//! Workers share one [`SharedCrawlState`] and one [`FrontierQueue`]. When
//! both are needed the state lock is taken first. A URL is fetched only by
//! the worker that claimed it in the visited set, so no page is fetched
//! twice.

use crate::config::{validate, Config};
use crate::crawler::fetcher::{Challenge, FetchOutcome, PageFetcher};
use crate::crawler::frontier::{score_link, CrawlTask, FrontierQueue, Pop, ROOT_PRIORITY};
use crate::crawler::loader::{HttpPageLoader, PageLoader};
use crate::extract::{Link, PageExtractor};
use crate::output::{aggregate, CrawlResult};
use crate::state::{Claim, CrawlPhase, SharedCrawlState};
use crate::url::{is_same_site, netloc, normalize_url};
use crate::{CrawlError, UrlError};
use futures::FutureExt;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Called after every extracted page with `(pages_visited, max_pages, url)`
pub type ProgressCallback = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

/// How long stopped workers get to finish before they are aborted
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Links to files the extractor cannot use
const SKIPPED_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".zip", ".mp4", ".mp3",
];

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    loader: Arc<dyn PageLoader>,
    fallback_loader: Arc<dyn PageLoader>,
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a coordinator that loads pages through `loader`
    pub fn new(config: Config, loader: Arc<dyn PageLoader>) -> Self {
        Self {
            config: Arc::new(config),
            loader,
            fallback_loader: Arc::new(HttpPageLoader::new()),
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Loads the root through `loader` when the fallback scrape runs
    pub fn with_fallback_loader(mut self, loader: Arc<dyn PageLoader>) -> Self {
        self.fallback_loader = loader;
        self
    }

    /// Uses `token` to cancel the crawl instead of a private one
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops a running crawl when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn fallback_loader(&self) -> &dyn PageLoader {
        self.fallback_loader.as_ref()
    }

    /// Crawls the site rooted at `root_url`
    ///
    /// Returns `Err` only for invalid input. Page failures, timeouts and
    /// cancellation all produce `Ok` with whatever was collected; a crawl
    /// that extracted nothing has `success == false` and an error message.
    pub async fn run(&self, root_url: &str) -> Result<CrawlResult, CrawlError> {
        validate(&self.config)?;
        let root = normalize_url(root_url)?;
        let site = netloc(&root).ok_or(UrlError::MissingDomain)?;
        let limits = &self.config.crawler;

        tracing::info!(
            root = %root,
            max_depth = limits.max_depth,
            max_pages = limits.max_pages,
            concurrency = limits.concurrency,
            "Starting crawl"
        );

        let ctx = Arc::new(WorkerContext {
            config: self.config.clone(),
            site,
            state: SharedCrawlState::new(),
            frontier: FrontierQueue::new(),
            fetcher: PageFetcher::new(
                self.loader.clone(),
                self.config.fetcher.clone(),
                self.config.stealth.clone(),
            ),
            extractor: PageExtractor::new(root.clone()),
            progress: self.progress.clone(),
            cancel: self.cancel.child_token(),
        });

        ctx.state.lock().await.metrics.start();
        ctx.frontier
            .push(CrawlTask {
                url: root.clone(),
                depth: 0,
                priority: ROOT_PRIORITY,
            })
            .await;

        let mut phase = CrawlPhase::Init;
        transition(&mut phase, CrawlPhase::Running);

        let mut workers = JoinSet::new();
        for id in 0..limits.concurrency {
            let ctx = ctx.clone();
            workers.spawn(async move { ctx.worker(id).await });
        }

        let stopped_by = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Some(CrawlPhase::Cancelled),
            _ = tokio::time::sleep(Duration::from_secs(limits.crawl_timeout_secs)) => {
                Some(CrawlPhase::TimedOut)
            }
            _ = join_workers(&mut workers) => None,
        };

        if let Some(reason) = stopped_by {
            tracing::warn!(reason = %reason, "Stopping workers early");
            ctx.cancel.cancel();
            ctx.frontier.close().await;
            if tokio::time::timeout(SHUTDOWN_GRACE, join_workers(&mut workers))
                .await
                .is_err()
            {
                tracing::warn!("Workers did not stop in time, aborting them");
                workers.shutdown().await;
            }
        }

        let reason = match stopped_by {
            Some(reason) => reason,
            None if self.cancel.is_cancelled() => CrawlPhase::Cancelled,
            None if ctx.state.visited_count().await >= limits.max_pages => {
                CrawlPhase::BudgetExhausted
            }
            None => CrawlPhase::Drained,
        };
        transition(&mut phase, reason);

        let (data, mut metrics) = ctx.state.take().await;
        metrics.finish(reason);

        let mut result = aggregate(&data, &metrics);
        if !result.success {
            result.error = Some(format!("no page could be crawled from {} ({})", root, reason));
        }

        tracing::info!(
            pages_crawled = metrics.pages_crawled,
            pages_failed = metrics.pages_failed,
            retries = metrics.retry_count,
            captcha = metrics.captcha_count,
            blocked = metrics.blocked_count,
            duration_secs = metrics.duration_secs,
            stop_reason = %reason,
            "Crawl finished"
        );

        transition(&mut phase, CrawlPhase::Done);
        Ok(result)
    }
}

fn transition(phase: &mut CrawlPhase, next: CrawlPhase) {
    if phase.can_transition_to(next) {
        tracing::debug!(from = %phase, to = %next, "Crawl phase change");
        *phase = next;
    } else {
        tracing::error!(from = %phase, to = %next, "Invalid crawl phase change");
    }
}

/// Waits for every worker, logging any that panicked
async fn join_workers(workers: &mut JoinSet<()>) {
    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            if e.is_panic() {
                tracing::error!("Worker task panicked: {}", e);
            }
        }
    }
}

/// Everything a worker needs, shared by the whole pool
struct WorkerContext {
    config: Arc<Config>,
    site: String,
    state: SharedCrawlState,
    frontier: FrontierQueue,
    fetcher: PageFetcher,
    extractor: PageExtractor,
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
}

impl WorkerContext {
    async fn worker(&self, id: usize) {
        let wait = Duration::from_millis(self.config.crawler.pop_timeout_ms);
        tracing::trace!(worker = id, "Worker started");

        loop {
            let popped = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                popped = self.frontier.pop(wait) => popped,
            };

            match popped {
                Pop::Task(guard) => {
                    let processed = AssertUnwindSafe(self.process(&guard.task))
                        .catch_unwind()
                        .await;
                    if processed.is_err() {
                        tracing::error!(worker = id, url = %guard.task.url, "Worker panicked on page");
                        self.state.record_failure(0, false, false).await;
                    }
                }
                Pop::Idle => continue,
                Pop::Drained | Pop::Closed => break,
            }
        }

        tracing::trace!(worker = id, "Worker exiting");
    }

    /// Fetches, extracts and expands one task
    async fn process(&self, task: &CrawlTask) {
        let limits = &self.config.crawler;

        if !is_same_site(&task.url, &self.site) {
            tracing::debug!(url = %task.url, "Skipping off-site URL");
            return;
        }

        match self.state.try_claim(task.url.as_str(), limits.max_pages).await {
            Claim::Claimed => {}
            Claim::AlreadyVisited => return,
            Claim::BudgetExhausted => {
                self.frontier.close().await;
                return;
            }
        }

        tracing::debug!(
            url = %task.url,
            depth = task.depth,
            priority = task.priority,
            "Fetching page"
        );

        let deadline = Duration::from_secs(limits.page_deadline_secs);
        let outcome =
            match tokio::time::timeout(deadline, self.fetcher.fetch(&task.url, &self.cancel)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(url = %task.url, "Page deadline of {:?} exceeded", deadline);
                    FetchOutcome::failed(1, Challenge::None, "page deadline exceeded")
                }
            };

        let retries = outcome.retries();
        let challenge = outcome.challenge;
        let Some(page) = outcome.page else {
            if self.cancel.is_cancelled() {
                return;
            }
            tracing::info!(
                url = %task.url,
                error = outcome.error.as_deref().unwrap_or("unknown"),
                "Page failed"
            );
            self.state
                .record_failure(
                    retries,
                    challenge == Challenge::Captcha,
                    challenge == Challenge::Blocked,
                )
                .await;
            return;
        };

        if !is_same_site(&page.final_url, &self.site) {
            tracing::info!(url = %task.url, final_url = %page.final_url, "Redirected off-site");
            self.state.record_failure(retries, false, false).await;
            return;
        }

        let record = self
            .extractor
            .extract_document(&page.html, &task.url, &page.final_url, task.depth);
        let links = if task.depth < limits.max_depth {
            record.links.clone()
        } else {
            Vec::new()
        };
        let parent_bonus = i64::from(record.page_type.value_score()) / 10;

        let visited = self.state.record_page(record, retries).await;
        if let Some(progress) = &self.progress {
            progress(visited, limits.max_pages, task.url.as_str());
        }

        if visited >= limits.max_pages {
            self.frontier.close().await;
            return;
        }

        self.enqueue(&links, task.depth + 1, parent_bonus).await;
    }

    /// Scores and queues same-site links not yet visited
    async fn enqueue(&self, links: &[Link], depth: u32, parent_bonus: i64) {
        let max_pages = self.config.crawler.max_pages;
        let mut tasks = Vec::new();

        {
            let state = self.state.lock().await;
            let mut seen = HashSet::new();
            for link in links {
                let Ok(url) = normalize_url(&link.url) else {
                    continue;
                };
                if !is_same_site(&url, &self.site)
                    || is_skipped_file(&url)
                    || !state.can_enqueue(url.as_str(), max_pages)
                    || !seen.insert(url.as_str().to_string())
                {
                    continue;
                }
                let priority = score_link(url.as_str(), &link.text) + parent_bonus;
                tasks.push(CrawlTask {
                    url,
                    depth,
                    priority,
                });
            }
        }

        let count = tasks.len();
        for task in tasks {
            if !self.frontier.push(task).await {
                break;
            }
        }
        tracing::trace!(count, depth, "Queued links");
    }
}

fn is_skipped_file(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    SKIPPED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
