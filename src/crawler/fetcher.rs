//! Page fetcher
//!
//! This module wraps a [`PageLoader`] with the crawl's fetch policy:
//! - Randomized user agent and viewport per page
//! - Retries of transient failures with exponential backoff
//! - A faster load strategy on the final attempt
//! - Bot-challenge, CAPTCHA and block detection
//! - A short randomized pause before the page is handed to extraction
//!
//! # Failure Handling
//!
//! | Condition | Action |
//! |-----------|--------|
//! | Timeout / network error / HTTP 5xx | Retry with backoff up to `max-retries` |
//! | HTTP 403 / 429 | Immediate → blocked |
//! | Other HTTP 4xx | Immediate → failed |
//! | Non-HTML content | Immediate → failed |
//! | Interstitial challenge | Grace wait, one reload, still challenged → failed |
//! | CAPTCHA widget | Immediate → failed, counted |
//! | Block phrase in page | Immediate → failed, counted |

use crate::config::{FetcherConfig, StealthConfig};
use crate::crawler::loader::{LoadError, LoadOptions, LoadedPage, PageLoader, WaitUntil};
use crate::crawler::stealth::{backoff, human_delay, StealthProfile};
use crate::extract::dom::{collapse_whitespace, inner_text};
use scraper::{Html, Selector};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Interstitial wording, matched against rendered text only
const CHALLENGE_TEXT: &[&str] = &["checking your browser", "verifying you are human"];

/// Title of Cloudflare's interstitial page
const CHALLENGE_TITLE: &str = "just a moment...";

const BLOCK_PHRASES: &[&str] = &["access denied", "403 forbidden", "too many requests"];

static CHALLENGE_ELEMENTS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("#challenge-running, #challenge-form, #cf-challenge-running, .cf-browser-verification")
        .expect("challenge selector should compile")
});

static CAPTCHA_ELEMENTS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"iframe[src*="recaptcha"], iframe[src*="hcaptcha"], .g-recaptcha, .h-captcha"#)
        .expect("captcha selector should compile")
});

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("title selector should compile"));

/// Bot-protection signal found on a loaded page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Challenge {
    #[default]
    None,
    /// Interstitial "checking your browser" page
    Challenge,
    Captcha,
    /// Explicit refusal, by status code or page text
    Blocked,
}

/// Inspects a page for bot-protection signals
///
/// Checked in priority order: interstitial challenge, then CAPTCHA, then
/// block phrases. Only rendered text and challenge markup count, so vendor
/// scripts injected into ordinary pages are not mistaken for a challenge.
pub fn detect_challenge(html: &str) -> Challenge {
    let doc = Html::parse_document(html);
    let title = doc
        .select(&TITLE)
        .next()
        .map(|t| collapse_whitespace(&t.text().collect::<String>()).to_lowercase())
        .unwrap_or_default();
    let text = inner_text(&doc.root_element()).to_lowercase();

    if doc.select(&CHALLENGE_ELEMENTS).next().is_some()
        || title == CHALLENGE_TITLE
        || CHALLENGE_TEXT.iter().any(|m| text.contains(m))
    {
        Challenge::Challenge
    } else if doc.select(&CAPTCHA_ELEMENTS).next().is_some() {
        Challenge::Captcha
    } else if BLOCK_PHRASES
        .iter()
        .any(|m| text.contains(m) || title.contains(m))
    {
        Challenge::Blocked
    } else {
        Challenge::None
    }
}

/// Result of fetching one page
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// The loaded page, if the fetch succeeded
    pub page: Option<LoadedPage>,
    pub challenge: Challenge,
    /// Load attempts made, including a post-challenge reload
    pub attempts: u32,
    /// Last failure, for logging
    pub error: Option<String>,
}

impl FetchOutcome {
    pub fn ok(&self) -> bool {
        self.page.is_some()
    }

    /// Attempts beyond the first
    pub fn retries(&self) -> usize {
        self.attempts.saturating_sub(1) as usize
    }

    pub(crate) fn failed(attempts: u32, challenge: Challenge, error: impl Into<String>) -> Self {
        Self {
            page: None,
            challenge,
            attempts,
            error: Some(error.into()),
        }
    }
}

/// Loads pages with retries, stealth and bot detection
pub struct PageFetcher {
    loader: Arc<dyn PageLoader>,
    config: FetcherConfig,
    stealth: StealthConfig,
}

impl PageFetcher {
    pub fn new(loader: Arc<dyn PageLoader>, config: FetcherConfig, stealth: StealthConfig) -> Self {
        Self {
            loader,
            config,
            stealth,
        }
    }

    /// Fetches `url`, never returning an error
    ///
    /// A failed fetch is reported through [`FetchOutcome::page`] being `None`.
    ///
    /// # Arguments
    ///
    /// * `url` - The page to load
    /// * `cancel` - Stops retries and pauses early when cancelled
    ///
    /// # Returns
    ///
    /// A [`FetchOutcome`] with the loaded page or the last error, the number
    /// of attempts made and any bot challenge that was seen.
    pub async fn fetch(&self, url: &Url, cancel: &CancellationToken) -> FetchOutcome {
        let profile = StealthProfile::sample(&self.stealth);
        let max_attempts = self.config.max_retries.max(1);
        let mut attempts = 0;

        loop {
            let options = self.options_for(attempts, max_attempts, &profile);
            attempts += 1;

            match self.load(url, &options, cancel).await {
                Ok(page) => return self.inspect(url, page, &options, attempts, cancel).await,
                Err(e) if e.is_block() => {
                    tracing::info!(url = %url, error = %e, "Page refused access");
                    return FetchOutcome::failed(attempts, Challenge::Blocked, e.to_string());
                }
                Err(e) if e.is_transient() && attempts < max_attempts => {
                    let wait = backoff(&self.config, attempts - 1);
                    tracing::warn!(
                        url = %url,
                        attempt = attempts,
                        error = %e,
                        "Load failed, retrying in {:?}",
                        wait
                    );
                    if !self.pause(wait, cancel).await {
                        return FetchOutcome::failed(attempts, Challenge::None, "cancelled");
                    }
                }
                Err(e) => {
                    tracing::warn!(url = %url, attempts, error = %e, "Giving up on page");
                    return FetchOutcome::failed(attempts, Challenge::None, e.to_string());
                }
            }
        }
    }

    /// Load options for the attempt numbered `attempt` (0-based)
    ///
    /// A retried page switches to the DOM-loaded strategy on its last attempt.
    fn options_for(&self, attempt: u32, max_attempts: u32, profile: &StealthProfile) -> LoadOptions {
        let is_last_retry = attempt > 0 && attempt + 1 == max_attempts;
        let (wait_until, timeout_ms) = if is_last_retry {
            (WaitUntil::DomContentLoaded, self.config.dom_loaded_timeout_ms)
        } else {
            (WaitUntil::NetworkIdle, self.config.network_idle_timeout_ms)
        };
        LoadOptions {
            wait_until,
            timeout: Duration::from_millis(timeout_ms),
            user_agent: profile.user_agent.clone(),
            viewport: profile.viewport,
        }
    }

    /// One bounded, cancellable load
    async fn load(
        &self,
        url: &Url,
        options: &LoadOptions,
        cancel: &CancellationToken,
    ) -> Result<LoadedPage, LoadError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LoadError::Cancelled),
            result = tokio::time::timeout(options.timeout, self.loader.load(url, options)) => {
                result.unwrap_or(Err(LoadError::Timeout(options.timeout)))
            }
        }
    }

    /// Applies bot detection to a loaded page
    async fn inspect(
        &self,
        url: &Url,
        mut page: LoadedPage,
        options: &LoadOptions,
        mut attempts: u32,
        cancel: &CancellationToken,
    ) -> FetchOutcome {
        let mut challenge = detect_challenge(&page.html);

        if challenge == Challenge::Challenge {
            tracing::info!(url = %url, "Interstitial challenge, waiting before reload");
            if !self
                .pause(Duration::from_millis(self.config.challenge_grace_ms), cancel)
                .await
            {
                return FetchOutcome::failed(attempts, challenge, "cancelled");
            }

            attempts += 1;
            match self.load(url, options, cancel).await {
                Ok(reloaded) => {
                    challenge = detect_challenge(&reloaded.html);
                    page = reloaded;
                }
                Err(e) => return FetchOutcome::failed(attempts, challenge, e.to_string()),
            }
        }

        match challenge {
            Challenge::None => {}
            Challenge::Challenge => {
                tracing::warn!(url = %url, "Challenge persisted after reload");
                return FetchOutcome::failed(attempts, challenge, "bot challenge not cleared");
            }
            Challenge::Captcha => {
                tracing::warn!(url = %url, "CAPTCHA detected, skipping page");
                return FetchOutcome::failed(attempts, challenge, "captcha");
            }
            Challenge::Blocked => {
                tracing::warn!(url = %url, "Block message detected, skipping page");
                return FetchOutcome::failed(attempts, challenge, "blocked");
            }
        }

        if !self.pause(human_delay(&self.config), cancel).await {
            return FetchOutcome::failed(attempts, Challenge::None, "cancelled");
        }

        FetchOutcome {
            page: Some(page),
            challenge: Challenge::None,
            attempts,
            error: None,
        }
    }

    /// Sleeps unless cancelled first; returns false on cancellation
    async fn pause(&self, duration: Duration, cancel: &CancellationToken) -> bool {
        if duration.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed sequence of load results
    struct Scripted {
        results: Mutex<VecDeque<Result<String, LoadError>>>,
        seen: Mutex<Vec<WaitUntil>>,
    }

    impl Scripted {
        fn new(results: Vec<Result<&str, LoadError>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(
                    results
                        .into_iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl PageLoader for Scripted {
        async fn load(&self, url: &Url, options: &LoadOptions) -> Result<LoadedPage, LoadError> {
            self.seen.lock().unwrap().push(options.wait_until);
            let next = self.results.lock().unwrap().pop_front();
            match next {
                Some(Ok(html)) => Ok(LoadedPage {
                    final_url: url.clone(),
                    status: 200,
                    html,
                }),
                Some(Err(e)) => Err(e),
                None => Err(LoadError::Network("script exhausted".to_string())),
            }
        }
    }

    fn fast_config() -> FetcherConfig {
        FetcherConfig {
            max_retries: 3,
            backoff_base_ms: 1,
            challenge_grace_ms: 1,
            human_delay_min_ms: 0,
            human_delay_max_ms: 0,
            ..Default::default()
        }
    }

    fn fetcher(loader: Arc<Scripted>) -> PageFetcher {
        PageFetcher::new(loader, fast_config(), StealthConfig::default())
    }

    fn url() -> Url {
        Url::parse("https://brand.com/").unwrap()
    }

    fn timeout() -> LoadError {
        LoadError::Timeout(Duration::from_secs(20))
    }

    #[test]
    fn test_detect_challenge_priority() {
        assert_eq!(detect_challenge("<p>Welcome</p>"), Challenge::None);
        assert_eq!(
            detect_challenge("<p>Checking your browser before accessing</p>"),
            Challenge::Challenge
        );
        assert_eq!(
            detect_challenge(r#"<div class="g-recaptcha"></div> Access denied"#),
            Challenge::Captcha
        );
        assert_eq!(detect_challenge("<h1>403 Forbidden</h1>"), Challenge::Blocked);
        assert_eq!(
            detect_challenge("Verifying you are human. Access denied"),
            Challenge::Challenge
        );
    }

    #[test]
    fn test_vendor_scripts_on_normal_page() {
        let html = r#"<html><head><title>Glow Serum</title>
            <script src="https://www.google.com/recaptcha/api.js?render=site-key"></script>
            </head><body><main><p>Real product page</p></main>
            <script>var msg = "access denied";</script>
            <script src="/cdn-cgi/challenge-platform/scripts/jsd/main.js"></script>
            </body></html>"#;
        assert_eq!(detect_challenge(html), Challenge::None);
    }

    #[test]
    fn test_challenge_markup_and_title() {
        assert_eq!(
            detect_challenge(r#"<body><div id="challenge-running"></div></body>"#),
            Challenge::Challenge
        );
        assert_eq!(
            detect_challenge("<html><head><title>Just a moment...</title></head><body></body></html>"),
            Challenge::Challenge
        );
        assert_eq!(
            detect_challenge(r#"<body><iframe src="https://newassets.hcaptcha.com/captcha/v1"></iframe></body>"#),
            Challenge::Captcha
        );
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let loader = Scripted::new(vec![Ok("<p>Hi</p>")]);
        let outcome = fetcher(loader.clone()).fetch(&url(), &CancellationToken::new()).await;

        assert!(outcome.ok());
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.retries(), 0);
        assert_eq!(*loader.seen.lock().unwrap(), vec![WaitUntil::NetworkIdle]);
    }

    #[tokio::test]
    async fn test_retries_then_dom_loaded_on_last_attempt() {
        let loader = Scripted::new(vec![Err(timeout()), Err(timeout()), Ok("<p>Hi</p>")]);
        let outcome = fetcher(loader.clone()).fetch(&url(), &CancellationToken::new()).await;

        assert!(outcome.ok());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(
            *loader.seen.lock().unwrap(),
            vec![
                WaitUntil::NetworkIdle,
                WaitUntil::NetworkIdle,
                WaitUntil::DomContentLoaded
            ]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let loader = Scripted::new(vec![Err(timeout()), Err(timeout()), Err(timeout()), Ok("late")]);
        let outcome = fetcher(loader).fetch(&url(), &CancellationToken::new()).await;

        assert!(!outcome.ok());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.challenge, Challenge::None);
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let loader = Scripted::new(vec![Err(LoadError::Http(404)), Ok("<p>Hi</p>")]);
        let outcome = fetcher(loader).fetch(&url(), &CancellationToken::new()).await;

        assert!(!outcome.ok());
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn test_rate_limit_is_blocked() {
        let loader = Scripted::new(vec![Err(LoadError::Http(429))]);
        let outcome = fetcher(loader).fetch(&url(), &CancellationToken::new()).await;

        assert!(!outcome.ok());
        assert_eq!(outcome.challenge, Challenge::Blocked);
    }

    #[tokio::test]
    async fn test_captcha_not_retried() {
        let loader = Scripted::new(vec![Ok(r#"<iframe src="https://www.google.com/recaptcha/api2"></iframe>"#)]);
        let outcome = fetcher(loader).fetch(&url(), &CancellationToken::new()).await;

        assert!(!outcome.ok());
        assert_eq!(outcome.challenge, Challenge::Captcha);
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn test_challenge_cleared_after_reload() {
        let loader = Scripted::new(vec![Ok("Checking your browser..."), Ok("<p>Real page</p>")]);
        let outcome = fetcher(loader).fetch(&url(), &CancellationToken::new()).await;

        assert!(outcome.ok());
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.page.unwrap().html, "<p>Real page</p>");
    }

    #[tokio::test]
    async fn test_challenge_persisting_fails() {
        let loader = Scripted::new(vec![
            Ok("Checking your browser..."),
            Ok("Checking your browser..."),
            Ok("<p>Never reached</p>"),
        ]);
        let outcome = fetcher(loader).fetch(&url(), &CancellationToken::new()).await;

        assert!(!outcome.ok());
        assert_eq!(outcome.challenge, Challenge::Challenge);
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_load() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let loader = Scripted::new(vec![Ok("<p>Hi</p>")]);
        let outcome = fetcher(loader).fetch(&url(), &cancel).await;

        assert!(!outcome.ok());
        assert_eq!(outcome.attempts, 1);
    }
}
