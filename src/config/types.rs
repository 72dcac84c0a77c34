use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for brand-crawler
///
/// Every section is optional in the TOML file; missing keys fall back to the
/// defaults documented on each field.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub fetcher: FetcherConfig,
    pub stealth: StealthConfig,
    pub browser: BrowserConfig,
}

/// Crawl budget and worker pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum link depth from the root page (root is depth 0)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of distinct URLs visited per crawl
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Number of concurrent workers
    pub concurrency: usize,

    /// Wall-clock bound for the whole crawl (seconds)
    #[serde(rename = "crawl-timeout-secs")]
    pub crawl_timeout_secs: u64,

    /// Wall-clock bound for a single page including retries (seconds)
    #[serde(rename = "page-deadline-secs")]
    pub page_deadline_secs: u64,

    /// How long an idle worker waits on the frontier before re-checking (milliseconds)
    #[serde(rename = "pop-timeout-ms")]
    pub pop_timeout_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 50,
            concurrency: 5,
            crawl_timeout_secs: 300,
            page_deadline_secs: 90,
            pop_timeout_ms: 2000,
        }
    }
}

/// Page load retry and bot-challenge timing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Number of load attempts before a page is skipped
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Timeout for the "network idle" load strategy (milliseconds)
    #[serde(rename = "network-idle-timeout-ms")]
    pub network_idle_timeout_ms: u64,

    /// Timeout for the "DOM content loaded" fallback strategy (milliseconds)
    #[serde(rename = "dom-loaded-timeout-ms")]
    pub dom_loaded_timeout_ms: u64,

    /// Backoff unit: attempt `n` waits `base * 2^n + jitter(0..base)` (milliseconds)
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Grace period granted to an interstitial challenge (milliseconds)
    #[serde(rename = "challenge-grace-ms")]
    pub challenge_grace_ms: u64,

    /// Lower bound of the random pre-extraction pause (milliseconds)
    #[serde(rename = "human-delay-min-ms")]
    pub human_delay_min_ms: u64,

    /// Upper bound of the random pre-extraction pause (milliseconds)
    #[serde(rename = "human-delay-max-ms")]
    pub human_delay_max_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            network_idle_timeout_ms: 20_000,
            dom_loaded_timeout_ms: 10_000,
            backoff_base_ms: 1000,
            challenge_grace_ms: 5000,
            human_delay_min_ms: 500,
            human_delay_max_ms: 1500,
        }
    }
}

/// Anti-detection pools sampled once per page
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StealthConfig {
    /// User-agent strings; one is picked at random for every page
    #[serde(rename = "user-agents")]
    pub user_agents: Vec<String>,

    /// Viewport sizes; one is picked at random for every page
    pub viewports: Vec<Viewport>,
}

impl Default for StealthConfig {
    fn default() -> Self {
        Self {
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15".to_string(),
            ],
            viewports: vec![
                Viewport::new(1920, 1080),
                Viewport::new(1366, 768),
                Viewport::new(1536, 864),
                Viewport::new(1440, 900),
            ],
        }
    }
}

/// Headless browser used to render pages
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Render pages in Chromium; when false, or when Chromium cannot be
    /// launched, pages are fetched over plain HTTP
    pub enabled: bool,

    /// Path to the Chrome or Chromium binary; searched for when unset
    #[serde(rename = "chrome-executable")]
    pub executable: Option<PathBuf>,

    /// Run without a window
    pub headless: bool,

    /// Extra command-line switches passed to the browser
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            executable: None,
            headless: true,
            args: Vec::new(),
        }
    }
}

/// Browser viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}
