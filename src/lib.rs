//! brand-crawler: a concurrent brand-intelligence site crawler
//!
//! This crate crawls a single e-commerce site with a bounded pool of workers,
//! extracts brand signals (logos, colors, hero copy, FAQs, pricing, structured
//! data and more) from every page, and merges them into one capped
//! [`CrawlResult`] for downstream brand analysis.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for brand-crawler operations
///
/// Page-level problems never surface here: they are absorbed by the
/// coordinator and reported through [`CrawlResult::success`] and the metrics.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Page load failed: {0}")]
    Load(#[from] crawler::LoadError),

    #[error("Invalid crawl input: {0}")]
    InvalidInput(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for brand-crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, crawl_with_fallback, open_loader, Coordinator, ProgressCallback};
pub use extract::{PageExtractor, PageRecord, PageType};
pub use output::{aggregate, CrawlResult};
pub use state::{CollectedData, CrawlMetrics, CrawlPhase};
pub use url::{netloc, normalize_url};
