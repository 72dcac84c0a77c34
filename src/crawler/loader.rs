//! Page loading seam
//!
//! The fetcher talks to pages only through [`PageLoader`], so the retry and
//! bot-detection policy is independent of how a page is actually loaded.
//! [`BrowserPageLoader`](crate::crawler::BrowserPageLoader) renders pages in
//! Chromium; [`HttpPageLoader`] is the plain-request loader used when no
//! browser is available and for the fallback scrape. Tests script their own.

use crate::config::Viewport;
use async_trait::async_trait;
use reqwest::{header, redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// When a load is considered complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// Wait until the network has been quiet; the thorough default
    NetworkIdle,
    /// Return as soon as the document is parsed; the final-attempt fallback
    DomContentLoaded,
}

/// Parameters for one load attempt
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub wait_until: WaitUntil,
    pub timeout: Duration,
    pub user_agent: String,
    pub viewport: Viewport,
}

/// A successfully loaded HTML document
#[derive(Debug, Clone)]
pub struct LoadedPage {
    /// URL after redirects
    pub final_url: Url,
    pub status: u16,
    pub html: String,
}

/// Why a load attempt failed
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Load timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    Http(u16),

    #[error("Expected HTML, got {0}")]
    ContentMismatch(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Load cancelled")]
    Cancelled,
}

impl LoadError {
    /// True if another attempt may succeed
    ///
    /// Timeouts, network and browser errors and 5xx responses are
    /// transient. Client errors, non-HTML content and cancellation are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Network(_) | Self::Browser(_) => true,
            Self::Http(status) => *status >= 500,
            Self::ContentMismatch(_) | Self::Cancelled => false,
        }
    }

    /// True if the site refused us outright (403 or 429)
    pub fn is_block(&self) -> bool {
        matches!(self, Self::Http(403) | Self::Http(429))
    }
}

/// Loads one page in an isolated context
#[async_trait]
pub trait PageLoader: Send + Sync {
    async fn load(&self, url: &Url, options: &LoadOptions) -> Result<LoadedPage, LoadError>;

    /// Releases whatever the loader holds open; loads after this fail
    async fn close(&self) {}
}

/// Plain HTTP loader
///
/// Every load builds a fresh client, so no cookies or connections are shared
/// between pages. Sub-resources are never requested; image URLs are read from
/// the markup only.
#[derive(Debug, Clone, Default)]
pub struct HttpPageLoader;

impl HttpPageLoader {
    pub fn new() -> Self {
        Self
    }
}

/// Builds an HTTP client for a single page load
pub fn build_http_client(options: &LoadOptions) -> Result<Client, reqwest::Error> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header::HeaderValue::from_static("en-US,en;q=0.9"),
    );
    // viewport client hint, the closest HTTP has to a window size
    headers.insert(
        header::HeaderName::from_static("viewport-width"),
        header::HeaderValue::from(options.viewport.width),
    );

    Client::builder()
        .user_agent(options.user_agent.as_str())
        .default_headers(headers)
        .timeout(options.timeout)
        .connect_timeout(options.timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

#[async_trait]
impl PageLoader for HttpPageLoader {
    async fn load(&self, url: &Url, options: &LoadOptions) -> Result<LoadedPage, LoadError> {
        let client = build_http_client(options).map_err(|e| LoadError::Network(e.to_string()))?;

        let response = client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e, options.timeout))?;

        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Err(LoadError::Http(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.is_empty() && !content_type.contains("html") {
            return Err(LoadError::ContentMismatch(content_type));
        }

        let html = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(e, options.timeout))?;

        tracing::trace!(url = %url, status = status.as_u16(), bytes = html.len(), "Loaded page");

        Ok(LoadedPage {
            final_url,
            status: status.as_u16(),
            html,
        })
    }
}

fn classify_reqwest_error(e: reqwest::Error, timeout: Duration) -> LoadError {
    if e.is_timeout() {
        LoadError::Timeout(timeout)
    } else {
        LoadError::Network(e.to_string())
    }
}
