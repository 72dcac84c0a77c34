//! Chromium page loader
//!
//! Renders pages in a shared headless Chromium over CDP. Every load runs in
//! its own browser context, so no cookies, storage or cache leak between
//! pages, and emulates the sampled user agent and viewport. Images,
//! stylesheets, fonts and media are refused before they hit the network.
//!
//! Without the `browser` feature only a stub is compiled; launching it
//! always fails and callers fall back to [`HttpPageLoader`].
//!
//! [`HttpPageLoader`]: crate::crawler::HttpPageLoader

use crate::config::BrowserConfig;
use crate::crawler::loader::{LoadError, LoadOptions, LoadedPage, PageLoader, WaitUntil};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use url::Url;

#[cfg(feature = "browser")]
use {
    crate::crawler::stealth::mouse_path,
    chromiumoxide::browser::{Browser, BrowserConfig as LaunchConfig},
    chromiumoxide::cdp::browser_protocol::browser::BrowserContextId,
    chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams,
    chromiumoxide::cdp::browser_protocol::fetch::{
        self, EventRequestPaused, FailRequestParams, RequestPattern, RequestStage,
    },
    chromiumoxide::cdp::browser_protocol::input::{
        DispatchMouseEventParams, DispatchMouseEventType,
    },
    chromiumoxide::cdp::browser_protocol::network::{
        self, ErrorReason, EventResponseReceived, ResourceType, SetUserAgentOverrideParams,
    },
    chromiumoxide::cdp::browser_protocol::page::{
        EventLifecycleEvent, NavigateParams, SetLifecycleEventsEnabledParams,
    },
    chromiumoxide::cdp::browser_protocol::target::{
        CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
    },
    chromiumoxide::error::CdpError,
    chromiumoxide::Page,
    futures::{FutureExt, StreamExt},
    std::sync::Arc,
    tokio::runtime::Handle,
    tokio::sync::Mutex,
    tokio::task::JoinHandle,
};

/// Well-known install locations, checked before `PATH`
const CHROME_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/opt/google/chrome/google-chrome",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

const CHROME_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

/// Switches that keep headless Chromium quiet and less obviously automated
#[cfg(feature = "browser")]
const LAUNCH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--disable-dev-shm-usage",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-background-networking",
    "--disable-sync",
    "--disable-translate",
    "--no-sandbox",
    "--disable-gpu",
];

/// Records the rendered box of every image and inline SVG as attributes,
/// so logo prominence can use the laid-out size
#[cfg(feature = "browser")]
const MEASURE_SCRIPT: &str = r#"(() => {
    let measured = 0;
    for (const el of document.querySelectorAll('img, svg')) {
        const rect = el.getBoundingClientRect();
        el.setAttribute('data-rendered-width', Math.round(rect.width));
        el.setAttribute('data-rendered-height', Math.round(rect.height));
        measured += 1;
    }
    return measured;
})()"#;

/// Locates a Chrome or Chromium binary
pub fn find_chrome() -> Option<PathBuf> {
    if let Some(path) = CHROME_PATHS.iter().map(Path::new).find(|p| p.is_file()) {
        return Some(path.to_path_buf());
    }
    find_on_path(CHROME_COMMANDS, &std::env::var_os("PATH")?)
}

/// First of `names` present as a file in one of the `path_var` directories
fn find_on_path(names: &[&str], path_var: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path_var).find_map(|dir| {
        names
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

/// The lifecycle event that completes a load
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn lifecycle_milestone(wait_until: WaitUntil) -> &'static str {
    match wait_until {
        WaitUntil::NetworkIdle => "networkIdle",
        WaitUntil::DomContentLoaded => "DOMContentLoaded",
    }
}

/// Checks the main document response the browser received
///
/// Error statuses and non-HTML documents fail the load the same way they do
/// over plain HTTP.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn check_document(status: i64, mime_type: &str) -> Result<u16, LoadError> {
    let status = u16::try_from(status).unwrap_or(0);
    if status >= 400 {
        return Err(LoadError::Http(status));
    }
    if !mime_type.is_empty() && !mime_type.contains("html") {
        return Err(LoadError::ContentMismatch(mime_type.to_string()));
    }
    Ok(status)
}

/// Loads pages in headless Chromium
#[cfg(feature = "browser")]
pub struct BrowserPageLoader {
    browser: Arc<Mutex<Browser>>,
    handler: JoinHandle<()>,
}

#[cfg(feature = "browser")]
impl BrowserPageLoader {
    /// Launches Chromium with the configured executable and switches
    ///
    /// # Arguments
    ///
    /// * `config` - The `[browser]` section; `executable` is searched for
    ///   when unset
    ///
    /// # Returns
    ///
    /// * `Ok(BrowserPageLoader)` - A running browser ready for loads
    /// * `Err(LoadError::Browser)` - No binary was found or it failed to start
    pub async fn launch(config: &BrowserConfig) -> Result<Self, LoadError> {
        let executable = match &config.executable {
            Some(path) => path.clone(),
            None => find_chrome().ok_or_else(|| {
                LoadError::Browser(
                    "Chrome/Chromium not found; set chrome-executable in [browser]".to_string(),
                )
            })?,
        };

        tracing::info!(
            executable = %executable.display(),
            headless = config.headless,
            "Launching browser"
        );

        let mut builder = LaunchConfig::builder().chrome_executable(executable);
        if !config.headless {
            builder = builder.with_head();
        }
        for arg in LAUNCH_ARGS.iter().map(|a| a.to_string()).chain(config.args.iter().cloned()) {
            builder = builder.arg(arg);
        }
        let launch = builder.build().map_err(LoadError::Browser)?;

        let (browser, mut handler) = Browser::launch(launch).await.map_err(browser_error)?;

        // the connection only makes progress while its handler is polled
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!(error = %e, "Browser handler event error");
                }
            }
        });

        Ok(Self {
            browser: Arc::new(Mutex::new(browser)),
            handler,
        })
    }

    /// Opens a blank page in a fresh browser context
    async fn open_session(&self) -> Result<Session, LoadError> {
        let browser = self.browser.lock().await;
        let context = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(browser_error)?
            .result
            .browser_context_id;

        let mut session = Session {
            page: None,
            context: Some(context.clone()),
            browser: self.browser.clone(),
            tasks: Vec::new(),
            runtime: Handle::current(),
        };

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context)
            .build()
            .map_err(LoadError::Browser)?;
        session.page = Some(browser.new_page(target).await.map_err(browser_error)?);
        Ok(session)
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl PageLoader for BrowserPageLoader {
    async fn load(&self, url: &Url, options: &LoadOptions) -> Result<LoadedPage, LoadError> {
        let mut session = self.open_session().await?;
        let page = session.page()?.clone();

        page.execute(SetUserAgentOverrideParams::new(options.user_agent.clone()))
            .await
            .map_err(browser_error)?;
        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(options.viewport.width),
            i64::from(options.viewport.height),
            1.0,
            false,
        ))
        .await
        .map_err(browser_error)?;

        let blocker = block_subresources(&page).await?;
        session.tasks.push(blocker);

        page.execute(network::EnableParams::default())
            .await
            .map_err(browser_error)?;
        page.execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .map_err(browser_error)?;
        let mut lifecycle = page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(browser_error)?;
        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(browser_error)?;

        let nav = page
            .execute(NavigateParams::new(url.as_str()))
            .await
            .map_err(browser_error)?
            .result;
        if let Some(error) = nav.error_text {
            return Err(LoadError::Network(error));
        }

        let milestone = lifecycle_milestone(options.wait_until);
        let mut reached = false;
        while let Some(event) = lifecycle.next().await {
            let same_load = match &nav.loader_id {
                Some(loader) => *loader == event.loader_id,
                None => true,
            };
            if event.frame_id == nav.frame_id && same_load && event.name == milestone {
                reached = true;
                break;
            }
        }
        if !reached {
            return Err(LoadError::Browser(format!(
                "page closed before {}",
                milestone
            )));
        }

        // responses arrive before the milestone, so they are already buffered
        let mut document = None;
        while let Some(Some(event)) = responses.next().now_or_never() {
            let same_load = nav.loader_id.as_ref().map_or(true, |l| *l == event.loader_id);
            if event.r#type == ResourceType::Document && same_load {
                document = Some((event.response.status, event.response.mime_type.clone()));
            }
        }
        let status = match document {
            Some((status, mime_type)) => check_document(status, &mime_type)?,
            None => 200,
        };

        for (x, y) in mouse_path(options.viewport) {
            page.execute(DispatchMouseEventParams::new(
                DispatchMouseEventType::MouseMoved,
                x,
                y,
            ))
            .await
            .map_err(browser_error)?;
        }

        if let Err(e) = page.evaluate(MEASURE_SCRIPT).await {
            tracing::debug!(url = %url, error = %e, "Could not measure page images");
        }

        let html = page.content().await.map_err(browser_error)?;
        let final_url = page
            .url()
            .await
            .map_err(browser_error)?
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| url.clone());

        tracing::trace!(
            url = %url,
            final_url = %final_url,
            status,
            bytes = html.len(),
            "Rendered page"
        );

        session.close().await;
        Ok(LoadedPage {
            final_url,
            status,
            html,
        })
    }

    async fn close(&self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            tracing::warn!(error = %e, "Failed to close browser");
        }
        if let Err(e) = browser.wait().await {
            tracing::debug!(error = %e, "Failed to reap browser process");
        }
        self.handler.abort();
        tracing::info!("Browser closed");
    }
}

/// Fails every image, stylesheet, font and media request of `page`
#[cfg(feature = "browser")]
async fn block_subresources(page: &Page) -> Result<JoinHandle<()>, LoadError> {
    let mut paused = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(browser_error)?;

    let answering = page.clone();
    let task = tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let refuse = FailRequestParams::new(event.request_id.clone(), ErrorReason::BlockedByClient);
            if let Err(e) = answering.execute(refuse).await {
                tracing::trace!(error = %e, "Could not refuse request");
            }
        }
    });

    let patterns: Vec<RequestPattern> = [
        ResourceType::Image,
        ResourceType::Stylesheet,
        ResourceType::Font,
        ResourceType::Media,
    ]
    .into_iter()
    .map(|kind| {
        RequestPattern::builder()
            .resource_type(kind)
            .request_stage(RequestStage::Request)
            .build()
    })
    .collect();

    if let Err(e) = page
        .execute(fetch::EnableParams::builder().patterns(patterns).build())
        .await
    {
        task.abort();
        return Err(browser_error(e));
    }
    Ok(task)
}

#[cfg(feature = "browser")]
fn browser_error(e: CdpError) -> LoadError {
    LoadError::Browser(e.to_string())
}

/// One page and its browser context
///
/// Dropping an unclosed session, for example when the load times out,
/// closes both in the background.
#[cfg(feature = "browser")]
struct Session {
    page: Option<Page>,
    context: Option<BrowserContextId>,
    browser: Arc<Mutex<Browser>>,
    tasks: Vec<JoinHandle<()>>,
    runtime: Handle,
}

#[cfg(feature = "browser")]
impl Session {
    fn page(&self) -> Result<&Page, LoadError> {
        self.page
            .as_ref()
            .ok_or_else(|| LoadError::Browser("page already closed".to_string()))
    }

    async fn close(mut self) {
        let (page, context) = self.release();
        dispose(self.browser.clone(), page, context).await;
    }

    fn release(&mut self) -> (Option<Page>, Option<BrowserContextId>) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        (self.page.take(), self.context.take())
    }
}

#[cfg(feature = "browser")]
impl Drop for Session {
    fn drop(&mut self) {
        let (page, context) = self.release();
        if page.is_some() || context.is_some() {
            self.runtime.spawn(dispose(self.browser.clone(), page, context));
        }
    }
}

#[cfg(feature = "browser")]
async fn dispose(browser: Arc<Mutex<Browser>>, page: Option<Page>, context: Option<BrowserContextId>) {
    if let Some(page) = page {
        if let Err(e) = page.close().await {
            tracing::trace!(error = %e, "Failed to close page");
        }
    }
    if let Some(context) = context {
        let browser = browser.lock().await;
        if let Err(e) = browser.execute(DisposeBrowserContextParams::new(context)).await {
            tracing::debug!(error = %e, "Failed to dispose browser context");
        }
    }
}

/// Stand-in compiled without the `browser` feature
#[cfg(not(feature = "browser"))]
#[derive(Debug)]
pub struct BrowserPageLoader {
    _private: (),
}

#[cfg(not(feature = "browser"))]
const NOT_COMPILED: &str = "browser support not compiled in; rebuild with --features browser";

#[cfg(not(feature = "browser"))]
impl BrowserPageLoader {
    pub async fn launch(_config: &BrowserConfig) -> Result<Self, LoadError> {
        Err(LoadError::Browser(NOT_COMPILED.to_string()))
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl PageLoader for BrowserPageLoader {
    async fn load(&self, _url: &Url, _options: &LoadOptions) -> Result<LoadedPage, LoadError> {
        Err(LoadError::Browser(NOT_COMPILED.to_string()))
    }
}
