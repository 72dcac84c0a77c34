//! Integration tests for crawl coordination
//!
//! These tests drive the coordinator with an in-memory site so that worker
//! scheduling, budgets and cancellation can be checked without a network.

use async_trait::async_trait;
use brand_crawler::config::{Config, CrawlerConfig, FetcherConfig};
use brand_crawler::crawler::{Coordinator, LoadError, LoadOptions, LoadedPage, PageLoader};
use brand_crawler::state::CrawlPhase;
use brand_crawler::{CrawlResult, ProgressCallback};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use url::Url;

const HOST: &str = "shop.test";
const ROOT: &str = "https://shop.test/";

#[derive(Debug, Clone)]
enum Reply {
    Html(String),
    Status(u16),
    Timeout,
    /// Hangs far longer than any test runs
    Hang,
    /// Serves the page at another path, the way a server redirect lands
    Redirect(&'static str),
    Panic,
}

/// A scripted site keyed by path; records every load it serves
struct FakeSite {
    pages: HashMap<String, Reply>,
    fetched: Mutex<Vec<String>>,
}

impl FakeSite {
    fn new(pages: Vec<(&str, Reply)>) -> Arc<Self> {
        Arc::new(Self {
            pages: pages
                .into_iter()
                .map(|(path, reply)| (path.to_string(), reply))
                .collect(),
            fetched: Mutex::new(Vec::new()),
        })
    }

    fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    fn fetch_count(&self, url: &str) -> usize {
        self.fetched().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl PageLoader for FakeSite {
    async fn load(&self, url: &Url, options: &LoadOptions) -> Result<LoadedPage, LoadError> {
        self.fetched.lock().unwrap().push(url.to_string());

        let mut final_url = url.clone();
        let mut reply = if url.host_str() == Some(HOST) {
            self.pages.get(url.path()).cloned()
        } else {
            None
        };
        if let Some(Reply::Redirect(target)) = reply {
            final_url = url.join(target).expect("redirect target should resolve");
            reply = self.pages.get(final_url.path()).cloned();
        }

        match reply {
            Some(Reply::Html(html)) => Ok(LoadedPage {
                final_url,
                status: 200,
                html,
            }),
            Some(Reply::Status(status)) => Err(LoadError::Http(status)),
            Some(Reply::Timeout) => Err(LoadError::Timeout(options.timeout)),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Err(LoadError::Timeout(options.timeout))
            }
            Some(Reply::Panic) => panic!("loader crashed on {}", url),
            Some(Reply::Redirect(_)) | None => Err(LoadError::Http(404)),
        }
    }
}

/// A page with a title, a nav of `links` and enough body text to be valid
fn page(title: &str, links: &[&str]) -> Reply {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a> "#, href, href.trim_start_matches('/')))
        .collect();
    Reply::Html(format!(
        r#"<html><head><title>{title}</title></head>
        <body><nav>{anchors}</nav>
        <main><h1>{title}</h1><p>{body}</p></main></body></html>"#,
        title = title,
        anchors = anchors,
        body = "We make honest goods for everyday use. ".repeat(5),
    ))
}

fn test_config(max_depth: u32, max_pages: usize, concurrency: usize) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_depth,
            max_pages,
            concurrency,
            crawl_timeout_secs: 30,
            page_deadline_secs: 10,
            pop_timeout_ms: 20,
        },
        fetcher: FetcherConfig {
            max_retries: 2,
            network_idle_timeout_ms: 2_000,
            dom_loaded_timeout_ms: 1_000,
            backoff_base_ms: 1,
            challenge_grace_ms: 1,
            human_delay_min_ms: 0,
            human_delay_max_ms: 0,
        },
        ..Default::default()
    }
}

async fn run(site: &Arc<FakeSite>, config: Config) -> CrawlResult {
    Coordinator::new(config, site.clone())
        .run(ROOT)
        .await
        .expect("crawl should run")
}

fn crawled_paths(result: &CrawlResult) -> HashSet<String> {
    result
        .pages
        .iter()
        .map(|p| Url::parse(&p.url).unwrap().path().to_string())
        .collect()
}

#[tokio::test]
async fn test_no_page_fetched_twice() {
    // every page links to every other page, including the root
    let paths: Vec<String> = (0..9).map(|i| format!("/p{}", i)).collect();
    let mut all: Vec<&str> = paths.iter().map(String::as_str).collect();
    all.push("/");

    let mut pages = vec![("/", page("Home", &all))];
    for path in &paths {
        pages.push((path.as_str(), page(path, &all)));
    }
    let site = FakeSite::new(pages);

    let result = run(&site, test_config(3, 50, 8)).await;

    assert!(result.success);
    assert_eq!(result.pages_crawled, 10);
    assert_eq!(result.metrics.crawl.pages_visited, 10);
    assert_eq!(site.fetched().len(), 10);
    assert_eq!(site.fetch_count(ROOT), 1);
    for path in &paths {
        assert_eq!(site.fetch_count(&format!("https://{}{}", HOST, path)), 1);
    }
    assert_eq!(result.metrics.crawl.stop_reason, Some(CrawlPhase::Drained));
}

#[tokio::test]
async fn test_crawl_stays_on_site() {
    let site = FakeSite::new(vec![
        (
            "/",
            page(
                "Home",
                &[
                    "/about",
                    "https://other.test/x",
                    "https://blog.shop.test/post",
                    "mailto:hi@shop.test",
                ],
            ),
        ),
        ("/about", page("About", &[])),
    ]);

    let result = run(&site, test_config(3, 50, 4)).await;

    assert_eq!(result.pages_crawled, 2);
    for url in site.fetched() {
        assert_eq!(Url::parse(&url).unwrap().host_str(), Some(HOST));
    }
}

#[tokio::test]
async fn test_page_budget_is_exact() {
    let paths: Vec<String> = (0..100).map(|i| format!("/item-{}", i)).collect();
    let links: Vec<&str> = paths.iter().map(String::as_str).collect();

    let mut pages = vec![("/", page("Home", &links))];
    for path in &paths {
        pages.push((path.as_str(), page(path, &links)));
    }
    let site = FakeSite::new(pages);

    let result = run(&site, test_config(3, 5, 4)).await;

    assert_eq!(result.metrics.crawl.pages_visited, 5);
    assert_eq!(result.pages_crawled, 5);
    assert_eq!(site.fetched().len(), 5);
    assert_eq!(
        result.metrics.crawl.stop_reason,
        Some(CrawlPhase::BudgetExhausted)
    );
}

#[tokio::test]
async fn test_depth_limit() {
    let site = FakeSite::new(vec![
        ("/", page("Home", &["/d1"])),
        ("/d1", page("One", &["/d2"])),
        ("/d2", page("Two", &["/d3"])),
        ("/d3", page("Three", &[])),
    ]);

    let result = run(&site, test_config(2, 50, 2)).await;

    let expected: HashSet<String> = ["/", "/d1", "/d2"].iter().map(|p| p.to_string()).collect();
    assert_eq!(crawled_paths(&result), expected);
    assert_eq!(site.fetch_count("https://shop.test/d3"), 0);
    assert_eq!(result.pages.iter().map(|p| p.depth).max(), Some(2));
}

#[tokio::test]
async fn test_partial_failure() {
    let paths: Vec<String> = (1..10).map(|i| format!("/p{}", i)).collect();
    let links: Vec<&str> = paths.iter().map(String::as_str).collect();

    let mut pages = vec![("/", page("Home", &links))];
    for path in &paths {
        let reply = if path == "/p3" || path == "/p7" {
            Reply::Timeout
        } else {
            page(path, &[])
        };
        pages.push((path.as_str(), reply));
    }
    let site = FakeSite::new(pages);

    let result = run(&site, test_config(2, 50, 3)).await;

    assert!(result.success);
    assert_eq!(result.pages_crawled, 8);
    assert_eq!(result.metrics.crawl.pages_failed, 2);
    assert_eq!(result.metrics.crawl.pages_visited, 10);
    // each timed-out page is tried twice
    assert_eq!(result.metrics.crawl.retry_count, 2);
    assert_eq!(site.fetch_count("https://shop.test/p3"), 2);
    assert!(!crawled_paths(&result).contains("/p7"));
}

#[tokio::test]
async fn test_root_failure_is_unsuccessful() {
    let site = FakeSite::new(vec![("/", Reply::Status(404))]);

    let result = run(&site, test_config(2, 10, 2)).await;

    assert!(!result.success);
    assert!(result.error.is_some());
    assert_eq!(result.pages_crawled, 0);
    assert_eq!(result.metrics.crawl.pages_failed, 1);
    assert!(result.pages.is_empty());
}

#[tokio::test]
async fn test_high_value_links_first() {
    let site = FakeSite::new(vec![
        ("/", page("Home", &["/cart", "/blog", "/about"])),
        ("/cart", page("Cart", &[])),
        ("/blog", page("Journal", &[])),
        ("/about", page("About", &[])),
    ]);

    run(&site, test_config(2, 50, 1)).await;

    assert_eq!(
        site.fetched(),
        vec![
            "https://shop.test/",
            "https://shop.test/about",
            "https://shop.test/blog",
            "https://shop.test/cart",
        ]
    );
}

#[tokio::test]
async fn test_bot_protection_is_counted() {
    let captcha = Reply::Html(
        r#"<html><body><div class="g-recaptcha" data-sitekey="x"></div></body></html>"#
            .to_string(),
    );
    let site = FakeSite::new(vec![
        ("/", page("Home", &["/verify", "/limited"])),
        ("/verify", captcha),
        ("/limited", Reply::Status(429)),
    ]);

    let result = run(&site, test_config(2, 50, 2)).await;

    assert_eq!(result.pages_crawled, 1);
    assert_eq!(result.metrics.crawl.pages_failed, 2);
    assert_eq!(result.metrics.crawl.captcha_count, 1);
    assert_eq!(result.metrics.crawl.blocked_count, 1);
    // a block is never retried
    assert_eq!(site.fetch_count("https://shop.test/limited"), 1);
}

#[tokio::test]
async fn test_progress_reports_every_page() {
    let site = FakeSite::new(vec![
        ("/", page("Home", &["/a", "/b"])),
        ("/a", page("A", &[])),
        ("/b", page("B", &[])),
    ]);

    let calls: Arc<Mutex<Vec<(usize, usize, String)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();
    let progress: ProgressCallback = Arc::new(move |visited: usize, max: usize, url: &str| {
        sink.lock().unwrap().push((visited, max, url.to_string()));
    });

    Coordinator::new(test_config(2, 20, 2), site.clone())
        .with_progress(progress)
        .run(ROOT)
        .await
        .unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], (1, 20, ROOT.to_string()));
    assert!(calls.iter().all(|(visited, max, _)| *visited <= 3 && *max == 20));
}

#[tokio::test]
async fn test_cancellation_returns_partial_result() {
    let site = FakeSite::new(vec![
        ("/", page("Home", &["/slow-1", "/slow-2", "/slow-3"])),
        ("/slow-1", Reply::Hang),
        ("/slow-2", Reply::Hang),
        ("/slow-3", Reply::Hang),
    ]);

    let coordinator = Coordinator::new(test_config(2, 50, 3), site.clone());
    let token = coordinator.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
    });

    let started = Instant::now();
    let result = coordinator.run(ROOT).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(result.metrics.crawl.stop_reason, Some(CrawlPhase::Cancelled));
    assert!(result.success);
    assert_eq!(result.pages_crawled, 1);
    // aborted fetches are not failures
    assert_eq!(result.metrics.crawl.pages_failed, 0);
}

#[tokio::test]
async fn test_crawl_timeout_returns_partial_result() {
    let site = FakeSite::new(vec![
        ("/", page("Home", &["/slow"])),
        ("/slow", Reply::Hang),
    ]);

    let mut config = test_config(2, 50, 2);
    config.crawler.crawl_timeout_secs = 1;
    config.fetcher.network_idle_timeout_ms = 30_000;

    let started = Instant::now();
    let result = run(&site, config).await;

    assert!(started.elapsed() < Duration::from_secs(8));
    assert_eq!(result.metrics.crawl.stop_reason, Some(CrawlPhase::TimedOut));
    assert!(result.success);
    assert_eq!(result.pages_crawled, 1);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let site = FakeSite::new(vec![("/", page("Home", &[]))]);
    let result = Coordinator::new(test_config(2, 10, 0), site.clone())
        .run(ROOT)
        .await;

    assert!(result.is_err());
    assert!(site.fetched().is_empty());
}

#[tokio::test]
async fn test_relative_links_follow_redirect() {
    let site = FakeSite::new(vec![
        ("/", page("Home", &["/shop"])),
        ("/shop", Reply::Redirect("/shop/")),
        ("/shop/", page("Shop", &["serum"])),
        ("/shop/serum", page("Serum", &[])),
    ]);

    let result = run(&site, test_config(3, 50, 2)).await;

    assert_eq!(
        site.fetched(),
        vec![
            "https://shop.test/",
            "https://shop.test/shop",
            "https://shop.test/shop/serum",
        ]
    );
    assert_eq!(result.pages_crawled, 3);
    assert_eq!(result.metrics.crawl.pages_failed, 0);
    assert!(crawled_paths(&result).contains("/shop"));
}

#[tokio::test]
async fn test_panicking_page_is_counted_as_failure() {
    let site = FakeSite::new(vec![
        ("/", page("Home", &["/boom", "/about"])),
        ("/boom", Reply::Panic),
        ("/about", page("About", &[])),
    ]);

    let result = run(&site, test_config(2, 50, 1)).await;

    assert!(result.success);
    assert_eq!(result.pages_crawled, 2);
    assert_eq!(result.metrics.crawl.pages_failed, 1);
    assert_eq!(result.metrics.crawl.pages_visited, 3);
    assert_eq!(site.fetch_count("https://shop.test/about"), 1);
}

#[tokio::test]
async fn test_vendor_scripts_do_not_fail_page() {
    let Reply::Html(product) = page("Serum", &[]) else {
        unreachable!()
    };
    let product = product.replace(
        "</body>",
        r#"<script src="/cdn-cgi/challenge-platform/scripts/jsd/main.js"></script>
        <script src="https://www.google.com/recaptcha/api.js?render=site-key"></script></body>"#,
    );
    let site = FakeSite::new(vec![
        ("/", page("Home", &["/serum"])),
        ("/serum", Reply::Html(product)),
    ]);

    let result = run(&site, test_config(2, 50, 2)).await;

    assert_eq!(result.pages_crawled, 2);
    assert_eq!(result.metrics.crawl.pages_failed, 0);
    assert_eq!(result.metrics.crawl.captcha_count, 0);
    assert_eq!(site.fetch_count("https://shop.test/serum"), 1);
}
