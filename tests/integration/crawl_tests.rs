//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end over real HTTP.

use brand_crawler::config::{parse_config, Config};
use brand_crawler::crawler::{crawl, crawl_with_fallback, Coordinator, HttpPageLoader};
use brand_crawler::output::{write_json, LogoType, ResultSource};
use brand_crawler::state::CrawlPhase;
use brand_crawler::CrawlResult;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fast test configuration
fn create_test_config(max_depth: u32, max_pages: usize, concurrency: usize) -> Config {
    parse_config(&format!(
        r#"
        [crawler]
        max-depth = {}
        max-pages = {}
        concurrency = {}
        crawl-timeout-secs = 30
        page-deadline-secs = 10
        pop-timeout-ms = 20

        [fetcher]
        max-retries = 2
        network-idle-timeout-ms = 5000
        dom-loaded-timeout-ms = 5000
        backoff-base-ms = 1
        challenge-grace-ms = 1
        human-delay-min-ms = 0
        human-delay-max-ms = 0

        [browser]
        enabled = false
        "#,
        max_depth, max_pages, concurrency
    ))
    .expect("test config should parse")
}

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into().into_bytes(), "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn run(server: &MockServer, config: Config) -> CrawlResult {
    Coordinator::new(config, Arc::new(HttpPageLoader::new()))
        .run(&format!("{}/", server.uri()))
        .await
        .expect("crawl should run")
}

const FILLER: &str = "Every pair is cut, stitched and finished by hand in our own workshop.";

#[tokio::test]
async fn test_full_crawl_single_site() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        html(format!(
            r##"<html><head>
                <title>Acme Boots</title>
                <meta property="og:title" content="Acme Home">
                <meta property="og:site_name" content="Acme">
            </head><body>
                <header><a href="/"><img src="/static/acme-logo.png" class="logo" alt="Acme" width="160" height="40"></a></header>
                <nav><a href="/about">About us</a> <a href="/products">Products</a> <a href="#top">Top</a></nav>
                <main><h1>Boots built for decades</h1><p>{filler}</p></main>
            </body></html>"##,
            filler = FILLER
        )),
    )
    .await;

    mount_page(
        &mock_server,
        "/about",
        html(format!(
            r#"<html><head>
                <title>About Acme</title>
                <meta property="og:title" content="About Acme">
            </head><body>
                <nav><a href="/">Home</a> <a href="/products">Products</a></nav>
                <footer><img src="/static/acme-logo-white.png" class="logo logo-white" alt="Acme" width="80" height="20"></footer>
                <main><h1>Our story</h1><p>Founded in a garage in 1987. {filler}</p></main>
            </body></html>"#,
            filler = FILLER
        )),
    )
    .await;

    mount_page(
        &mock_server,
        "/products",
        html(format!(
            r#"<html><head><title>Products</title></head><body>
                <nav><a href="/">Home</a> <a href="/about">About us</a></nav>
                <main><h1>The Field Boot</h1><p>{filler}</p></main>
            </body></html>"#,
            filler = FILLER
        )),
    )
    .await;

    // one worker so pages merge in priority order
    let result = run(&mock_server, create_test_config(2, 20, 1)).await;

    assert!(result.success);
    assert_eq!(result.source, ResultSource::Crawler);
    assert_eq!(result.pages_crawled, 3);
    assert_eq!(result.metrics.crawl.stop_reason, Some(CrawlPhase::Drained));

    // root first, then the about page outranks products
    let urls: Vec<&str> = result.pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/", mock_server.uri()),
            format!("{}/about", mock_server.uri()),
            format!("{}/products", mock_server.uri()),
        ]
    );

    assert!(result.text.contains("=== PAGE: "));
    assert!(result.text.contains("Boots built for decades"));
    assert!(result.about_us_content.contains("Founded in a garage"));

    // first page wins for every structured-data key
    let og = &result.structured_data.open_graph;
    assert_eq!(og["title"], "Acme Home");
    assert_eq!(og["site_name"], "Acme");

    assert_eq!(result.logos.all.len(), 2);
    assert_eq!(
        result.logos.light.as_deref(),
        Some(format!("{}/static/acme-logo.png", mock_server.uri()).as_str())
    );
    assert_eq!(result.logos.all[1].logo_type, LogoType::Dark);
}

#[tokio::test]
async fn test_transient_error_is_retried() {
    let mock_server = MockServer::start().await;

    // first request fails, the retry succeeds
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_page(
        &mock_server,
        "/",
        html("<html><head><title>Back</title></head><body><p>We are back.</p></body></html>"),
    )
    .await;

    let result = run(&mock_server, create_test_config(1, 5, 1)).await;

    assert!(result.success);
    assert_eq!(result.pages_crawled, 1);
    assert_eq!(result.metrics.crawl.retry_count, 1);
}

#[tokio::test]
async fn test_content_type_handling() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        html(
            r#"<html><head><title>Home</title></head><body>
                <a href="/feed">Feed</a>
                <a href="/lookbook.pdf">Lookbook</a>
            </body></html>"#,
        ),
    )
    .await;
    mount_page(
        &mock_server,
        "/feed",
        ResponseTemplate::new(200).set_body_raw(b"{\"items\":[]}".to_vec(), "application/json"),
    )
    .await;

    let result = run(&mock_server, create_test_config(2, 10, 2)).await;

    assert_eq!(result.pages_crawled, 1);
    // JSON is rejected without retrying; the PDF is never requested
    assert_eq!(result.metrics.crawl.pages_failed, 1);
    assert_eq!(result.metrics.crawl.retry_count, 0);
    assert_eq!(result.metrics.crawl.pages_visited, 2);
}

#[tokio::test]
async fn test_off_site_redirect_is_not_extracted() {
    let mock_server = MockServer::start().await;
    let other_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        html(r#"<html><head><title>Home</title></head><body><a href="/moved">Moved</a></body></html>"#),
    )
    .await;
    mount_page(
        &mock_server,
        "/moved",
        ResponseTemplate::new(302).insert_header("location", format!("{}/landing", other_server.uri()).as_str()),
    )
    .await;
    mount_page(
        &other_server,
        "/landing",
        html("<html><head><title>Elsewhere</title></head><body>Elsewhere</body></html>"),
    )
    .await;

    let result = run(&mock_server, create_test_config(2, 10, 2)).await;

    assert_eq!(result.pages_crawled, 1);
    assert_eq!(result.metrics.crawl.pages_failed, 1);
    assert!(result.pages.iter().all(|p| p.title != "Elsewhere"));
}

#[tokio::test]
async fn test_rate_limited_page_is_blocked() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        html(r#"<html><head><title>Home</title></head><body><a href="/busy">Busy</a></body></html>"#),
    )
    .await;
    mount_page(&mock_server, "/busy", ResponseTemplate::new(429)).await;

    let result = run(&mock_server, create_test_config(2, 10, 2)).await;

    assert_eq!(result.pages_crawled, 1);
    assert_eq!(result.metrics.crawl.blocked_count, 1);
    let busy_requests = mock_server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/busy")
        .count();
    assert_eq!(busy_requests, 1);
}

#[tokio::test]
async fn test_missing_root_fails_even_with_fallback() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", ResponseTemplate::new(404)).await;

    let result = crawl_with_fallback(
        &format!("{}/", mock_server.uri()),
        create_test_config(2, 10, 2),
        None,
    )
    .await;

    assert!(!result.success);
    assert_eq!(result.source, ResultSource::Fallback);
    assert!(result.error.as_deref().unwrap_or("").contains("404"));
}

#[tokio::test]
async fn test_fallback_after_persistent_challenge() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        html(format!(
            r#"<html><head><title>Just a moment...</title></head><body>
                <h1>Checking your browser before accessing the site</h1>
                <p>{}</p>
            </body></html>"#,
            FILLER
        )),
    )
    .await;

    let result = crawl_with_fallback(
        &format!("{}/", mock_server.uri()),
        create_test_config(2, 10, 2),
        None,
    )
    .await;

    assert!(result.success);
    assert_eq!(result.source, ResultSource::Fallback);
    assert_eq!(result.pages_crawled, 1);
    assert!(result.text.contains("workshop"));
}

#[tokio::test]
async fn test_crawl_entry_point_and_json_output() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        html(r#"<html><head><title>Solo</title></head><body><p>Only page.</p></body></html>"#),
    )
    .await;

    let result = crawl(&format!("{}/", mock_server.uri()), 1, 1, 1, None)
        .await
        .expect("crawl should run");
    assert!(result.success);
    assert_eq!(result.pages[0].title, "Solo");

    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("result.json");
    write_json(&result, &out).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["source"], "crawler");
    assert_eq!(json["pages_crawled"], 1);
    assert_eq!(json["metrics"]["stop_reason"], "budget_exhausted");
    assert!(json["metrics"]["avg_page_load_time"].is_number());
}
