//! brand-crawler main entry point
//!
//! This is the command-line interface for the brand-intelligence crawler.

use anyhow::Context;
use brand_crawler::config::{load_config_with_hash, validate, Config};
use brand_crawler::crawler::{open_loader, Coordinator, ProgressCallback};
use brand_crawler::output::{print_statistics, to_json, write_json, CrawlStatistics};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// brand-crawler: a concurrent brand-intelligence site crawler
///
/// Crawls one site with a pool of workers, extracts brand signals from every
/// page and writes the merged result as JSON.
#[derive(Parser, Debug)]
#[command(name = "brand-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A concurrent brand-intelligence site crawler", long_about = None)]
struct Cli {
    /// Root URL of the site to crawl
    #[arg(value_name = "URL")]
    url: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum link depth from the root page
    #[arg(long)]
    max_depth: Option<u32>,

    /// Maximum number of pages to visit
    #[arg(long)]
    max_pages: Option<usize>,

    /// Number of concurrent workers
    #[arg(long)]
    concurrency: Option<usize>,

    /// Overall crawl timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Write the JSON result to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Load pages over plain HTTP instead of headless Chromium
    #[arg(long)]
    no_browser: bool,

    /// Scrape the root page directly if the crawl extracts nothing
    #[arg(long)]
    fallback: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_effective_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&cli.url, &config);
    } else {
        handle_crawl(&cli, config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("brand_crawler=info,warn"),
            1 => EnvFilter::new("brand_crawler=debug,info"),
            2 => EnvFilter::new("brand_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // stdout carries the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (if any) and applies command-line overrides
fn load_effective_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(max_depth) = cli.max_depth {
        config.crawler.max_depth = max_depth;
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawler.concurrency = concurrency;
    }
    if let Some(timeout) = cli.timeout {
        config.crawler.crawl_timeout_secs = timeout;
    }
    if cli.no_browser {
        config.browser.enabled = false;
    }

    validate(&config).context("invalid crawl settings")?;
    Ok(config)
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(url: &str, config: &Config) {
    println!("=== brand-crawler Dry Run ===\n");
    println!("Root URL: {}\n", url);

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Crawl timeout: {}s", config.crawler.crawl_timeout_secs);
    println!("  Page deadline: {}s", config.crawler.page_deadline_secs);

    println!("\nFetcher:");
    println!("  Max retries: {}", config.fetcher.max_retries);
    println!(
        "  Load timeouts: {}ms (network idle), {}ms (DOM loaded)",
        config.fetcher.network_idle_timeout_ms, config.fetcher.dom_loaded_timeout_ms
    );
    println!("  Backoff base: {}ms", config.fetcher.backoff_base_ms);
    println!(
        "  Human delay: {}-{}ms",
        config.fetcher.human_delay_min_ms, config.fetcher.human_delay_max_ms
    );

    println!("\nStealth:");
    println!("  User agents: {}", config.stealth.user_agents.len());
    for viewport in &config.stealth.viewports {
        println!("  - {}x{}", viewport.width, viewport.height);
    }

    println!("\nBrowser:");
    if config.browser.enabled {
        match &config.browser.executable {
            Some(path) => println!("  Chromium: {}", path.display()),
            None => println!("  Chromium: auto-detect"),
        }
        println!("  Headless: {}", config.browser.headless);
    } else {
        println!("  Disabled (plain HTTP)");
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(cli: &Cli, config: Config) -> anyhow::Result<()> {
    let progress: ProgressCallback = Arc::new(|visited: usize, max_pages: usize, url: &str| {
        tracing::info!("[{}/{}] {}", visited, max_pages, url);
    });
    let loader = open_loader(&config.browser).await;
    let coordinator = Coordinator::new(config, loader.clone()).with_progress(progress);

    // Ctrl-C stops the crawl but still yields a partial result
    let token = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing with pages collected so far");
            token.cancel();
        }
    });

    let result = if cli.fallback {
        Ok(coordinator.run_with_fallback(&cli.url).await)
    } else {
        coordinator.run(&cli.url).await
    };
    loader.close().await;
    let result = result.with_context(|| format!("crawl of {} failed", cli.url))?;

    if !cli.quiet {
        print_statistics(&CrawlStatistics::from_result(&result));
    }

    match &cli.output {
        Some(path) => write_json(&result, path)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", to_json(&result)?),
    }

    if !result.success {
        tracing::error!(
            "Crawl extracted no pages: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(())
}
