use crate::config::types::{BrowserConfig, Config, CrawlerConfig, FetcherConfig, StealthConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_stealth_config(&config.stealth)?;
    validate_browser_config(&config.browser)?;
    Ok(())
}

/// Validates crawl budgets and the worker pool size
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_depth < 1 {
        return Err(ConfigError::Validation(format!(
            "max-depth must be >= 1, got {}",
            config.max_depth
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.concurrency < 1 || config.concurrency > 64 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 64, got {}",
            config.concurrency
        )));
    }

    if config.crawl_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "crawl-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.page_deadline_secs < 1 {
        return Err(ConfigError::Validation(
            "page-deadline-secs must be >= 1".to_string(),
        ));
    }

    if config.pop_timeout_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "pop-timeout-ms must be >= 10ms, got {}ms",
            config.pop_timeout_ms
        )));
    }

    Ok(())
}

/// Validates retry and timing settings
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.network_idle_timeout_ms == 0 || config.dom_loaded_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "load timeouts must be greater than zero".to_string(),
        ));
    }

    if config.human_delay_min_ms > config.human_delay_max_ms {
        return Err(ConfigError::Validation(format!(
            "human-delay-min-ms ({}) must not exceed human-delay-max-ms ({})",
            config.human_delay_min_ms, config.human_delay_max_ms
        )));
    }

    Ok(())
}

/// Validates the anti-detection pools
fn validate_stealth_config(config: &StealthConfig) -> Result<(), ConfigError> {
    if config.user_agents.is_empty() {
        return Err(ConfigError::Validation(
            "user-agents cannot be empty".to_string(),
        ));
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agents cannot contain blank entries".to_string(),
        ));
    }

    if config.viewports.is_empty() {
        return Err(ConfigError::Validation("viewports cannot be empty".to_string()));
    }

    for viewport in &config.viewports {
        if viewport.width < 320 || viewport.height < 240 {
            return Err(ConfigError::Validation(format!(
                "viewport {}x{} is too small (minimum 320x240)",
                viewport.width, viewport.height
            )));
        }
    }

    Ok(())
}

/// Validates the browser launch settings
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if let Some(path) = &config.executable {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "chrome-executable cannot be empty".to_string(),
            ));
        }
    }

    if let Some(arg) = config.args.iter().find(|a| !a.trim_start().starts_with("--")) {
        return Err(ConfigError::Validation(format!(
            "browser args must be --switches, got '{}'",
            arg
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Viewport;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_budgets_rejected() {
        let mut config = Config::default();
        config.crawler.max_pages = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(msg)) if msg.contains("max-pages")
        ));

        let mut config = Config::default();
        config.crawler.max_depth = 0;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.crawler.concurrency = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_inverted_human_delay_rejected() {
        let mut config = Config::default();
        config.fetcher.human_delay_min_ms = 2000;
        config.fetcher.human_delay_max_ms = 100;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_browser_args() {
        let mut config = Config::default();
        config.browser.args = vec!["--disable-gpu".to_string()];
        assert!(validate(&config).is_ok());

        config.browser.args.push("no-sandbox".to_string());
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(msg)) if msg.contains("no-sandbox")
        ));

        let mut config = Config::default();
        config.browser.executable = Some(std::path::PathBuf::new());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_stealth_pools() {
        let mut config = Config::default();
        config.stealth.user_agents.clear();
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.stealth.viewports = vec![Viewport::new(100, 100)];
        assert!(validate(&config).is_err());
    }
}
