use url::Url;

/// Extracts the network location (`host[:port]`) from a URL
///
/// The host is lowercased; the port is included only when it is explicit
/// and not the scheme default, matching how browsers report `location.host`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use brand_crawler::url::netloc;
///
/// let url = Url::parse("https://Shop.Example.com/path").unwrap();
/// assert_eq!(netloc(&url), Some("shop.example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(netloc(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn netloc(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Returns true if `url` lives on exactly the given network location
///
/// Subdomains are different sites: `blog.example.com` does not match
/// `example.com`.
pub fn is_same_site(url: &Url, site: &str) -> bool {
    netloc(url).map_or(false, |n| n == site)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_netloc_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(netloc(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_netloc_subdomain() {
        let url = Url::parse("https://blog.example.com/post").unwrap();
        assert_eq!(netloc(&url), Some("blog.example.com".to_string()));
    }

    #[test]
    fn test_netloc_with_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(netloc(&url), Some("example.com:8080".to_string()));
    }

    #[test]
    fn test_netloc_default_port_dropped() {
        let url = Url::parse("https://example.com:443/").unwrap();
        assert_eq!(netloc(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_netloc_mixed_case() {
        let url = Url::parse("https://Example.COM/").unwrap();
        assert_eq!(netloc(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_same_site() {
        let url = Url::parse("https://example.com/about?x=1").unwrap();
        assert!(is_same_site(&url, "example.com"));

        let other = Url::parse("https://cdn.example.com/logo.png").unwrap();
        assert!(!is_same_site(&other, "example.com"));

        let ported = Url::parse("http://example.com:3000/").unwrap();
        assert!(!is_same_site(&ported, "example.com"));
    }
}
