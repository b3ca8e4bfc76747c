use url::Url;

/// Extracts the lowercase host from a URL
///
/// Ports are not part of the domain; politeness and scope decisions are made
/// per host name.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use ripple_frontier::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.com:8443/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the politeness key for a URL: host plus explicit port
///
/// Two local test servers on different ports are treated as distinct hosts.
pub fn host_key(url: &Url) -> String {
    match (extract_domain(url), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host,
        (None, _) => String::new(),
    }
}
