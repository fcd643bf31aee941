use url::Url;

/// Extracts the domain from a URL
///
/// Returns the lowercase host. Rate limiting and same-domain checks key on
/// this value, so two ports on one host share a domain.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use doc_harvest::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the origin-style key `host[:port]` used to scope robots.txt
pub fn origin_key(url: &Url) -> Option<String> {
    let host = extract_domain(url)?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Returns true when both URLs point at the same host and port
pub fn same_origin(a: &Url, b: &Url) -> bool {
    origin_key(a).is_some() && origin_key(a) == origin_key(b)
}
