use url::Url;

/// Extracts the domain from a URL
///
/// Returns the lowercase host, or `None` for URLs without one. The port is not
/// part of the domain, so `example.com:8080` and `example.com` share politeness
/// state.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use driftnet::url::extract_domain;
///
/// let url = Url::parse("https://Blog.Example.COM/post").unwrap();
/// assert_eq!(extract_domain(&url), Some("blog.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Parses `raw` and extracts its domain; `None` if it does not parse
pub fn domain_of(raw: &str) -> Option<String> {
    Url::parse(raw).ok().as_ref().and_then(extract_domain)
}

/// Location of the robots.txt governing `url`: same scheme, host and port
pub fn robots_url(url: &Url) -> Option<Url> {
    let host = url.host_str()?;
    let origin = match url.port() {
        Some(port) => format!("{}://{}:{}/robots.txt", url.scheme(), host, port),
        None => format!("{}://{}/robots.txt", url.scheme(), host),
    };
    Url::parse(&origin).ok()
}
