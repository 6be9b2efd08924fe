use crate::UrlError;
use url::Url;

/// Query parameters that only carry click tracking
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "msclkid"];

/// Normalizes a URL into the form used as the frontier's dedup key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not http/https
/// 2. Lowercase the host
/// 3. Remove dot segments and repeated slashes from the path
/// 4. Strip the trailing slash, except for the root path
/// 5. Drop the fragment
/// 6. Drop tracking query parameters (`utm_*`, click ids) and sort the rest
///
/// # Arguments
///
/// * `url_str` - Absolute URL, surrounding whitespace allowed
///
/// # Returns
///
/// * `Ok(Url)` - The normalized URL
/// * `Err(UrlError)` - Malformed, not http/https, or without a host
///
/// # Examples
///
/// ```
/// use driftnet::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.COM/docs/./guide/#intro").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/docs/guide");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?.to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    let path = normalize_path(url.path());
    url.set_path(&path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Normalizes and returns the string form
pub fn normalize_url_str(url_str: &str) -> Result<String, UrlError> {
    normalize_url(url_str).map(String::from)
}

fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
