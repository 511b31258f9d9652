//! URL helpers

use url::Url;

/// Accept absolute http(s) URLs that name a host
pub fn is_valid_url(input: &str) -> bool {
    match Url::parse(input.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

/// Split a comma-separated batch line.
///
/// Returns `(valid, rejected)`; blank entries are dropped silently.
pub fn split_batch(line: &str) -> (Vec<String>, Vec<String>) {
    let mut valid = Vec::new();
    let mut rejected = Vec::new();

    for entry in line.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if is_valid_url(entry) {
            valid.push(entry.to_string());
        } else {
            rejected.push(entry.to_string());
        }
    }

    (valid, rejected)
}

/// Post identifier: the second-to-last `/`-separated segment.
///
/// Built for `https://www.instagram.com/p/<shortcode>/`, where the last
/// segment is empty. Query strings and fragments are ignored.
pub fn post_identifier(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() < 2 {
        return None;
    }
    let id = segments[segments.len() - 2];
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
