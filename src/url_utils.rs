//! URL utilities shared by the crawl workers, linker and store.

use percent_encoding::percent_decode_str;
use url::Url;

/// A discovered link reduced to its persisted form plus its host,
/// ready for frontier insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    pub url: String,
    pub host: String,
}

/// Reduces a URL to the form stored everywhere in the system:
/// scheme, host, optional non-default port, unescaped path and query.
/// Fragments are dropped.
pub fn normalize_url(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let path = percent_decode_str(url.path()).decode_utf8_lossy();
    let mut normalized = match url.port() {
        Some(port) => format!("{}://{}:{}{}", url.scheme(), host, port, path),
        None => format!("{}://{}{}", url.scheme(), host, path),
    };
    if let Some(query) = url.query() {
        normalized.push('?');
        normalized.push_str(&percent_decode_str(query).decode_utf8_lossy());
    }
    Some(normalized)
}

pub fn extract_host(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_string()))
}

fn first_label(hostname: &str) -> String {
    hostname.split('.').next().unwrap_or(hostname).to_string()
}

/// The keyword-bearing label of a host: the leftmost label of the
/// registrable domain (eTLD+1 via the Public Suffix List), so
/// www.example.co.uk yields "example". Hosts the suffix list does not
/// know fall back to the second-to-last label.
pub fn registrable_label(hostname: &str) -> String {
    match psl::domain(hostname.as_bytes()) {
        Some(domain) => first_label(&String::from_utf8_lossy(domain.as_bytes())),
        None => {
            let parts: Vec<&str> = hostname.split('.').collect();
            if parts.len() >= 2 {
                parts[parts.len() - 2].to_string()
            } else {
                hostname.to_string()
            }
        }
    }
}

/// The last path segment with its extension removed, used as the url
/// keyword zone. "/blog/rust-tips.html" yields "rust-tips".
pub fn path_stem(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or("");
    match segment.rfind('.') {
        Some(0) | None => segment.to_string(),
        Some(idx) => segment[..idx].to_string(),
    }
}

/// Script and stylesheet URLs are never crawlable documents.
pub fn is_asset_url(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    path.ends_with(".js") || path.ends_with(".css")
}

/// Resolves raw hrefs against the page they came from, keeping only
/// http(s) non-asset links, in normalized form, first occurrence wins.
pub fn resolve_links(hrefs: &[String], base: &Url) -> Vec<NormalizedUrl> {
    let mut seen = std::collections::HashSet::new();
    let mut resolved = Vec::new();

    for href in hrefs {
        let absolute = match base.join(href) {
            Ok(u) => u,
            Err(_) => continue,
        };
        if !matches!(absolute.scheme(), "http" | "https") {
            continue;
        }
        if is_asset_url(&absolute) {
            continue;
        }
        let (Some(url), Some(host)) = (
            normalize_url(&absolute),
            absolute.host_str().map(str::to_string),
        ) else {
            continue;
        };
        if seen.insert(url.clone()) {
            resolved.push(NormalizedUrl { url, host });
        }
    }
    resolved
}

pub fn is_html_content_type(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    lower.starts_with("text/html") || lower.starts_with("application/xhtml+xml")
}
