//! Same-origin link eligibility.
//!
//! Pure: no network I/O, no shared state.

use url::{Origin, Url};

/// Decides which outbound links are eligible for traversal.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    origin: Origin,
    /// Lowercased deny substrings matched against the URL path.
    deny_list: Vec<String>,
}

impl LinkFilter {
    /// Build a filter scoped to the origin (scheme, host, port) of `start_url`.
    pub fn new(start_url: &Url, deny_list: &[String]) -> Self {
        Self {
            origin: start_url.origin(),
            deny_list: deny_list.iter().map(|d| d.to_lowercase()).collect(),
        }
    }

    /// Whether an absolute candidate URL may be traversed.
    ///
    /// Rejects, in order: fragment-only and script pseudo-URLs, anything that
    /// does not parse as an absolute URL, other origins, and deny-listed paths.
    pub fn is_eligible(&self, candidate: &str) -> bool {
        if is_pseudo_link(candidate) {
            return false;
        }
        match Url::parse(candidate) {
            Ok(url) => self.accepts(&url),
            Err(_) => false,
        }
    }

    /// Resolve a raw `href` against the page it was found on, strip the fragment,
    /// and return it only if eligible.
    pub fn resolve(&self, href: &str, page_url: &Url) -> Option<Url> {
        let href = href.trim();
        if is_pseudo_link(href) {
            return None;
        }
        let mut resolved = page_url.join(href).ok()?;
        resolved.set_fragment(None);
        self.accepts(&resolved).then_some(resolved)
    }

    fn accepts(&self, url: &Url) -> bool {
        if url.origin() != self.origin {
            return false;
        }
        let path = url.path().to_lowercase();
        !self.deny_list.iter().any(|deny| path.contains(deny.as_str()))
    }
}

/// Fragment-only anchors and non-navigational schemes.
fn is_pseudo_link(href: &str) -> bool {
    let lower = href.trim_start().to_ascii_lowercase();
    lower.is_empty()
        || lower.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
}

/// Normalize a URL for the visited set: strip the fragment and any trailing slash.
pub fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized.as_str().trim_end_matches('/').to_string()
}
