//! Privileged URL filtering for tab lifecycle events

/// Decides which tab URLs may produce envelopes
#[derive(Debug, Clone)]
pub struct UrlFilter {
    privileged_prefixes: Vec<String>,
}

impl UrlFilter {
    pub fn new(privileged_prefixes: Vec<String>) -> Self {
        Self {
            privileged_prefixes,
        }
    }

    /// A URL is trackable if it is present, non-empty and not browser-internal
    pub fn is_trackable(&self, url: Option<&str>) -> bool {
        match url {
            Some(url) if !url.is_empty() => !self
                .privileged_prefixes
                .iter()
                .any(|prefix| url.starts_with(prefix.as_str())),
            _ => false,
        }
    }
}
