//! Page classification.
//!
//! The classifier is the only place that knows which URL shapes the overlay
//! supports. Everything downstream (extractor strategy, annotator strategy,
//! listing selector for the change monitor) keys off [`PageKind`].

use std::borrow::Cow;

use serde::Serialize;
use url::Url;

/// Layout of the page currently displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    /// Search results: one card per property, keyed by display name.
    Search,
    /// A single property: one row per room block, keyed by block id.
    Property,
    /// Anything else. The pipeline is a no-op on these pages.
    #[serde(rename = "unknown")]
    Unsupported,
}

impl PageKind {
    /// Classifies a URL by substring matches on its path.
    ///
    /// `searchresults` wins over `/hotel/` when both appear.
    #[must_use]
    pub fn classify(url: &str) -> Self {
        let path = url_path(url);
        if path.contains("searchresults") {
            PageKind::Search
        } else if path.contains("/hotel/") {
            PageKind::Property
        } else {
            PageKind::Unsupported
        }
    }

    #[must_use]
    pub fn is_supported(self) -> bool {
        !matches!(self, PageKind::Unsupported)
    }
}

impl std::fmt::Display for PageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageKind::Search => write!(f, "search"),
            PageKind::Property => write!(f, "property"),
            PageKind::Unsupported => write!(f, "unknown"),
        }
    }
}

/// Derived view of the current location. Never stored; recomputed whenever
/// the URL may have changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub kind: PageKind,
    pub url: String,
}

impl PageContext {
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        Self {
            kind: PageKind::classify(url),
            url: url.to_owned(),
        }
    }
}

/// Returns the path component of `url`. Inputs that do not parse as an
/// absolute URL are treated as a bare path, minus any query or fragment.
fn url_path(url: &str) -> Cow<'_, str> {
    match Url::parse(url) {
        Ok(parsed) => Cow::Owned(parsed.path().to_owned()),
        Err(_) => {
            let end = url.find(['?', '#']).unwrap_or(url.len());
            Cow::Borrowed(&url[..end])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_search_results() {
        assert_eq!(
            PageKind::classify("https://www.booking.com/searchresults.html?ss=Haifa"),
            PageKind::Search
        );
    }

    #[test]
    fn classify_property_page() {
        assert_eq!(
            PageKind::classify("https://www.booking.com/hotel/il/dan-carmel.html?checkin=2025-01-01"),
            PageKind::Property
        );
    }

    #[test]
    fn classify_unknown_page() {
        assert_eq!(
            PageKind::classify("https://www.booking.com/index.html"),
            PageKind::Unsupported
        );
        assert!(!PageKind::Unsupported.is_supported());
    }

    #[test]
    fn classify_ignores_query_string() {
        assert_eq!(
            PageKind::classify("https://www.booking.com/index.html?next=/hotel/il/x.html"),
            PageKind::Unsupported
        );
        assert_eq!(
            PageKind::classify("https://www.booking.com/?q=searchresults"),
            PageKind::Unsupported
        );
    }

    #[test]
    fn classify_bare_host_is_unsupported() {
        assert_eq!(
            PageKind::classify("https://www.booking.com"),
            PageKind::Unsupported
        );
    }

    #[test]
    fn classify_handles_userinfo_port_and_fragment() {
        assert_eq!(
            PageKind::classify("https://guest@www.booking.com:443/hotel/il/x.html#rooms"),
            PageKind::Property
        );
        assert_eq!(
            PageKind::classify("https://www.booking.com/index.html#searchresults"),
            PageKind::Unsupported
        );
    }

    #[test]
    fn classify_accepts_bare_paths() {
        assert_eq!(
            PageKind::classify("/searchresults.html?ss=Eilat"),
            PageKind::Search
        );
        assert_eq!(
            PageKind::classify("/index.html?next=/hotel/il/x.html"),
            PageKind::Unsupported
        );
    }

    #[test]
    fn classify_is_idempotent() {
        let url = "https://www.booking.com/searchresults.en-gb.html";
        assert_eq!(PageKind::classify(url), PageKind::classify(url));
    }

    #[test]
    fn display_uses_lowercase_names() {
        assert_eq!(PageKind::Search.to_string(), "search");
        assert_eq!(PageKind::Property.to_string(), "property");
        assert_eq!(PageKind::Unsupported.to_string(), "unknown");
    }

    #[test]
    fn page_context_carries_url() {
        let ctx = PageContext::from_url("http://127.0.0.1:8080/hotel/il/a.html");
        assert_eq!(ctx.kind, PageKind::Property);
        assert_eq!(ctx.url, "http://127.0.0.1:8080/hotel/il/a.html");
    }
}
