use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    /// The alternate rendering answered with a non-2xx status.
    #[error("HTTP {status} {status_text} from {url}")]
    Http {
        status: u16,
        status_text: String,
        url: String,
    },

    /// Transport failure: DNS, connect, TLS, reset, body read.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("timed out after {timeout_ms}ms fetching {url}")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The fetched document could not be interpreted at all. Extractors
    /// convert this into an empty index at their boundary.
    #[error("failed to parse {context}: {reason}")]
    Parse { context: String, reason: String },
}
