//! HTTP client for the alternate (mobile) rendering of a page.

use std::time::Duration;

use mobprice_core::OverlayConfig;
use reqwest::{Client, Url};

use crate::error::ScraperError;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Fetches the same URL the desktop page shows, presenting itself as a
/// mobile browser.
///
/// There are no retries here. A failed fetch aborts the current pipeline
/// run; the change monitor's debounce re-attempts on the next qualifying
/// DOM mutation.
#[derive(Debug, Clone)]
pub struct MobileClient {
    client: Client,
    user_agent: String,
    timeout: Duration,
}

impl MobileClient {
    /// Creates a client that sends `user_agent` and gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Network`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()?;
        Ok(Self {
            client,
            user_agent: user_agent.to_owned(),
            timeout,
        })
    }

    /// # Errors
    ///
    /// See [`MobileClient::new`].
    pub fn from_config(config: &OverlayConfig) -> Result<Self, ScraperError> {
        Self::new(&config.mobile_user_agent, config.network_timeout())
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GETs `url` with the mobile identity and returns the body as text.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::InvalidUrl`] if `url` is not an absolute http(s) URL.
    /// - [`ScraperError::Http`] if the response status is not 2xx.
    /// - [`ScraperError::Timeout`] if no complete response arrives within the
    ///   configured timeout.
    /// - [`ScraperError::Network`] on any other transport failure.
    pub async fn fetch_mobile(&self, url: &str) -> Result<String, ScraperError> {
        let target = parse_target(url)?;
        tracing::debug!(url, "fetching mobile rendering");

        match tokio::time::timeout(self.timeout, self.fetch_inner(target, url)).await {
            Ok(Ok(body)) => {
                tracing::debug!(url, bytes = body.len(), "mobile rendering fetched");
                Ok(body)
            }
            Ok(Err(err)) => Err(err),
            Err(_elapsed) => Err(self.timeout_error(url)),
        }
    }

    async fn fetch_inner(&self, target: Url, url: &str) -> Result<String, ScraperError> {
        let response = self
            .client
            .get(target)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header(reqwest::header::ACCEPT, ACCEPT_HTML)
            .header(reqwest::header::ACCEPT_LANGUAGE, ACCEPT_LANGUAGE)
            .send()
            .await
            .map_err(|e| self.classify_transport_error(e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::Http {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_owned(),
                url: url.to_owned(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| self.classify_transport_error(e, url))
    }

    fn classify_transport_error(&self, err: reqwest::Error, url: &str) -> ScraperError {
        if err.is_timeout() {
            self.timeout_error(url)
        } else {
            ScraperError::Network(err)
        }
    }

    fn timeout_error(&self, url: &str) -> ScraperError {
        ScraperError::Timeout {
            url: url.to_owned(),
            timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Parses `url` and checks it is something the client can fetch.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] for unparseable or non-http(s) URLs.
fn parse_target(url: &str) -> Result<Url, ScraperError> {
    let parsed = Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ScraperError::InvalidUrl {
            url: url.to_owned(),
            reason: format!("unsupported scheme \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
