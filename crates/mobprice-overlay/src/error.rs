use mobprice_core::ConfigError;
use mobprice_scraper::ScraperError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("failed to fetch mobile rendering: {0}")]
    Fetch(#[from] ScraperError),

    #[error("selector rejected by the live document: \"{selector}\"")]
    Selector { selector: String },

    #[error("no insertion point for badge on listing {key}")]
    MissingAnchor { key: String },

    #[error("could not build {context}")]
    Markup { context: String },

    #[error("page is not a supported layout: {url}")]
    UnsupportedPage { url: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
