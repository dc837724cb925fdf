//! Price extraction from the alternate (mobile) rendering.
//!
//! Search pages carry two signals. When the document embeds structured data
//! with per-listing pricing objects, that wins: its deal markers are
//! language-invariant and it exposes raw amounts for the comparator. Without
//! it, the rendered markup is scraped instead. Property pages are always
//! scraped from markup.
//!
//! Extraction never fails outward. A document that cannot be interpreted
//! yields an empty index, and a listing that cannot be read is skipped
//! without affecting its siblings.

mod markup;
mod rooms;
pub(crate) mod structured;

use mobprice_core::{PriceIndex, SelectorSet};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::error::ScraperError;

/// Which extraction path produced an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Listing cards scraped via CSS selectors; records have no raw amount.
    Markup,
    /// Embedded JSON traversal; records carry raw amounts.
    StructuredData,
    /// Room options on a property page, scraped via CSS selectors.
    Rooms,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Markup => write!(f, "markup"),
            Strategy::StructuredData => write!(f, "structured-data"),
            Strategy::Rooms => write!(f, "rooms"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub strategy: Strategy,
    pub index: PriceIndex,
}

impl Extraction {
    fn empty(strategy: Strategy) -> Self {
        Self {
            strategy,
            index: PriceIndex::empty(),
        }
    }
}

/// Extracts mobile-only deals from a fetched search-results document.
///
/// Returns an empty index (never an error) when the document is unusable.
#[must_use]
pub fn extract_search_prices(html: &str, selectors: &SelectorSet) -> Extraction {
    match try_extract_search(html, selectors) {
        Ok(extraction) => {
            tracing::info!(
                strategy = %extraction.strategy,
                deals = extraction.index.len(),
                "extracted mobile search prices"
            );
            extraction
        }
        Err(err) => {
            tracing::warn!(error = %err, "could not parse mobile search document");
            Extraction::empty(Strategy::Markup)
        }
    }
}

/// Extracts mobile-only room deals from a fetched property document.
///
/// Returns an empty index (never an error) when the document is unusable.
#[must_use]
pub fn extract_room_prices(html: &str, selectors: &SelectorSet) -> Extraction {
    let result = ensure_document(html).and_then(|()| {
        let document = Html::parse_document(html);
        rooms::rooms_by_markup(&document, selectors)
    });
    match result {
        Ok(index) => {
            tracing::info!(deals = index.len(), "extracted mobile room prices");
            Extraction {
                strategy: Strategy::Rooms,
                index,
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "could not parse mobile property document");
            Extraction::empty(Strategy::Rooms)
        }
    }
}

fn try_extract_search(html: &str, selectors: &SelectorSet) -> Result<Extraction, ScraperError> {
    ensure_document(html)?;
    let document = Html::parse_document(html);

    let script_selector = compile("structured_data", &selectors.structured_data)?;
    let blocks = parse_structured_blocks(script_texts(&document, &script_selector));
    let scan = structured::scan_deals(&blocks);

    if scan.listings_seen > 0 {
        tracing::debug!(
            blocks = blocks.len(),
            listings = scan.listings_seen,
            "using structured-data strategy"
        );
        return Ok(Extraction {
            strategy: Strategy::StructuredData,
            index: scan.index,
        });
    }

    let index = markup::search_by_markup(&document, selectors)?;
    Ok(Extraction {
        strategy: Strategy::Markup,
        index,
    })
}

/// Parses each block as JSON. A block that is not valid JSON is skipped on
/// its own; the remaining blocks are still used.
pub(crate) fn parse_structured_blocks<I, S>(texts: I) -> Vec<Value>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    texts
        .into_iter()
        .enumerate()
        .filter_map(|(position, text)| {
            let text = text.as_ref().trim();
            if text.is_empty() {
                return None;
            }
            match serde_json::from_str::<Value>(text) {
                Ok(value) => Some(value),
                Err(err) => {
                    tracing::debug!(position, error = %err, "skipping unparseable structured-data block");
                    None
                }
            }
        })
        .collect()
}

fn ensure_document(html: &str) -> Result<(), ScraperError> {
    if html.trim().is_empty() {
        return Err(ScraperError::Parse {
            context: "mobile document".to_string(),
            reason: "response body is empty".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn compile(name: &str, selector: &str) -> Result<Selector, ScraperError> {
    Selector::parse(selector).map_err(|e| ScraperError::Parse {
        context: format!("selector {name} (\"{selector}\")"),
        reason: e.to_string(),
    })
}

fn script_texts(document: &Html, selector: &Selector) -> Vec<String> {
    document.select(selector).map(|el| element_text(&el)).collect()
}

pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_yields_empty_index() {
        let extraction = extract_search_prices("   ", &SelectorSet::default());
        assert!(extraction.index.is_empty());
        let extraction = extract_room_prices("", &SelectorSet::default());
        assert!(extraction.index.is_empty());
        assert_eq!(extraction.strategy, Strategy::Rooms);
    }

    #[test]
    fn broken_selector_yields_empty_index() {
        let selectors = SelectorSet {
            hotel_card: "[[".to_string(),
            ..SelectorSet::default()
        };
        let extraction = extract_search_prices("<html><body></body></html>", &selectors);
        assert!(extraction.index.is_empty());
    }

    #[test]
    fn parse_structured_blocks_skips_invalid_json() {
        let blocks = parse_structured_blocks(["{\"a\": 1}", "not json", "", "[1, 2]"]);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn strategy_display_names() {
        assert_eq!(Strategy::StructuredData.to_string(), "structured-data");
        assert_eq!(Strategy::Markup.to_string(), "markup");
    }
}
