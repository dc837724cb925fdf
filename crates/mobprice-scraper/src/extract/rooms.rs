//! Property page extraction: room options in the mobile rendering.

use mobprice_core::{ListingKey, PriceIndex, PriceRecord, SelectorSet};
use scraper::Html;

use super::{compile, element_text};
use crate::error::ScraperError;
use crate::normalize::normalize_text;

pub(crate) const BLOCK_ID_ATTR: &str = "data-block-id";

/// Collects a record for every room option that carries a deal badge, keyed
/// by its block id.
pub(super) fn rooms_by_markup(
    document: &Html,
    selectors: &SelectorSet,
) -> Result<PriceIndex, ScraperError> {
    let option_selector = compile("mobile_room_option", &selectors.mobile_room_option)?;
    let badge_selector = compile(
        "mobile_deal_badge_property",
        &selectors.mobile_deal_badge_property,
    )?;
    let price_selector = compile("mobile_price_property", &selectors.mobile_price_property)?;

    let mut options_seen = 0usize;
    let mut records = Vec::new();

    for option in document.select(&option_selector) {
        options_seen += 1;
        let Some(block_id) = option
            .value()
            .attr(BLOCK_ID_ATTR)
            .map(str::trim)
            .filter(|id| !id.is_empty())
        else {
            continue;
        };
        if option.select(&badge_selector).next().is_none() {
            continue;
        }

        let price = option
            .select(&price_selector)
            .next()
            .map(|el| normalize_text(&element_text(&el)))
            .unwrap_or_default();
        if price.is_empty() {
            tracing::debug!(block_id, "deal badge present but no price text; skipping");
            continue;
        }

        tracing::debug!(block_id, price = %price, "found mobile-only room deal");
        records.push((ListingKey::from(block_id), PriceRecord::from_text(price)));
    }

    tracing::debug!(
        options = options_seen,
        deals = records.len(),
        "scanned mobile room options"
    );
    Ok(records.into_iter().collect())
}
