//! Fetched document to price index, per page kind.

use mobprice_core::{PageKind, PriceIndex, SelectorSet};
use mobprice_scraper::{
    extract_room_prices, extract_search_prices, live_raw_prices, retain_favorable,
};

use crate::page::LivePage;

/// Builds the index for `kind` from a fetched mobile document.
///
/// Search results are additionally filtered against the prices the live
/// page itself embeds, so only alternate prices that are actually lower
/// survive. Room prices are taken as-is.
#[must_use]
pub fn index_for_page(
    page: &LivePage,
    kind: PageKind,
    html: &str,
    selectors: &SelectorSet,
) -> PriceIndex {
    match kind {
        PageKind::Search => {
            let extraction = extract_search_prices(html, selectors);
            compare_with_live(page, extraction.index, selectors)
        }
        PageKind::Property => extract_room_prices(html, selectors).index,
        PageKind::Unsupported => PriceIndex::empty(),
    }
}

fn compare_with_live(page: &LivePage, index: PriceIndex, selectors: &SelectorSet) -> PriceIndex {
    if index.is_empty() {
        return index;
    }
    match page.texts_of(&selectors.structured_data) {
        Ok(blocks) => {
            let live = live_raw_prices(blocks);
            tracing::debug!(live_prices = live.len(), "read live structured prices");
            retain_favorable(index, &live)
        }
        Err(err) => {
            tracing::warn!(error = %err, "could not read live structured data; skipping comparison");
            index
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn listing(name: &str, amount: f64, deal: bool) -> serde_json::Value {
        let badges = if deal {
            json!([{"identifier": "Mobile Rate"}])
        } else {
            json!([])
        };
        json!({
            "displayName": {"text": name},
            "priceDisplayInfoIrene": {
                "badges": badges,
                "displayPrice": {"amountPerStay": {"amountUnformatted": amount, "currency": "USD"}}
            }
        })
    }

    fn document(listings: &[serde_json::Value]) -> String {
        format!(
            r#"<html><head><script type="application/json">{}</script></head><body></body></html>"#,
            json!({ "results": listings })
        )
    }

    #[test]
    fn search_index_drops_prices_that_are_not_lower() {
        let mobile = document(&[
            listing("Cheaper", 90.0, true),
            listing("Pricier", 130.0, true),
        ]);
        let page = LivePage::parse(
            "https://www.booking.com/searchresults.html",
            &document(&[listing("Cheaper", 100.0, false), listing("Pricier", 120.0, false)]),
        );

        let index = index_for_page(&page, PageKind::Search, &mobile, &SelectorSet::default());

        assert_eq!(index.len(), 1);
        assert_eq!(index.get("Cheaper").unwrap().display_text, "$90");
    }

    #[test]
    fn search_index_kept_when_live_page_has_no_structured_data() {
        let mobile = document(&[listing("Only Mobile", 90.0, true)]);
        let page = LivePage::parse(
            "https://www.booking.com/searchresults.html",
            "<html><body></body></html>",
        );

        let index = index_for_page(&page, PageKind::Search, &mobile, &SelectorSet::default());
        assert!(index.contains("Only Mobile"));
    }

    #[test]
    fn unsupported_kind_yields_empty_index() {
        let page = LivePage::parse("https://www.booking.com/", "<html></html>");
        let mobile = document(&[listing("X", 1.0, true)]);
        assert!(index_for_page(&page, PageKind::Unsupported, &mobile, &SelectorSet::default())
            .is_empty());
    }
}
