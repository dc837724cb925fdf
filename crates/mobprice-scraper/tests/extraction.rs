//! End-to-end extraction scenarios against realistic document fragments.

use mobprice_core::SelectorSet;
use mobprice_scraper::{
    extract_room_prices, extract_search_prices, live_raw_prices, retain_favorable, Strategy,
};

fn page(body: &str) -> String {
    format!("<!DOCTYPE html><html><head><title>t</title></head><body>{body}</body></html>")
}

#[test]
fn search_selector_strategy_finds_mobile_only_price() {
    let html = page(
        r#"<div data-testid="property-card">
             <div data-testid="title">Hotel A</div>
             <span data-testid="property-card-deal" aria-label="Mobile-only price">Mobile-only price</span>
             <div data-testid="price-and-discounted-price">$120</div>
           </div>"#,
    );

    let extraction = extract_search_prices(&html, &SelectorSet::default());

    assert_eq!(extraction.strategy, Strategy::Markup);
    assert_eq!(extraction.index.len(), 1);
    let record = extraction.index.get("Hotel A").expect("Hotel A should be indexed");
    assert_eq!(record.display_text, "$120");
    assert!(record.raw_amount.is_none());
}

#[test]
fn search_structured_strategy_formats_raw_amount() {
    let json = serde_json::json!({
        "props": {"results": [{
            "displayName": {"text": "Hotel B"},
            "priceDisplayInfoIrene": {
                "badges": [{"identifier": "Mobile Rate"}],
                "displayPrice": {"amountPerStay": {"amountUnformatted": 2407, "currency": "ILS"}}
            }
        }]}
    });
    let html = page(&format!(
        r#"<script type="application/json" data-capla-store-data="apollo">{json}</script>
           <div data-testid="property-card"><div data-testid="title">Hotel B</div></div>"#
    ));

    let extraction = extract_search_prices(&html, &SelectorSet::default());

    assert_eq!(extraction.strategy, Strategy::StructuredData);
    let record = extraction.index.get("Hotel B").expect("Hotel B should be indexed");
    assert_eq!(record.raw_amount, Some(2407.0));
    assert_eq!(record.display_text, "₪2,407");
}

#[test]
fn property_room_option_is_keyed_by_block_id() {
    let html = page(
        r#"<label role="radio" data-block-id="42">
             <span class="bui-badge bui-badge--constructive">Mobile-only price</span>
             <div class="bui-price-display__value"><span class="prco-valign-middle-helper">€85</span></div>
           </label>"#,
    );

    let extraction = extract_room_prices(&html, &SelectorSet::default());

    assert_eq!(extraction.strategy, Strategy::Rooms);
    assert_eq!(extraction.index.get("42").unwrap().display_text, "€85");
}

#[test]
fn listings_without_deal_badges_yield_empty_index() {
    let html = page(
        r#"<div data-testid="property-card">
             <div data-testid="title">Hotel C</div>
             <div data-testid="price-and-discounted-price">$300</div>
           </div>
           <div data-testid="property-card">
             <div data-testid="title">Hotel D</div>
             <div data-testid="price-and-discounted-price">$310</div>
           </div>"#,
    );

    let extraction = extract_search_prices(&html, &SelectorSet::default());
    assert!(extraction.index.is_empty());
}

#[test]
fn comparator_suppresses_alternate_price_that_is_not_lower() {
    let mobile = serde_json::json!([
        {
            "displayName": {"text": "Cheaper On Mobile"},
            "priceDisplayInfoIrene": {
                "badges": [{"identifier": "Mobile Rate"}],
                "displayPrice": {"amountPerStay": {"amountUnformatted": 180, "currency": "USD"}}
            }
        },
        {
            "displayName": {"text": "Same Price"},
            "priceDisplayInfoIrene": {
                "badges": [{"identifier": "Mobile Rate"}],
                "displayPrice": {"amountPerStay": {"amountUnformatted": 200.2, "currency": "USD"}}
            }
        }
    ]);
    let html = page(&format!(r#"<script type="application/json">{mobile}</script>"#));
    let extraction = extract_search_prices(&html, &SelectorSet::default());
    assert_eq!(extraction.index.len(), 2);

    let live_block = serde_json::json!([
        {"displayName": {"text": "Cheaper On Mobile"}, "priceDisplayInfoIrene": {"displayPrice": {"amountPerStay": {"amountUnformatted": 200, "currency": "USD"}}}},
        {"displayName": {"text": "Same Price"}, "priceDisplayInfoIrene": {"displayPrice": {"amountPerStay": {"amountUnformatted": 199.8, "currency": "USD"}}}}
    ])
    .to_string();
    let live = live_raw_prices([live_block]);

    let kept = retain_favorable(extraction.index, &live);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept.get("Cheaper On Mobile").unwrap().display_text, "$180");
}
