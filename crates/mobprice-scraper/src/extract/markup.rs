//! Selector strategy for search results: scrape rendered listing cards.

use std::sync::LazyLock;

use mobprice_core::{ListingKey, PriceIndex, PriceRecord, SelectorSet};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{compile, element_text};
use crate::error::ScraperError;
use crate::normalize::normalize_text;

/// Accessible-label marker on the deal badge, matched case-insensitively.
pub const MOBILE_ONLY_LABEL: &str = "mobile-only price";

static PRICE_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[$€£¥₪]\s*\d{2,}|\d{2,}\s*[$€£¥₪]").expect("valid regex")
});

static MOBILE_WORDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)mobile|app|exclusive").expect("valid regex"));

pub(super) fn search_by_markup(
    document: &Html,
    selectors: &SelectorSet,
) -> Result<PriceIndex, ScraperError> {
    let card_selector = compile("hotel_card", &selectors.hotel_card)?;
    let title_selector = compile("hotel_title", &selectors.hotel_title)?;
    let badge_selector = compile("mobile_deal_badge", &selectors.mobile_deal_badge)?;
    let price_selector = compile("mobile_discounted_price", &selectors.mobile_discounted_price)?;

    let cards: Vec<ElementRef<'_>> = document.select(&card_selector).collect();
    tracing::debug!(cards = cards.len(), "found listing cards in mobile document");

    if tracing::enabled!(tracing::Level::DEBUG) {
        if let Some(first) = cards.first() {
            log_card_structure(first, &title_selector);
        }
    }

    let mut records = Vec::new();
    for (position, card) in cards.iter().enumerate() {
        let Some(title) = card.select(&title_selector).next() else {
            if position < 3 {
                tracing::debug!(position, "card has no title; skipping");
            }
            continue;
        };
        let name = normalize_text(&element_text(&title));
        if name.is_empty() || !has_mobile_deal(card, &badge_selector) {
            continue;
        }

        let price = card
            .select(&price_selector)
            .next()
            .map(|el| normalize_text(&element_text(&el)))
            .unwrap_or_default();
        if price.is_empty() {
            tracing::debug!(listing = %name, "deal badge present but no price text; skipping");
            continue;
        }

        tracing::debug!(listing = %name, price = %price, "found mobile-only deal");
        records.push((ListingKey::new(name), PriceRecord::from_text(price)));
    }

    let index: PriceIndex = records.into_iter().collect();
    if index.is_empty() && !cards.is_empty() {
        tracing::debug!(
            cards = cards.len(),
            "found listing cards but no mobile-only prices; if deals are expected, the deal badge or price selectors may have drifted"
        );
    }
    Ok(index)
}

/// `true` when any deal badge in `card` has an accessible label containing
/// [`MOBILE_ONLY_LABEL`].
pub(super) fn has_mobile_deal(card: &ElementRef<'_>, badge_selector: &Selector) -> bool {
    card.select(badge_selector).any(|badge| {
        badge
            .value()
            .attr("aria-label")
            .is_some_and(|label| label.to_lowercase().contains(MOBILE_ONLY_LABEL))
    })
}

/// Dumps what a card looks like so selector drift can be diagnosed from logs.
fn log_card_structure(card: &ElementRef<'_>, title_selector: &Selector) {
    let title = card
        .select(title_selector)
        .next()
        .map(|el| normalize_text(&element_text(&el)));
    let outer: String = card.html().chars().take(1000).collect();
    let card_text = element_text(card);

    let price_like: Vec<String> = PRICE_LIKE
        .find_iter(&card_text)
        .take(5)
        .map(|m| m.as_str().to_string())
        .collect();

    let deal_like = Selector::parse(
        r#"[class*="deal"], [class*="mobile"], [class*="price"], [class*="exclusive"]"#,
    )
    .map(|sel| card.select(&sel).count())
    .unwrap_or(0);

    tracing::debug!(
        title = title.as_deref().unwrap_or("NOT FOUND"),
        mentions_mobile = MOBILE_WORDING.is_match(&card_text),
        price_like = ?price_like,
        deal_like_elements = deal_like,
        html_prefix = %outer,
        "mobile card structure"
    );
}
