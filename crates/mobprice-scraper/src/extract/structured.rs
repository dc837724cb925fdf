//! Traversal of embedded structured data.
//!
//! Booking.com ships page state as JSON inside script blocks. The schema
//! moves between releases, so nothing here deserializes into concrete types:
//! the walker visits every object in the tree and reacts to any object that
//! has both a `displayName` and a `priceDisplayInfoIrene` field, wherever it
//! sits.

use mobprice_core::{ListingKey, PriceIndex, PriceRecord};
use serde_json::{Map, Value};

use crate::currency::format_currency;
use crate::normalize::normalize_text;

pub(crate) const DISPLAY_NAME_FIELD: &str = "displayName";
pub(crate) const PRICE_INFO_FIELD: &str = "priceDisplayInfoIrene";

/// Badge identifier attached to mobile-rate prices. Not localized.
pub const MOBILE_RATE_BADGE: &str = "Mobile Rate";
/// Discount product id attached to mobile-only discounts. Not localized.
pub const MOBILE_DISCOUNT_PRODUCT: &str = "mobile-discount";

/// Nesting beyond this depth is ignored.
const MAX_DEPTH: usize = 128;

/// A node exposing both a display name and a pricing-info object.
pub(crate) struct StructuredListing<'a> {
    pub name: String,
    pub price_info: &'a Map<String, Value>,
}

impl StructuredListing<'_> {
    /// `true` when a badge or discount carries a mobile-only identifier.
    pub fn is_mobile_deal(&self) -> bool {
        let badge_hit = array_field(self.price_info, "badges").any(|badge| {
            badge.get("identifier").and_then(Value::as_str) == Some(MOBILE_RATE_BADGE)
        });
        let discount_hit = array_field(self.price_info, "discounts").any(|discount| {
            discount.get("productId").and_then(Value::as_str) == Some(MOBILE_DISCOUNT_PRODUCT)
        });
        badge_hit || discount_hit
    }

    /// Unformatted per-stay amount and its currency code, when present.
    pub fn amount(&self) -> Option<(f64, String)> {
        let per_stay = self
            .price_info
            .get("displayPrice")
            .and_then(|p| p.get("amountPerStay"))?;
        let amount = per_stay.get("amountUnformatted").and_then(|v| {
            v.as_f64()
                .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
        })?;
        if !amount.is_finite() {
            return None;
        }
        let currency = per_stay
            .get("currency")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some((amount, currency))
    }
}

fn array_field<'a>(map: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a Value> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter())
        .into_iter()
        .flatten()
}

/// Calls `visit` for every listing node reachable from `root`.
pub(crate) fn visit_listings<'a, F>(root: &'a Value, visit: &mut F)
where
    F: FnMut(StructuredListing<'a>),
{
    walk(root, 0, visit);
}

fn walk<'a, F>(value: &'a Value, depth: usize, visit: &mut F)
where
    F: FnMut(StructuredListing<'a>),
{
    if depth > MAX_DEPTH {
        return;
    }
    match value {
        Value::Object(map) => {
            if let Some(listing) = as_listing(map) {
                visit(listing);
            }
            for child in map.values() {
                walk(child, depth + 1, visit);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, depth + 1, visit);
            }
        }
        _ => {}
    }
}

fn as_listing(map: &Map<String, Value>) -> Option<StructuredListing<'_>> {
    let price_info = map.get(PRICE_INFO_FIELD)?.as_object()?;
    let name_node = map.get(DISPLAY_NAME_FIELD)?;
    let raw_name = name_node
        .get("text")
        .and_then(Value::as_str)
        .or_else(|| name_node.as_str())?;
    let name = normalize_text(raw_name);
    if name.is_empty() {
        return None;
    }
    Some(StructuredListing { name, price_info })
}

/// Result of scanning structured data for deals.
pub(crate) struct StructuredScan {
    /// Listing nodes found, deal or not. Zero means the signal is absent.
    pub listings_seen: usize,
    pub index: PriceIndex,
}

/// Collects a record for every listing node carrying a mobile deal marker.
pub(crate) fn scan_deals(blocks: &[Value]) -> StructuredScan {
    let mut listings_seen = 0usize;
    let mut records = Vec::new();

    for block in blocks {
        visit_listings(block, &mut |listing| {
            listings_seen += 1;
            if !listing.is_mobile_deal() {
                return;
            }
            let Some((amount, currency)) = listing.amount() else {
                tracing::debug!(
                    listing = %listing.name,
                    "mobile deal marker without an unformatted amount; skipping"
                );
                return;
            };
            let display_text = format_currency(amount, &currency);
            tracing::debug!(listing = %listing.name, price = %display_text, "found mobile-rate deal");
            records.push((
                ListingKey::new(listing.name),
                PriceRecord::with_amount(display_text, amount),
            ));
        });
    }

    StructuredScan {
        listings_seen,
        index: records.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn hotel(name: &str, badge: Option<&str>, amount: serde_json::Value) -> Value {
        let badges = badge.map_or_else(Vec::new, |id| vec![json!({"identifier": id})]);
        json!({
            "displayName": {"text": name},
            "priceDisplayInfoIrene": {
                "badges": badges,
                "displayPrice": {"amountPerStay": {"amountUnformatted": amount, "currency": "ILS"}}
            }
        })
    }

    #[test]
    fn finds_mobile_rate_listing_nested_in_sequences() {
        let block = json!({
            "data": {"searchQueries": {"results": [
                hotel("Hotel B", Some(MOBILE_RATE_BADGE), json!(2407)),
                hotel("Hotel C", None, json!(999)),
            ]}}
        });
        let scan = scan_deals(&[block]);
        assert_eq!(scan.listings_seen, 2);
        assert_eq!(scan.index.len(), 1);
        let record = scan.index.get("Hotel B").unwrap();
        assert_eq!(record.raw_amount, Some(2407.0));
        assert_eq!(record.display_text, "₪2,407");
    }

    #[test]
    fn discount_product_id_counts_as_deal() {
        let block = json!({
            "displayName": "  Hotel D ",
            "priceDisplayInfoIrene": {
                "discounts": [{"productId": MOBILE_DISCOUNT_PRODUCT}],
                "displayPrice": {"amountPerStay": {"amountUnformatted": "310.6", "currency": "EUR"}}
            }
        });
        let scan = scan_deals(&[block]);
        let record = scan.index.get("Hotel D").unwrap();
        assert_eq!(record.display_text, "€311");
        assert_eq!(record.raw_amount, Some(310.6));
    }

    #[test]
    fn deal_without_amount_is_skipped() {
        let block = json!({
            "displayName": {"text": "Hotel E"},
            "priceDisplayInfoIrene": {"badges": [{"identifier": MOBILE_RATE_BADGE}]}
        });
        let scan = scan_deals(&[block]);
        assert_eq!(scan.listings_seen, 1);
        assert!(scan.index.is_empty());
    }

    #[test]
    fn other_badges_are_not_deals() {
        let scan = scan_deals(&[hotel("Hotel F", Some("Genius"), json!(100))]);
        assert!(scan.index.is_empty());
    }

    #[test]
    fn node_needs_both_fields() {
        let block = json!({
            "displayName": {"text": "No price info"},
            "sibling": {"priceDisplayInfoIrene": {"badges": [{"identifier": MOBILE_RATE_BADGE}]}}
        });
        let scan = scan_deals(&[block]);
        assert_eq!(scan.listings_seen, 0);
    }

    #[test]
    fn excessive_nesting_is_ignored() {
        let mut value = hotel("Deep Hotel", Some(MOBILE_RATE_BADGE), json!(1));
        for _ in 0..(MAX_DEPTH + 5) {
            value = json!([value]);
        }
        let scan = scan_deals(&[value]);
        assert_eq!(scan.listings_seen, 0);
    }
}
