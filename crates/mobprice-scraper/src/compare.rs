//! Comparator: keep only alternate prices that actually beat the live page.
//!
//! Both sides are read from structured data, so the comparison is numeric
//! and locale-free. A record or listing without a raw amount cannot be
//! compared and is kept as-is.

use std::collections::HashMap;

use mobprice_core::{ListingKey, PriceIndex};

use crate::extract::parse_structured_blocks;
use crate::extract::structured::visit_listings;

/// Reads the raw per-stay amount of every listing in the live document's
/// structured-data blocks, deal or not.
pub fn live_raw_prices<I, S>(blocks: I) -> HashMap<ListingKey, f64>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let values = parse_structured_blocks(blocks);
    let mut prices = HashMap::new();
    for value in &values {
        visit_listings(value, &mut |listing| {
            if let Some((amount, _currency)) = listing.amount() {
                prices.insert(ListingKey::new(listing.name), amount);
            }
        });
    }
    prices
}

/// `true` when the alternate price should be shown: either side lacks a raw
/// amount, or the rounded alternate amount is strictly lower.
#[must_use]
pub fn is_more_favorable(alternate: Option<f64>, live: Option<f64>) -> bool {
    match (alternate, live) {
        (Some(alternate), Some(live)) => alternate.round() < live.round(),
        _ => true,
    }
}

/// Drops records whose alternate price is not strictly lower than the live
/// price for the same listing.
#[must_use]
pub fn retain_favorable(index: PriceIndex, live: &HashMap<ListingKey, f64>) -> PriceIndex {
    let before = index.len();
    let kept = index.retain_where(|key, record| {
        let live_amount = live.get(key).copied();
        let keep = is_more_favorable(record.raw_amount, live_amount);
        if !keep {
            tracing::debug!(
                listing = %key,
                alternate = ?record.raw_amount,
                live = ?live_amount,
                "alternate price is not lower; suppressing badge"
            );
        }
        keep
    });
    if kept.len() < before {
        tracing::info!(
            suppressed = before - kept.len(),
            kept = kept.len(),
            "filtered alternate prices against live prices"
        );
    }
    kept
}
