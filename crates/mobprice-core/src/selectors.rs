//! CSS selector set: the overlay's only coupling to the target site's markup.
//!
//! These selectors track Booking.com's current structure and will drift as
//! the site changes. Override them with a YAML file (see [`load_selectors`])
//! rather than patching the defaults.

use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectorSet {
    // Search results (both renderings)
    pub hotel_card: String,
    pub hotel_title: String,
    pub mobile_deal_badge: String,
    pub mobile_discounted_price: String,
    pub desktop_price_fallback: String,
    pub price_section_container: String,

    // Property page, desktop rendering
    pub property_room_row: String,
    pub property_price_cell: String,
    pub property_price_block: String,
    pub property_taxes_note: String,

    // Property page, mobile rendering
    pub mobile_room_option: String,
    pub mobile_deal_badge_property: String,
    pub mobile_price_property: String,

    /// Script blocks carrying embedded structured data.
    pub structured_data: String,
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self {
            hotel_card: r#"[data-testid="property-card"]"#.to_string(),
            hotel_title: r#"[data-testid="title"]"#.to_string(),
            mobile_deal_badge: r#"[data-testid="property-card-deal"]"#.to_string(),
            mobile_discounted_price: r#"[data-testid="price-and-discounted-price"]"#.to_string(),
            desktop_price_fallback: r#"[data-testid="price"]"#.to_string(),
            price_section_container: r#"div[data-testid*="price"]"#.to_string(),
            property_room_row: "tbody tr[data-block-id]".to_string(),
            property_price_cell: ".hprt-table-cell-price".to_string(),
            property_price_block: ".hprt-price-block".to_string(),
            property_taxes_note: ".prd-taxes-and-fees-under-price".to_string(),
            mobile_room_option: r#"label[role="radio"][data-block-id]"#.to_string(),
            mobile_deal_badge_property: ".bui-badge.bui-badge--constructive".to_string(),
            mobile_price_property: ".bui-price-display__value .prco-valign-middle-helper"
                .to_string(),
            structured_data:
                r#"script[type="application/json"], script[type="application/ld+json"]"#
                    .to_string(),
        }
    }
}

impl SelectorSet {
    fn named(&self) -> [(&'static str, &str); 14] {
        [
            ("hotel_card", &self.hotel_card),
            ("hotel_title", &self.hotel_title),
            ("mobile_deal_badge", &self.mobile_deal_badge),
            ("mobile_discounted_price", &self.mobile_discounted_price),
            ("desktop_price_fallback", &self.desktop_price_fallback),
            ("price_section_container", &self.price_section_container),
            ("property_room_row", &self.property_room_row),
            ("property_price_cell", &self.property_price_cell),
            ("property_price_block", &self.property_price_block),
            ("property_taxes_note", &self.property_taxes_note),
            ("mobile_room_option", &self.mobile_room_option),
            ("mobile_deal_badge_property", &self.mobile_deal_badge_property),
            ("mobile_price_property", &self.mobile_price_property),
            ("structured_data", &self.structured_data),
        ]
    }

    /// Checks that every selector compiles.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSelector`] naming the first selector
    /// that fails to parse.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, selector) in self.named() {
            if scraper::Selector::parse(selector).is_err() {
                return Err(ConfigError::InvalidSelector {
                    name: name.to_string(),
                    selector: selector.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Load and validate a selector set from a YAML file.
///
/// The file must define every selector; partial overrides are rejected so a
/// typo in a key cannot silently fall back to a stale default.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or contains a
/// selector that does not compile.
pub fn load_selectors(path: &Path) -> Result<SelectorSet, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SelectorFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_selectors(&content)
}

fn parse_selectors(content: &str) -> Result<SelectorSet, ConfigError> {
    let selectors: SelectorSet = serde_yaml::from_str(content)?;
    selectors.validate()?;
    Ok(selectors)
}
