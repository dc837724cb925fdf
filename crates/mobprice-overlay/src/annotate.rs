//! Badge insertion into the live document.
//!
//! Each listing is handled on its own: a listing that cannot be annotated is
//! logged and skipped, and the loop moves on. A listing that already holds a
//! badge is left alone, so annotating twice never duplicates badges.

use kuchiki::{NodeRef, Selectors};
use mobprice_core::{BadgeConfig, OverlayConfig, PageKind, PriceIndex, PriceRecord, SelectorSet};

use crate::dom;
use crate::error::OverlayError;
use crate::page::LivePage;

/// Identity attribute on search-page badges.
pub const HOTEL_NAME_ATTR: &str = "data-hotel-name";
/// Identity attribute on property-page badges.
pub const BLOCK_ID_ATTR: &str = "data-block-id";

/// Tally of one annotation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationReport {
    /// Listing elements found in the live document.
    pub listings: usize,
    pub inserted: usize,
    /// Listings with a record that already carried a badge.
    pub already_marked: usize,
    pub failed: usize,
}

enum Outcome {
    NoRecord,
    AlreadyMarked,
    Inserted,
}

/// Annotates every listing in the live document that has a record in
/// `index`. Never fails: problems are logged and reflected in the report.
pub fn annotate(
    page: &LivePage,
    kind: PageKind,
    index: &PriceIndex,
    config: &OverlayConfig,
) -> AnnotationReport {
    if index.is_empty() {
        tracing::debug!(page_kind = %kind, "no mobile prices to inject");
        return AnnotationReport::default();
    }

    let result = page.batch(|page| match kind {
        PageKind::Search => annotate_search(page, index, config),
        PageKind::Property => annotate_rooms(page, index, config),
        PageKind::Unsupported => Ok(AnnotationReport::default()),
    });

    match result {
        Ok(report) => {
            tracing::info!(
                page_kind = %kind,
                listings = report.listings,
                inserted = report.inserted,
                already_marked = report.already_marked,
                failed = report.failed,
                "annotated live page"
            );
            report
        }
        Err(err) => {
            tracing::warn!(page_kind = %kind, error = %err, "could not annotate live page");
            AnnotationReport::default()
        }
    }
}

/// Builds a detached badge: a container carrying the marker class, the
/// tooltip and the listing identity, holding an icon span and a text span.
///
/// # Errors
///
/// Returns [`OverlayError::Markup`] if an element cannot be created.
pub fn build_badge(
    badge: &BadgeConfig,
    price_text: &str,
    identity_attr: &str,
    identity: &str,
) -> Result<NodeRef, OverlayError> {
    let container = dom::create_element("div")?;
    dom::set_attr(&container, "class", &badge.class_name);
    dom::set_attr(&container, "data-tooltip", &badge.tooltip);
    dom::set_attr(&container, "title", &badge.tooltip);
    dom::set_attr(&container, identity_attr, identity);

    let icon = dom::create_element("span")?;
    dom::set_attr(&icon, "class", &badge.icon_class());
    icon.append(NodeRef::new_text(badge.icon.clone()));

    let text = dom::create_element("span")?;
    dom::set_attr(&text, "class", &badge.text_class());
    text.append(NodeRef::new_text(badge.render_text(price_text)));

    container.append(icon);
    container.append(text);
    Ok(container)
}

// ---- search results ----

struct SearchSelectors {
    card: Selectors,
    title: Selectors,
    discounted_price: Selectors,
    fallback_price: Selectors,
    price_section: Selectors,
    badge: Selectors,
}

impl SearchSelectors {
    fn compile(selectors: &SelectorSet, badge_class: &str) -> Result<Self, OverlayError> {
        Ok(Self {
            card: dom::compile(&selectors.hotel_card)?,
            title: dom::compile(&selectors.hotel_title)?,
            discounted_price: dom::compile(&selectors.mobile_discounted_price)?,
            fallback_price: dom::compile(&selectors.desktop_price_fallback)?,
            price_section: dom::compile(&selectors.price_section_container)?,
            badge: dom::compile(&format!(".{badge_class}"))?,
        })
    }
}

fn annotate_search(
    page: &LivePage,
    index: &PriceIndex,
    config: &OverlayConfig,
) -> Result<AnnotationReport, OverlayError> {
    let selectors = SearchSelectors::compile(&config.selectors, &config.badge.class_name)?;
    let cards = dom::all_matches(&page.document(), &selectors.card);
    let mut report = AnnotationReport {
        listings: cards.len(),
        ..AnnotationReport::default()
    };

    for (position, card) in cards.iter().enumerate() {
        match annotate_card(page, card, index, &selectors, config) {
            Ok(Outcome::Inserted) => report.inserted += 1,
            Ok(Outcome::AlreadyMarked) => report.already_marked += 1,
            Ok(Outcome::NoRecord) => {}
            Err(err) => {
                report.failed += 1;
                tracing::warn!(position, error = %err, "failed to annotate listing card");
            }
        }
    }

    if cards.is_empty() {
        tracing::warn!(
            selector = %config.selectors.hotel_card,
            deals = index.len(),
            "no listing cards in live page; the card selector may have drifted"
        );
    }
    Ok(report)
}

fn annotate_card(
    page: &LivePage,
    card: &NodeRef,
    index: &PriceIndex,
    selectors: &SearchSelectors,
    config: &OverlayConfig,
) -> Result<Outcome, OverlayError> {
    let Some(title) = dom::first_match(card, &selectors.title) else {
        return Ok(Outcome::NoRecord);
    };
    let name = dom::text_of(&title);
    let Some(record) = index.get(&name) else {
        return Ok(Outcome::NoRecord);
    };

    if has_own_badge(page, card, &selectors.badge, &name) {
        dom::add_class(card, &config.badge.highlight_class);
        return Ok(Outcome::AlreadyMarked);
    }

    let placement = find_price_section(card, selectors)
        .ok_or_else(|| OverlayError::MissingAnchor { key: name.clone() })?;
    let badge = build_badge(&config.badge, &record.display_text, HOTEL_NAME_ATTR, &name)?;
    match placement {
        Placement::After(anchor) => {
            if !page.insert_after(&anchor, badge) {
                return Err(OverlayError::MissingAnchor { key: name });
            }
        }
        Placement::Append(parent) => page.append(&parent, badge),
    }
    dom::add_class(card, &config.badge.highlight_class);

    log_inserted(&name, record);
    Ok(Outcome::Inserted)
}

/// `true` when the card already holds a badge for `name`. Badges left behind
/// for another listing (the host reused the card element) are removed.
fn has_own_badge(page: &LivePage, card: &NodeRef, badge: &Selectors, name: &str) -> bool {
    let mut found = false;
    for existing in dom::all_matches(card, badge) {
        if dom::attr(&existing, HOTEL_NAME_ATTR).as_deref() == Some(name) {
            found = true;
        } else {
            tracing::debug!(listing = %name, "removing badge left over from another listing");
            page.remove(&existing);
        }
    }
    found
}

enum Placement {
    After(NodeRef),
    Append(NodeRef),
}

/// Where the badge goes: after the discounted price's closest price
/// container, else after the grandparent of the discounted or plain price
/// element. Anchors that are not strictly inside the card fall back to the
/// price's parent, then to the end of the card, so the badge always stays
/// inside the card.
fn find_price_section(card: &NodeRef, selectors: &SearchSelectors) -> Option<Placement> {
    let discounted = dom::first_match(card, &selectors.discounted_price);
    if let Some(section) = discounted
        .as_ref()
        .and_then(|price| dom::closest(price, &selectors.price_section))
        .filter(|section| is_inside(section, card))
    {
        return Some(Placement::After(section));
    }

    let price = discounted.or_else(|| dom::first_match(card, &selectors.fallback_price))?;
    let parent = dom::parent_element(&price).filter(|parent| is_inside(parent, card));
    let grandparent = parent
        .as_ref()
        .and_then(dom::parent_element)
        .filter(|grandparent| is_inside(grandparent, card));

    Some(match (grandparent, parent) {
        (Some(grandparent), _) => Placement::After(grandparent),
        (None, Some(parent)) => Placement::After(parent),
        (None, None) => Placement::Append(card.clone()),
    })
}

/// Strict descendant check.
fn is_inside(node: &NodeRef, card: &NodeRef) -> bool {
    node.ancestors().any(|ancestor| ancestor == *card)
}

// ---- property rooms ----

struct RoomSelectors {
    row: Selectors,
    price_cell: Selectors,
    price_block: Selectors,
    taxes_note: Selectors,
    badge: Selectors,
}

impl RoomSelectors {
    fn compile(selectors: &SelectorSet, badge_class: &str) -> Result<Self, OverlayError> {
        Ok(Self {
            row: dom::compile(&selectors.property_room_row)?,
            price_cell: dom::compile(&selectors.property_price_cell)?,
            price_block: dom::compile(&selectors.property_price_block)?,
            taxes_note: dom::compile(&selectors.property_taxes_note)?,
            badge: dom::compile(&format!(".{badge_class}"))?,
        })
    }
}

fn annotate_rooms(
    page: &LivePage,
    index: &PriceIndex,
    config: &OverlayConfig,
) -> Result<AnnotationReport, OverlayError> {
    let selectors = RoomSelectors::compile(&config.selectors, &config.badge.class_name)?;
    let rows = dom::all_matches(&page.document(), &selectors.row);
    tracing::debug!(rows = rows.len(), "found room rows on live page");

    if rows.is_empty() {
        log_missing_rows(page, &config.selectors.property_room_row);
        return Ok(AnnotationReport::default());
    }

    let mut report = AnnotationReport {
        listings: rows.len(),
        ..AnnotationReport::default()
    };
    for (position, row) in rows.iter().enumerate() {
        match annotate_row(page, row, index, &selectors, config) {
            Ok(Outcome::Inserted) => report.inserted += 1,
            Ok(Outcome::AlreadyMarked) => report.already_marked += 1,
            Ok(Outcome::NoRecord) => {}
            Err(err) => {
                report.failed += 1;
                tracing::warn!(position, error = %err, "failed to annotate room row");
            }
        }
    }
    Ok(report)
}

fn annotate_row(
    page: &LivePage,
    row: &NodeRef,
    index: &PriceIndex,
    selectors: &RoomSelectors,
    config: &OverlayConfig,
) -> Result<Outcome, OverlayError> {
    let Some(block_id) = dom::attr(row, BLOCK_ID_ATTR).filter(|id| !id.trim().is_empty()) else {
        return Ok(Outcome::NoRecord);
    };
    let Some(record) = index.get(block_id.trim()) else {
        return Ok(Outcome::NoRecord);
    };
    if dom::first_match(row, &selectors.badge).is_some() {
        return Ok(Outcome::AlreadyMarked);
    }

    let price_cell = dom::first_match(row, &selectors.price_cell).ok_or_else(|| {
        OverlayError::MissingAnchor {
            key: block_id.clone(),
        }
    })?;
    let badge = build_badge(&config.badge, &record.display_text, BLOCK_ID_ATTR, &block_id)?;

    let inserted = if let Some(note) = dom::first_match(&price_cell, &selectors.taxes_note) {
        page.insert_before(&note, badge)
    } else {
        let target = dom::first_match(row, &selectors.price_block).unwrap_or(price_cell);
        page.append(&target, badge);
        true
    };
    if !inserted {
        return Err(OverlayError::MissingAnchor { key: block_id });
    }

    log_inserted(&block_id, record);
    Ok(Outcome::Inserted)
}

fn log_missing_rows(page: &LivePage, row_selector: &str) {
    let with_block_id = page
        .select_all(&format!("[{BLOCK_ID_ATTR}]"))
        .unwrap_or_default();
    let first_tag = with_block_id.first().and_then(dom::tag_name);
    tracing::warn!(
        selector = %row_selector,
        elements_with_block_id = with_block_id.len(),
        first_tag = first_tag.as_deref().unwrap_or("none"),
        "no room rows in live page; the row selector may have drifted"
    );
}

fn log_inserted(key: &str, record: &PriceRecord) {
    tracing::debug!(listing = key, price = %record.display_text, "injected mobile price badge");
}

#[cfg(test)]
#[path = "annotate_test.rs"]
mod tests;
