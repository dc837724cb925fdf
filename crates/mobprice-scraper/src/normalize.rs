//! Text normalization shared by both renderings, so that a title scraped
//! from the mobile document and one read from the live page produce the
//! same [`ListingKey`](mobprice_core::ListingKey).

/// Trims, maps non-breaking spaces to spaces, and collapses whitespace runs
/// into a single space.
#[must_use]
pub fn normalize_text(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '\u{00A0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
