use std::borrow::Borrow;
use std::collections::HashMap;

use serde::Serialize;

/// Identifies one listing within a page: a normalized display name on search
/// pages, an opaque block id on property pages. Only unique within the
/// listing collection of a single page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ListingKey(String);

impl ListingKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ListingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ListingKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ListingKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ListingKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Alternate-rendering price for one listing.
///
/// A record exists only for listings that carried the mobile-only deal
/// marker; a missing record means "no deal detected", never "zero price".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRecord {
    /// Pre-formatted price, rendered as-is inside the badge.
    pub display_text: String,
    /// Unformatted amount, present only when the source exposed one
    /// (structured data). Enables locale-free comparison.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_amount: Option<f64>,
}

impl PriceRecord {
    /// A record scraped from rendered markup; no numeric amount is known.
    #[must_use]
    pub fn from_text(display_text: impl Into<String>) -> Self {
        Self {
            display_text: display_text.into(),
            raw_amount: None,
        }
    }

    #[must_use]
    pub fn with_amount(display_text: impl Into<String>, raw_amount: f64) -> Self {
        Self {
            display_text: display_text.into(),
            raw_amount: Some(raw_amount),
        }
    }
}

/// Immutable mapping from [`ListingKey`] to [`PriceRecord`].
///
/// Built fresh by every full pipeline run; a newer index replaces an older
/// one and is never merged into it. When the same key is collected twice the
/// later record wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PriceIndex {
    records: HashMap<ListingKey, PriceRecord>,
}

impl PriceIndex {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PriceRecord> {
        self.records.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ListingKey, &PriceRecord)> {
        self.records.iter()
    }

    /// Consumes the index and returns a new one holding only the records for
    /// which `keep` returns `true`.
    #[must_use]
    pub fn retain_where<F>(self, mut keep: F) -> Self
    where
        F: FnMut(&ListingKey, &PriceRecord) -> bool,
    {
        self.records
            .into_iter()
            .filter(|(key, record)| keep(key, record))
            .collect()
    }
}

impl FromIterator<(ListingKey, PriceRecord)> for PriceIndex {
    fn from_iter<I: IntoIterator<Item = (ListingKey, PriceRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PriceIndex {
        [
            (ListingKey::from("Hotel A"), PriceRecord::from_text("$120")),
            (
                ListingKey::from("Hotel B"),
                PriceRecord::with_amount("₪2,407", 2407.0),
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn lookup_by_str() {
        let index = sample();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("Hotel A").unwrap().display_text, "$120");
        assert!(index.get("Hotel A").unwrap().raw_amount.is_none());
        assert_eq!(index.get("Hotel B").unwrap().raw_amount, Some(2407.0));
        assert!(index.get("Hotel C").is_none());
    }

    #[test]
    fn later_duplicate_wins() {
        let index: PriceIndex = [
            (ListingKey::from("42"), PriceRecord::from_text("€90")),
            (ListingKey::from("42"), PriceRecord::from_text("€85")),
        ]
        .into_iter()
        .collect();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("42").unwrap().display_text, "€85");
    }

    #[test]
    fn retain_where_builds_new_index() {
        let index = sample().retain_where(|_, record| record.raw_amount.is_none());
        assert_eq!(index.len(), 1);
        assert!(index.contains("Hotel A"));
    }

    #[test]
    fn empty_index_is_empty() {
        assert!(PriceIndex::empty().is_empty());
        assert_eq!(PriceIndex::empty().len(), 0);
    }

    #[test]
    fn serializes_as_plain_map() {
        let index: PriceIndex = [(ListingKey::from("Hotel A"), PriceRecord::from_text("$120"))]
            .into_iter()
            .collect();
        let json = serde_json::to_value(&index).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"Hotel A": {"display_text": "$120"}})
        );
    }
}
