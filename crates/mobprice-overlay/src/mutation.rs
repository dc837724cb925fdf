//! Classification of mutation batches into monitor reactions.

use kuchiki::iter::NodeIterator;
use kuchiki::{NodeRef, Selectors};

use crate::dom;
use crate::error::OverlayError;
use crate::page::MutationRecord;

/// What a batch calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// New listings appeared: refetch, re-extract, re-annotate.
    Reprocess,
    /// The host dropped badges: re-annotate from the cached index.
    Reinject,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MutationVerdict {
    pub should_reprocess: bool,
    pub should_reinject: bool,
}

impl MutationVerdict {
    /// Reprocess wins when both apply; it re-annotates anyway.
    #[must_use]
    pub fn reaction(self) -> Option<Reaction> {
        if self.should_reprocess {
            Some(Reaction::Reprocess)
        } else if self.should_reinject {
            Some(Reaction::Reinject)
        } else {
            None
        }
    }
}

pub struct MutationFilter {
    listing: Selectors,
    badge_class: String,
}

impl MutationFilter {
    /// # Errors
    ///
    /// Returns [`OverlayError::Selector`] if `listing_selector` does not
    /// compile.
    pub fn new(listing_selector: &str, badge_class: &str) -> Result<Self, OverlayError> {
        Ok(Self {
            listing: dom::compile(listing_selector)?,
            badge_class: badge_class.to_string(),
        })
    }

    #[must_use]
    pub fn analyze(&self, batch: &[MutationRecord]) -> MutationVerdict {
        let mut verdict = MutationVerdict::default();
        for record in batch {
            if !verdict.should_reprocess
                && record.added.iter().any(|node| self.introduces_listing(node))
            {
                verdict.should_reprocess = true;
            }
            if !verdict.should_reinject
                && record
                    .removed
                    .iter()
                    .any(|node| dom::contains_class(node, &self.badge_class))
            {
                verdict.should_reinject = true;
            }
        }
        verdict
    }

    /// An added node counts when it is, or contains, a listing element.
    /// Our own badges never do.
    fn introduces_listing(&self, node: &NodeRef) -> bool {
        if dom::has_class(node, &self.badge_class) {
            return false;
        }
        node.inclusive_descendants()
            .elements()
            .any(|el| self.listing.matches(&el))
    }
}
