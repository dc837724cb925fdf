//! Small helpers over the `kuchiki` tree used by the live page and the
//! annotator.

use kuchiki::iter::NodeIterator;
use kuchiki::traits::TendrilSink;
use kuchiki::{NodeRef, Selectors};
use mobprice_scraper::normalize::normalize_text;

use crate::error::OverlayError;

/// Compiles a selector list against the live document.
///
/// # Errors
///
/// Returns [`OverlayError::Selector`] if `kuchiki` cannot parse `selector`.
pub fn compile(selector: &str) -> Result<Selectors, OverlayError> {
    Selectors::compile(selector).map_err(|()| OverlayError::Selector {
        selector: selector.to_string(),
    })
}

/// Every element strictly below `root` matching `selectors`, in document
/// order.
#[must_use]
pub fn all_matches(root: &NodeRef, selectors: &Selectors) -> Vec<NodeRef> {
    root.descendants()
        .elements()
        .filter(|el| selectors.matches(el))
        .map(|el| el.as_node().clone())
        .collect()
}

/// First element strictly below `root` matching `selectors`.
#[must_use]
pub fn first_match(root: &NodeRef, selectors: &Selectors) -> Option<NodeRef> {
    root.descendants()
        .elements()
        .find(|el| selectors.matches(el))
        .map(|el| el.as_node().clone())
}

/// Nearest element matching `selectors`, starting at `node` itself and
/// walking up.
#[must_use]
pub fn closest(node: &NodeRef, selectors: &Selectors) -> Option<NodeRef> {
    node.inclusive_ancestors()
        .elements()
        .find(|el| selectors.matches(el))
        .map(|el| el.as_node().clone())
}

/// Parent of `node` when that parent is an element (not the document).
#[must_use]
pub fn parent_element(node: &NodeRef) -> Option<NodeRef> {
    node.parent().filter(|parent| parent.as_element().is_some())
}

#[must_use]
pub fn attr(node: &NodeRef, name: &str) -> Option<String> {
    node.as_element()
        .and_then(|el| el.attributes.borrow().get(name).map(str::to_string))
}

pub fn set_attr(node: &NodeRef, name: &str, value: &str) {
    if let Some(el) = node.as_element() {
        el.attributes.borrow_mut().insert(name, value.to_string());
    }
}

#[must_use]
pub fn has_class(node: &NodeRef, class: &str) -> bool {
    attr(node, "class").is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
}

/// Adds `class` to the element's class list. No-op if already present.
pub fn add_class(node: &NodeRef, class: &str) {
    if has_class(node, class) || node.as_element().is_none() {
        return;
    }
    let updated = match attr(node, "class") {
        Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
        _ => class.to_string(),
    };
    set_attr(node, "class", &updated);
}

/// `true` if `node` or any element below it carries `class`.
#[must_use]
pub fn contains_class(node: &NodeRef, class: &str) -> bool {
    node.inclusive_descendants()
        .elements()
        .any(|el| has_class(el.as_node(), class))
}

/// Whitespace-normalized text content.
#[must_use]
pub fn text_of(node: &NodeRef) -> String {
    normalize_text(&node.text_contents())
}

#[must_use]
pub fn tag_name(node: &NodeRef) -> Option<String> {
    node.as_element().map(|el| el.name.local.to_string())
}

/// Creates a detached, empty element.
///
/// # Errors
///
/// Returns [`OverlayError::Markup`] if the parser did not produce a `<tag>`
/// element (e.g. `tag` is not a valid element name).
pub fn create_element(tag: &str) -> Result<NodeRef, OverlayError> {
    let document = kuchiki::parse_html().one(format!("<{tag}></{tag}>"));
    let element = document
        .select_first(tag)
        .map_err(|()| OverlayError::Markup {
            context: format!("<{tag}> element"),
        })?;
    let node = element.as_node().clone();
    node.detach();
    Ok(node)
}

/// Parses `html` as the children of `context` and returns the detached
/// top-level nodes. Table sections and rows get a table wrapper so row
/// markup survives parsing.
#[must_use]
pub fn parse_fragment(context: &NodeRef, html: &str) -> Vec<NodeRef> {
    let context_tag = tag_name(context).unwrap_or_default();
    let (wrapped, container) = match context_tag.as_str() {
        "table" => (format!("<table>{html}</table>"), "table"),
        "tbody" | "thead" | "tfoot" => (format!("<table><tbody>{html}</tbody></table>"), "tbody"),
        "tr" => (format!("<table><tbody><tr>{html}</tr></tbody></table>"), "tr"),
        _ => (format!("<body>{html}</body>"), "body"),
    };

    let document = kuchiki::parse_html().one(wrapped);
    let Ok(container) = document.select_first(container) else {
        return Vec::new();
    };
    let nodes: Vec<NodeRef> = container.as_node().children().collect();
    for node in &nodes {
        node.detach();
    }
    nodes
}
