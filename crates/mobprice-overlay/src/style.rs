use kuchiki::NodeRef;
use mobprice_core::BadgeConfig;

use crate::dom;
use crate::error::OverlayError;
use crate::page::LivePage;

/// Attribute marking the injected `<style>` element.
pub const STYLE_MARKER_ATTR: &str = "data-mobile-price-viewer";

const BADGE_CSS: &str = r"
.{badge} {
    display: flex;
    align-items: center;
    gap: 5px;
    padding: 4px 10px;
    margin-top: 6px;
    margin-bottom: 0;
    background: linear-gradient(135deg, #e8f5e9 0%, #c8e6c9 100%);
    border: 1px solid #81c784;
    border-radius: 4px;
    font-size: 12px;
    font-weight: 600;
    color: #2e7d32;
    box-shadow: 0 1px 2px rgba(0, 0, 0, 0.1);
    transition: all 0.2s ease;
    cursor: help;
    position: relative;
    width: 100%;
    max-width: max-content;
}

.{badge}:hover {
    transform: translateY(-1px);
    box-shadow: 0 2px 4px rgba(0, 0, 0, 0.15);
    background: linear-gradient(135deg, #c8e6c9 0%, #a5d6a7 100%);
}

.{badge}-icon {
    font-size: 14px;
    flex-shrink: 0;
}

.{badge}-text {
    line-height: 1;
}

.{badge}::after {
    content: attr(data-tooltip);
    position: absolute;
    bottom: 100%;
    left: 50%;
    transform: translateX(-50%) translateY(-8px);
    padding: 8px 12px;
    background: #1a1a1a;
    color: #fff;
    font-size: 12px;
    font-weight: 500;
    border-radius: 4px;
    white-space: nowrap;
    opacity: 0;
    pointer-events: none;
    transition: opacity 0.2s ease, transform 0.2s ease;
    z-index: 1000;
}

.{badge}::before {
    content: '';
    position: absolute;
    bottom: 100%;
    left: 50%;
    transform: translateX(-50%);
    border: 6px solid transparent;
    border-top-color: #1a1a1a;
    opacity: 0;
    pointer-events: none;
    transition: opacity 0.2s ease;
    z-index: 1000;
}

.{badge}:hover::after,
.{badge}:hover::before {
    opacity: 1;
    transform: translateX(-50%) translateY(-4px);
}

.{badge}:hover::before {
    transform: translateX(-50%) translateY(0);
}

.{highlight} {
    outline: 2px solid #81c784;
    outline-offset: -2px;
    border-radius: 8px;
}
";

/// Badge and highlight rules for the configured class names.
#[must_use]
pub fn stylesheet(badge: &BadgeConfig) -> String {
    BADGE_CSS
        .replace("{badge}", &badge.class_name)
        .replace("{highlight}", &badge.highlight_class)
}

/// Adds the overlay stylesheet to `<head>` unless a previous run already
/// did. Returns `true` when a `<style>` element was inserted.
///
/// # Errors
///
/// Returns [`OverlayError::Markup`] if the `<style>` element cannot be built.
pub fn inject_styles(page: &LivePage, badge: &BadgeConfig) -> Result<bool, OverlayError> {
    if !page.select_all(&format!("style[{STYLE_MARKER_ATTR}]"))?.is_empty() {
        return Ok(false);
    }

    let style = dom::create_element("style")?;
    dom::set_attr(&style, STYLE_MARKER_ATTR, "true");
    style.append(NodeRef::new_text(stylesheet(badge)));
    page.append(&page.head(), style);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stylesheet_uses_configured_class_names() {
        let badge = BadgeConfig {
            class_name: "mp-badge".to_string(),
            highlight_class: "mp-hl".to_string(),
            ..BadgeConfig::default()
        };
        let css = stylesheet(&badge);
        assert!(css.contains(".mp-badge {"));
        assert!(css.contains(".mp-badge-icon {"));
        assert!(css.contains(".mp-hl {"));
        assert!(!css.contains("{badge}"));
    }

    #[test]
    fn injects_exactly_once() {
        let page = LivePage::parse(
            "https://www.booking.com/searchresults.html",
            "<html><head><title>x</title></head><body></body></html>",
        );
        let badge = BadgeConfig::default();

        assert!(inject_styles(&page, &badge).unwrap());
        assert!(!inject_styles(&page, &badge).unwrap());

        let styles = page.select_all("head > style[data-mobile-price-viewer]").unwrap();
        assert_eq!(styles.len(), 1);
        assert!(styles[0].text_contents().contains(".mobile-price-badge {"));
    }
}
