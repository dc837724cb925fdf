use std::time::Duration;

use crate::selectors::SelectorSet;

pub const DEFAULT_MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 16) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.7390.123 Mobile Safari/537.36";

/// Placeholder replaced by the price text in [`BadgeConfig::text_format`].
pub const PRICE_PLACEHOLDER: &str = "{price}";

/// How a badge looks. Class names double as the annotation marker, so
/// changing them between runs orphans existing badges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeConfig {
    pub icon: String,
    pub text_format: String,
    pub tooltip: String,
    pub class_name: String,
    pub highlight_class: String,
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            icon: "📱".to_string(),
            text_format: "Mobile: {price}".to_string(),
            tooltip: "This property has a lower price on mobile devices".to_string(),
            class_name: "mobile-price-badge".to_string(),
            highlight_class: "mobile-price-highlight".to_string(),
        }
    }
}

impl BadgeConfig {
    /// Badge label for a price, e.g. `"Mobile: $120"`.
    #[must_use]
    pub fn render_text(&self, price: &str) -> String {
        self.text_format.replace(PRICE_PLACEHOLDER, price)
    }

    #[must_use]
    pub fn icon_class(&self) -> String {
        format!("{}-icon", self.class_name)
    }

    #[must_use]
    pub fn text_class(&self) -> String {
        format!("{}-text", self.class_name)
    }
}

/// Static options for the overlay. There is no runtime reconfiguration:
/// build one at startup and share it by reference.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub mobile_user_agent: String,
    /// Quiet period before a full refetch after new listings appear.
    pub debounce_delay_ms: u64,
    /// Quiet period before re-applying cached badges the host page dropped.
    pub reinject_delay_ms: u64,
    pub network_timeout_ms: u64,
    /// Pause after DOM-ready so client-side rendering can settle.
    pub initial_wait_ms: u64,
    pub nav_check_interval_ms: u64,
    pub badge: BadgeConfig,
    pub debug: bool,
    pub log_level: String,
    pub selectors: SelectorSet,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            mobile_user_agent: DEFAULT_MOBILE_USER_AGENT.to_string(),
            debounce_delay_ms: 500,
            reinject_delay_ms: 100,
            network_timeout_ms: 10_000,
            initial_wait_ms: 1_000,
            nav_check_interval_ms: 2_000,
            badge: BadgeConfig::default(),
            debug: false,
            log_level: "info".to_string(),
            selectors: SelectorSet::default(),
        }
    }
}

impl OverlayConfig {
    #[must_use]
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_delay_ms)
    }

    #[must_use]
    pub fn reinject_delay(&self) -> Duration {
        Duration::from_millis(self.reinject_delay_ms)
    }

    #[must_use]
    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.network_timeout_ms)
    }

    #[must_use]
    pub fn initial_wait(&self) -> Duration {
        Duration::from_millis(self.initial_wait_ms)
    }

    #[must_use]
    pub fn nav_check_interval(&self) -> Duration {
        Duration::from_millis(self.nav_check_interval_ms)
    }

    /// Log filter used when `RUST_LOG` is unset: `debug` forces the crate
    /// targets to debug level regardless of `log_level`.
    #[must_use]
    pub fn default_log_filter(&self) -> String {
        if self.debug {
            "info,mobprice_core=debug,mobprice_scraper=debug,mobprice_overlay=debug".to_string()
        } else {
            self.log_level.clone()
        }
    }
}
