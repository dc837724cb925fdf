use std::path::PathBuf;

use crate::app_config::{BadgeConfig, OverlayConfig, PRICE_PLACEHOLDER};
use crate::selectors::{load_selectors, SelectorSet};
use crate::ConfigError;

/// Load overlay configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is invalid or the selector file cannot
/// be loaded.
pub fn load_overlay_config() -> Result<OverlayConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_overlay_config_from_env()
}

/// Load overlay configuration from environment variables already in the process.
///
/// Unlike [`load_overlay_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is invalid or the selector file cannot
/// be loaded.
pub fn load_overlay_config_from_env() -> Result<OverlayConfig, ConfigError> {
    build_overlay_config(|key| std::env::var(key))
}

/// Build overlay configuration using the provided env-var lookup function.
///
/// Every variable is optional; unset variables keep the defaults from
/// [`OverlayConfig::default`].
fn build_overlay_config<F>(lookup: F) -> Result<OverlayConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let defaults = OverlayConfig::default();
    let default_badge = BadgeConfig::default();

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_ms = |var: &str, default: u64| -> Result<u64, ConfigError> {
        match lookup(var) {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Ok(default),
        }
    };

    let debounce_delay_ms = parse_ms("MOBPRICE_DEBOUNCE_DELAY_MS", defaults.debounce_delay_ms)?;
    let reinject_delay_ms = parse_ms("MOBPRICE_REINJECT_DELAY_MS", defaults.reinject_delay_ms)?;
    let network_timeout_ms = parse_ms("MOBPRICE_NETWORK_TIMEOUT_MS", defaults.network_timeout_ms)?;
    let initial_wait_ms = parse_ms("MOBPRICE_INITIAL_WAIT_MS", defaults.initial_wait_ms)?;
    let nav_check_interval_ms = parse_ms(
        "MOBPRICE_NAV_CHECK_INTERVAL_MS",
        defaults.nav_check_interval_ms,
    )?;

    if network_timeout_ms == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "MOBPRICE_NETWORK_TIMEOUT_MS".to_string(),
            reason: "timeout must be greater than zero".to_string(),
        });
    }
    if nav_check_interval_ms == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "MOBPRICE_NAV_CHECK_INTERVAL_MS".to_string(),
            reason: "interval must be greater than zero".to_string(),
        });
    }

    let debug = parse_bool(&or_default("MOBPRICE_DEBUG", "false"))?;

    let badge = BadgeConfig {
        icon: or_default("MOBPRICE_BADGE_ICON", &default_badge.icon),
        text_format: or_default("MOBPRICE_BADGE_TEXT_FORMAT", &default_badge.text_format),
        tooltip: or_default("MOBPRICE_TOOLTIP_TEXT", &default_badge.tooltip),
        class_name: or_default("MOBPRICE_BADGE_CLASS", &default_badge.class_name),
        highlight_class: or_default("MOBPRICE_HIGHLIGHT_CLASS", &default_badge.highlight_class),
    };

    if !badge.text_format.contains(PRICE_PLACEHOLDER) {
        return Err(ConfigError::InvalidEnvVar {
            var: "MOBPRICE_BADGE_TEXT_FORMAT".to_string(),
            reason: format!("format must contain the {PRICE_PLACEHOLDER} placeholder"),
        });
    }
    for (var, class) in [
        ("MOBPRICE_BADGE_CLASS", &badge.class_name),
        ("MOBPRICE_HIGHLIGHT_CLASS", &badge.highlight_class),
    ] {
        if !is_class_name(class) {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("\"{class}\" is not a usable CSS class name"),
            });
        }
    }

    let selectors = match lookup("MOBPRICE_SELECTORS_PATH") {
        Ok(path) => load_selectors(&PathBuf::from(path))?,
        Err(_) => SelectorSet::default(),
    };

    Ok(OverlayConfig {
        mobile_user_agent: or_default("MOBPRICE_MOBILE_USER_AGENT", &defaults.mobile_user_agent),
        debounce_delay_ms,
        reinject_delay_ms,
        network_timeout_ms,
        initial_wait_ms,
        nav_check_interval_ms,
        badge,
        debug,
        log_level: or_default("MOBPRICE_LOG_LEVEL", &defaults.log_level),
        selectors,
    })
}

fn parse_bool(raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: "MOBPRICE_DEBUG".to_string(),
            reason: format!("expected a boolean, got \"{other}\""),
        }),
    }
}

/// Class names are spliced into selectors, so keep them to identifier chars.
fn is_class_name(class: &str) -> bool {
    !class.is_empty()
        && !class.starts_with(|c: char| c.is_ascii_digit())
        && class
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
