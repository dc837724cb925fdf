pub mod app_config;
pub mod config;
pub mod listing;
pub mod page;
pub mod selectors;

pub use app_config::{BadgeConfig, OverlayConfig};
pub use config::{load_overlay_config, load_overlay_config_from_env};
pub use listing::{ListingKey, PriceIndex, PriceRecord};
pub use page::{PageContext, PageKind};
pub use selectors::{load_selectors, SelectorSet};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read selector file {path}: {source}")]
    SelectorFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse selector file: {0}")]
    SelectorFileParse(#[from] serde_yaml::Error),

    #[error("invalid CSS selector for {name}: \"{selector}\"")]
    InvalidSelector { name: String, selector: String },
}
