//! Live-page side of the mobile price overlay: badge annotation, change
//! monitoring and lifecycle control over a mutable DOM.
//!
//! Everything here is single-threaded and must run inside a
//! `tokio::task::LocalSet` on a current-thread runtime.

pub mod annotate;
pub mod dom;
pub mod error;
pub mod lifecycle;
pub mod monitor;
pub mod mutation;
pub mod page;
pub mod pipeline;
pub mod style;

use std::rc::Rc;

use mobprice_core::OverlayConfig;
use mobprice_scraper::MobileClient;

pub use annotate::{annotate, build_badge, AnnotationReport};
pub use error::OverlayError;
pub use lifecycle::{Lifecycle, LifecycleState, NavigationWatcher};
pub use monitor::{ChangeMonitor, MonitorStats};
pub use mutation::{MutationFilter, MutationVerdict, Reaction};
pub use page::{
    LivePage, MutationBatch, MutationObserver, MutationRecord, NavigationEvent, NavigationKind,
    ReadyState,
};
pub use pipeline::index_for_page;
pub use style::{inject_styles, stylesheet};

/// A running overlay: the lifecycle plus its navigation watcher.
pub struct Overlay {
    lifecycle: Rc<Lifecycle>,
    watcher: NavigationWatcher,
}

impl Overlay {
    /// Starts the first lifecycle run and the navigation watcher on the
    /// current `LocalSet`.
    ///
    /// # Errors
    ///
    /// - [`OverlayError::Config`] if a configured selector does not compile.
    /// - [`OverlayError::Fetch`] if the HTTP client cannot be built.
    pub fn start(page: LivePage, config: OverlayConfig) -> Result<Self, OverlayError> {
        config.selectors.validate()?;
        let client = MobileClient::from_config(&config)?;
        let lifecycle = Rc::new(Lifecycle::new(page, client, Rc::new(config)));
        lifecycle.start();
        let watcher = NavigationWatcher::spawn(Rc::clone(&lifecycle));
        Ok(Self { lifecycle, watcher })
    }

    #[must_use]
    pub fn lifecycle(&self) -> &Rc<Lifecycle> {
        &self.lifecycle
    }

    /// Stops watching for navigation and tears down the active run and
    /// monitor.
    pub fn shutdown(self) {
        self.watcher.stop();
        self.lifecycle.teardown();
    }
}
