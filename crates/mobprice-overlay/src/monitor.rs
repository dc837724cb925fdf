//! Keeps annotations in step with a page that keeps re-rendering itself.
//!
//! The monitor watches the live page's mutation stream and reacts on two
//! independently debounced paths:
//!
//! - **Reprocess**: new listing elements appeared. Refetch the mobile
//!   rendering, rebuild the index, re-annotate. A newer reprocess cancels a
//!   fetch still in flight, and every fetch is stamped with a sequence number
//!   so a result that is not from the latest fetch is discarded.
//! - **Reinject**: the host page dropped badges. Re-annotate from the cached
//!   index without touching the network.
//!
//! All of it runs as one local task, polled by a single `select!` loop, so
//! reactions never overlap.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use futures::future::OptionFuture;
use mobprice_core::{OverlayConfig, PageKind, PriceIndex};
use mobprice_scraper::{MobileClient, ScraperError};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::annotate::annotate;
use crate::error::OverlayError;
use crate::mutation::{MutationFilter, Reaction};
use crate::page::{LivePage, MutationObserver, ObserverHandle};
use crate::pipeline::index_for_page;

type FetchFuture = Pin<Box<dyn Future<Output = (u64, Result<String, ScraperError>)>>>;

/// Counters for what a monitor has done so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MonitorStats {
    /// Refetches started.
    pub reprocess_runs: usize,
    pub reinject_runs: usize,
    /// In-flight fetches cancelled by a newer reprocess.
    pub superseded_fetches: usize,
    pub stale_results: usize,
    pub failed_fetches: usize,
}

struct Shared {
    index: RefCell<PriceIndex>,
    stats: Cell<MonitorStats>,
}

impl Shared {
    fn record(&self, update: impl FnOnce(&mut MonitorStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }
}

/// Handle to a running monitor. Dropping it (or calling
/// [`ChangeMonitor::dispose`]) disconnects the observer, clears pending
/// debounces and cancels any in-flight fetch.
pub struct ChangeMonitor {
    kind: PageKind,
    observer: ObserverHandle,
    task: JoinHandle<()>,
    shared: Rc<Shared>,
}

impl ChangeMonitor {
    /// Starts observing `page`, seeded with `index`.
    ///
    /// Must be called from within a `tokio::task::LocalSet`.
    ///
    /// # Errors
    ///
    /// - [`OverlayError::UnsupportedPage`] if `kind` is not a supported layout.
    /// - [`OverlayError::Selector`] if the listing selector does not compile.
    pub fn install(
        page: &LivePage,
        kind: PageKind,
        index: PriceIndex,
        client: MobileClient,
        config: Rc<OverlayConfig>,
    ) -> Result<Self, OverlayError> {
        let listing_selector = match kind {
            PageKind::Search => config.selectors.hotel_card.as_str(),
            PageKind::Property => config.selectors.property_room_row.as_str(),
            PageKind::Unsupported => {
                return Err(OverlayError::UnsupportedPage { url: page.url() });
            }
        };
        let filter = MutationFilter::new(listing_selector, &config.badge.class_name)?;

        let observer = page.observe();
        let handle = observer.handle();
        let deals = index.len();
        let shared = Rc::new(Shared {
            index: RefCell::new(index),
            stats: Cell::new(MonitorStats::default()),
        });

        let worker = Worker {
            page: page.clone(),
            kind,
            client,
            config,
            filter,
            observer,
            shared: Rc::clone(&shared),
        };
        let task = tokio::task::spawn_local(worker.run());

        tracing::info!(page_kind = %kind, deals, "change monitor installed");
        Ok(Self {
            kind,
            observer: handle,
            task,
            shared,
        })
    }

    #[must_use]
    pub fn kind(&self) -> PageKind {
        self.kind
    }

    /// Snapshot of the cached index.
    #[must_use]
    pub fn index(&self) -> PriceIndex {
        self.shared.index.borrow().clone()
    }

    #[must_use]
    pub fn stats(&self) -> MonitorStats {
        self.shared.stats.get()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.observer.is_connected() && !self.task.is_finished()
    }

    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for ChangeMonitor {
    fn drop(&mut self) {
        self.observer.disconnect();
        self.task.abort();
        tracing::debug!(page_kind = %self.kind, "change monitor disposed");
    }
}

struct Worker {
    page: LivePage,
    kind: PageKind,
    client: MobileClient,
    config: Rc<OverlayConfig>,
    filter: MutationFilter,
    observer: MutationObserver,
    shared: Rc<Shared>,
}

impl Worker {
    async fn run(mut self) {
        let mut reprocess_at: Option<Instant> = None;
        let mut reinject_at: Option<Instant> = None;
        let mut in_flight: Option<FetchFuture> = None;
        let mut sequence: u64 = 0;

        loop {
            tokio::select! {
                batch = self.observer.next_batch() => {
                    let Some(batch) = batch else {
                        tracing::debug!("observer disconnected; monitor stopping");
                        break;
                    };
                    match self.filter.analyze(&batch).reaction() {
                        Some(Reaction::Reprocess) => {
                            tracing::debug!(page_kind = %self.kind, "new listings detected; scheduling reprocess");
                            reprocess_at = Some(Instant::now() + self.config.debounce_delay());
                        }
                        Some(Reaction::Reinject) => {
                            tracing::debug!(page_kind = %self.kind, "badges removed; scheduling reinject");
                            reinject_at = Some(Instant::now() + self.config.reinject_delay());
                        }
                        None => {}
                    }
                }
                () = sleep_until(reprocess_at.unwrap_or_else(Instant::now)), if reprocess_at.is_some() => {
                    reprocess_at = None;
                    sequence += 1;
                    if in_flight.take().is_some() {
                        tracing::debug!(sequence, "cancelling superseded fetch");
                        self.shared.record(|s| s.superseded_fetches += 1);
                    }
                    in_flight = Some(self.start_fetch(sequence));
                }
                () = sleep_until(reinject_at.unwrap_or_else(Instant::now)), if reinject_at.is_some() => {
                    reinject_at = None;
                    self.reinject();
                }
                Some((fetched, result)) = OptionFuture::from(in_flight.as_mut()), if in_flight.is_some() => {
                    in_flight = None;
                    self.finish_fetch(fetched, sequence, result);
                }
            }
        }
    }

    fn start_fetch(&self, sequence: u64) -> FetchFuture {
        let client = self.client.clone();
        let url = self.page.url();
        tracing::debug!(sequence, url = %url, "refetching mobile rendering");
        self.shared.record(|s| s.reprocess_runs += 1);
        Box::pin(async move {
            let result = client.fetch_mobile(&url).await;
            (sequence, result)
        })
    }

    fn finish_fetch(&self, fetched: u64, latest: u64, result: Result<String, ScraperError>) {
        if fetched != latest {
            tracing::debug!(fetched, latest, "discarding stale fetch result");
            self.shared.record(|s| s.stale_results += 1);
            return;
        }
        match result {
            Ok(html) => {
                let index = index_for_page(&self.page, self.kind, &html, &self.config.selectors);
                tracing::info!(deals = index.len(), "refreshed mobile prices");
                annotate(&self.page, self.kind, &index, &self.config);
                *self.shared.index.borrow_mut() = index;
            }
            Err(err) => {
                self.shared.record(|s| s.failed_fetches += 1);
                tracing::warn!(error = %err, "failed to refetch mobile page");
            }
        }
    }

    fn reinject(&self) {
        self.shared.record(|s| s.reinject_runs += 1);
        let index = self.shared.index.borrow();
        if index.is_empty() {
            return;
        }
        annotate(&self.page, self.kind, &index, &self.config);
    }
}
