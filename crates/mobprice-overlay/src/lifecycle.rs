//! Startup sequencing and navigation handling.
//!
//! One [`Lifecycle`] exists per page. Each run walks
//! `Idle → StylesInjected → AwaitingDomReady → Settling → Fetching →
//! Extracted → Annotated → Monitoring` and stops advancing at the first
//! failure. The lifecycle owns at most one [`ChangeMonitor`]; the previous
//! one is disposed before a new one is installed.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use mobprice_core::{OverlayConfig, PageKind};
use mobprice_scraper::MobileClient;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::annotate::{annotate, AnnotationReport};
use crate::monitor::ChangeMonitor;
use crate::page::LivePage;
use crate::pipeline::index_for_page;
use crate::style::inject_styles;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    StylesInjected,
    AwaitingDomReady,
    Settling,
    Fetching,
    Extracted,
    Annotated,
    Monitoring,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::StylesInjected => "styles-injected",
            LifecycleState::AwaitingDomReady => "awaiting-dom-ready",
            LifecycleState::Settling => "settling",
            LifecycleState::Fetching => "fetching",
            LifecycleState::Extracted => "extracted",
            LifecycleState::Annotated => "annotated",
            LifecycleState::Monitoring => "monitoring",
        };
        f.write_str(name)
    }
}

pub struct Lifecycle {
    page: LivePage,
    client: MobileClient,
    config: Rc<OverlayConfig>,
    state: Cell<LifecycleState>,
    transitions: RefCell<Vec<LifecycleState>>,
    monitor: RefCell<Option<ChangeMonitor>>,
    current_url: RefCell<String>,
    generation: Cell<u64>,
    active_run: RefCell<Option<JoinHandle<LifecycleState>>>,
    last_report: Cell<Option<AnnotationReport>>,
}

impl Lifecycle {
    #[must_use]
    pub fn new(page: LivePage, client: MobileClient, config: Rc<OverlayConfig>) -> Self {
        let current_url = page.url();
        Self {
            page,
            client,
            config,
            state: Cell::new(LifecycleState::Idle),
            transitions: RefCell::new(Vec::new()),
            monitor: RefCell::new(None),
            current_url: RefCell::new(current_url),
            generation: Cell::new(0),
            active_run: RefCell::new(None),
            last_report: Cell::new(None),
        }
    }

    #[must_use]
    pub fn page(&self) -> &LivePage {
        &self.page
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// States entered by the most recent run, in order.
    #[must_use]
    pub fn transitions(&self) -> Vec<LifecycleState> {
        self.transitions.borrow().clone()
    }

    #[must_use]
    pub fn last_report(&self) -> Option<AnnotationReport> {
        self.last_report.get()
    }

    #[must_use]
    pub fn has_monitor(&self) -> bool {
        self.monitor.borrow().is_some()
    }

    /// Borrows the active monitor, if any.
    pub fn with_monitor<R>(&self, f: impl FnOnce(Option<&ChangeMonitor>) -> R) -> R {
        f(self.monitor.borrow().as_ref())
    }

    /// Full run, ending in [`LifecycleState::Monitoring`] on success.
    /// Returns the last state reached.
    pub async fn run(&self) -> LifecycleState {
        self.run_pass(true).await
    }

    /// Same as [`Lifecycle::run`] but stops at [`LifecycleState::Annotated`]
    /// without installing a monitor.
    pub async fn run_to_annotated(&self) -> LifecycleState {
        self.run_pass(false).await
    }

    async fn run_pass(&self, install_monitor: bool) -> LifecycleState {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        self.transitions.borrow_mut().clear();
        self.enter(LifecycleState::Idle);

        let context = self.page.context();
        if !context.kind.is_supported() {
            tracing::info!(url = %context.url, "not a supported page type; overlay stays idle");
            return self.state();
        }
        tracing::info!(page_kind = %context.kind, url = %context.url, "initializing mobile price overlay");

        match inject_styles(&self.page, &self.config.badge) {
            Ok(true) => tracing::debug!("overlay styles injected"),
            Ok(false) => {}
            Err(err) => tracing::warn!(error = %err, "could not inject overlay styles"),
        }
        self.enter(LifecycleState::StylesInjected);

        self.enter(LifecycleState::AwaitingDomReady);
        self.page.wait_until_ready().await;
        if self.superseded(generation) {
            return self.state();
        }

        self.enter(LifecycleState::Settling);
        tokio::time::sleep(self.config.initial_wait()).await;
        if self.superseded(generation) {
            return self.state();
        }

        self.dispose_monitor();
        self.enter(LifecycleState::Fetching);
        let html = match self.client.fetch_mobile(&context.url).await {
            Ok(html) => html,
            Err(err) => {
                tracing::warn!(error = %err, url = %context.url, "failed to fetch mobile page; stopping this run");
                return self.state();
            }
        };
        if self.superseded(generation) {
            return self.state();
        }

        let index = index_for_page(&self.page, context.kind, &html, &self.config.selectors);
        self.enter(LifecycleState::Extracted);

        let report = annotate(&self.page, context.kind, &index, &self.config);
        self.last_report.set(Some(report));
        self.enter(LifecycleState::Annotated);

        if !install_monitor {
            return self.state();
        }

        self.dispose_monitor();
        match ChangeMonitor::install(
            &self.page,
            context.kind,
            index,
            self.client.clone(),
            Rc::clone(&self.config),
        ) {
            Ok(monitor) => {
                *self.monitor.borrow_mut() = Some(monitor);
                self.enter(LifecycleState::Monitoring);
            }
            Err(err) => tracing::warn!(error = %err, "could not install change monitor"),
        }
        self.state()
    }

    /// Spawns a run on the current `LocalSet`, aborting any run still in
    /// progress.
    pub fn start(self: &Rc<Self>) {
        let this = Rc::clone(self);
        let handle = tokio::task::spawn_local(async move { this.run().await });
        if let Some(previous) = self.active_run.borrow_mut().replace(handle) {
            previous.abort();
        }
    }

    /// Reacts to a possible URL change. Idempotent: returns `false` without
    /// doing anything when the URL is the one already handled.
    ///
    /// On a change the active monitor is disposed and the state resets to
    /// `Idle`; a new run starts only when the new URL is a supported page.
    pub fn on_url_changed(self: &Rc<Self>) -> bool {
        let url = self.page.url();
        if *self.current_url.borrow() == url {
            return false;
        }
        let previous = self.current_url.replace(url.clone());
        let kind = PageKind::classify(&url);
        tracing::info!(from = %previous, to = %url, page_kind = %kind, "URL changed");

        self.teardown();
        if kind.is_supported() {
            tracing::info!(page_kind = %kind, "reinitializing after navigation");
            self.start();
        }
        true
    }

    /// Aborts any run in progress and disposes the active monitor.
    pub fn teardown(&self) {
        if let Some(run) = self.active_run.borrow_mut().take() {
            run.abort();
        }
        self.generation.set(self.generation.get() + 1);
        self.dispose_monitor();
        self.state.set(LifecycleState::Idle);
    }

    fn superseded(&self, generation: u64) -> bool {
        let superseded = self.generation.get() != generation;
        if superseded {
            tracing::debug!(generation, "run superseded by navigation");
        }
        superseded
    }

    fn dispose_monitor(&self) {
        if let Some(monitor) = self.monitor.borrow_mut().take() {
            tracing::debug!("disposing previous change monitor");
            monitor.dispose();
        }
    }

    fn enter(&self, state: LifecycleState) {
        tracing::debug!(state = %state, "lifecycle transition");
        self.state.set(state);
        self.transitions.borrow_mut().push(state);
    }
}

/// Two sources feeding one URL-changed handler: a low-frequency poll, and
/// the page's history navigation events.
pub struct NavigationWatcher {
    task: JoinHandle<()>,
}

impl NavigationWatcher {
    /// Must be called from within a `tokio::task::LocalSet`.
    #[must_use]
    pub fn spawn(lifecycle: Rc<Lifecycle>) -> Self {
        let mut events = lifecycle.page().navigation_events();
        let period = lifecycle.config.nav_check_interval();

        let task = tokio::task::spawn_local(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut events_open = true;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    event = events.recv(), if events_open => {
                        let Some(event) = event else {
                            events_open = false;
                            continue;
                        };
                        tracing::debug!(kind = ?event.kind, url = %event.url, "history navigation");
                    }
                }
                lifecycle.on_url_changed();
            }
        });
        Self { task }
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for NavigationWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
