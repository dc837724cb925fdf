//! The live (desktop) document the overlay runs against.
//!
//! A [`LivePage`] owns a mutable `kuchiki` tree and the two event sources a
//! page-scoped script reacts to: DOM mutations and history navigation. Every
//! structural change made through the page, whether by the host re-rendering
//! or by the annotator inserting badges, is reported to each connected
//! [`MutationObserver`] as a [`MutationBatch`]. Changes made inside
//! [`LivePage::batch`] arrive together; any other change arrives alone.
//!
//! The page is single-threaded (`Rc`, `!Send`). Consumers run on a
//! current-thread runtime inside a `tokio::task::LocalSet`.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use kuchiki::traits::TendrilSink;
use kuchiki::NodeRef;
use mobprice_core::PageContext;
use tokio::sync::{mpsc, watch};

use crate::dom;
use crate::error::OverlayError;

/// Document loading progress, mirroring `document.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

/// One structural change: nodes added to and removed from `target`.
#[derive(Debug, Clone)]
pub struct MutationRecord {
    pub target: NodeRef,
    pub added: Vec<NodeRef>,
    pub removed: Vec<NodeRef>,
}

pub type MutationBatch = Vec<MutationRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    PushState,
    ReplaceState,
    /// Back/forward.
    PopState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEvent {
    pub kind: NavigationKind,
    pub url: String,
}

struct PageInner {
    document: NodeRef,
    url: RefCell<String>,
    ready: watch::Sender<ReadyState>,
    observers: RefCell<Vec<(u64, mpsc::UnboundedSender<MutationBatch>)>>,
    next_observer_id: Cell<u64>,
    navigation: RefCell<Vec<mpsc::UnboundedSender<NavigationEvent>>>,
    batch_depth: Cell<usize>,
    pending: RefCell<MutationBatch>,
}

/// Shared handle to the live document. Cloning is cheap and every clone
/// refers to the same tree.
#[derive(Clone)]
pub struct LivePage {
    inner: Rc<PageInner>,
}

impl std::fmt::Debug for LivePage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivePage")
            .field("url", &*self.inner.url.borrow())
            .field("ready_state", &self.ready_state())
            .field("observers", &self.observer_count())
            .finish_non_exhaustive()
    }
}

impl LivePage {
    /// Parses `html` as a fully loaded document at `url`.
    #[must_use]
    pub fn parse(url: impl Into<String>, html: &str) -> Self {
        Self::with_ready_state(url, html, ReadyState::Complete)
    }

    #[must_use]
    pub fn with_ready_state(url: impl Into<String>, html: &str, state: ReadyState) -> Self {
        let (ready, _) = watch::channel(state);
        Self {
            inner: Rc::new(PageInner {
                document: kuchiki::parse_html().one(html),
                url: RefCell::new(url.into()),
                ready,
                observers: RefCell::new(Vec::new()),
                next_observer_id: Cell::new(0),
                navigation: RefCell::new(Vec::new()),
                batch_depth: Cell::new(0),
                pending: RefCell::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn url(&self) -> String {
        self.inner.url.borrow().clone()
    }

    /// Classifies the current location.
    #[must_use]
    pub fn context(&self) -> PageContext {
        PageContext::from_url(&self.url())
    }

    #[must_use]
    pub fn document(&self) -> NodeRef {
        self.inner.document.clone()
    }

    /// `<head>`, falling back to the document node.
    #[must_use]
    pub fn head(&self) -> NodeRef {
        self.inner
            .document
            .select_first("head")
            .map_or_else(|()| self.document(), |head| head.as_node().clone())
    }

    /// All elements matching `selector`, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::Selector`] if `selector` does not compile.
    pub fn select_all(&self, selector: &str) -> Result<Vec<NodeRef>, OverlayError> {
        let compiled = dom::compile(selector)?;
        Ok(dom::all_matches(&self.inner.document, &compiled))
    }

    /// Raw text content of every element matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::Selector`] if `selector` does not compile.
    pub fn texts_of(&self, selector: &str) -> Result<Vec<String>, OverlayError> {
        Ok(self
            .select_all(selector)?
            .iter()
            .map(NodeRef::text_contents)
            .collect())
    }

    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = Vec::new();
        if let Err(err) = self.inner.document.serialize(&mut out) {
            tracing::warn!(error = %err, "failed to serialize live document");
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    // ---- ready state ----

    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        *self.inner.ready.borrow()
    }

    pub fn set_ready_state(&self, state: ReadyState) {
        self.inner.ready.send_replace(state);
    }

    /// Resolves once the document is past [`ReadyState::Loading`];
    /// immediately if it already is.
    pub async fn wait_until_ready(&self) {
        let mut ready = self.inner.ready.subscribe();
        // The sender lives as long as the page, so this only ends once ready.
        let _ = ready.wait_for(|state| *state != ReadyState::Loading).await;
    }

    // ---- navigation ----

    /// Changes the URL without emitting an event. Only polling notices.
    pub fn set_location(&self, url: impl Into<String>) {
        *self.inner.url.borrow_mut() = url.into();
    }

    pub fn push_state(&self, url: impl Into<String>) {
        self.navigate(NavigationKind::PushState, url.into());
    }

    pub fn replace_state(&self, url: impl Into<String>) {
        self.navigate(NavigationKind::ReplaceState, url.into());
    }

    pub fn pop_state(&self, url: impl Into<String>) {
        self.navigate(NavigationKind::PopState, url.into());
    }

    /// Subscribes to history navigation events.
    #[must_use]
    pub fn navigation_events(&self) -> mpsc::UnboundedReceiver<NavigationEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.navigation.borrow_mut().push(tx);
        rx
    }

    fn navigate(&self, kind: NavigationKind, url: String) {
        self.set_location(url.clone());
        let event = NavigationEvent { kind, url };
        self.inner
            .navigation
            .borrow_mut()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    // ---- mutation observation ----

    /// Connects a new observer. It receives every batch emitted from now on.
    #[must_use]
    pub fn observe(&self) -> MutationObserver {
        let id = self.inner.next_observer_id.get();
        self.inner.next_observer_id.set(id + 1);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.observers.borrow_mut().push((id, tx));
        MutationObserver {
            rx,
            handle: ObserverHandle {
                id,
                page: Rc::downgrade(&self.inner),
            },
        }
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    /// Runs `f` and delivers every mutation it makes as a single batch, the
    /// way a browser observer sees all changes from one task turn together.
    /// Outside of `batch`, each mutating call is its own one-record batch.
    /// Nested calls flush once, when the outermost returns.
    pub fn batch<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let depth = &self.inner.batch_depth;
        depth.set(depth.get() + 1);
        let result = f(self);
        depth.set(depth.get() - 1);
        if depth.get() == 0 {
            let records = self.inner.pending.take();
            if !records.is_empty() {
                self.deliver(records);
            }
        }
        result
    }

    fn notify(&self, record: MutationRecord) {
        if self.inner.batch_depth.get() > 0 {
            self.inner.pending.borrow_mut().push(record);
        } else {
            self.deliver(vec![record]);
        }
    }

    fn deliver(&self, batch: MutationBatch) {
        self.inner
            .observers
            .borrow_mut()
            .retain(|(_, tx)| tx.send(batch.clone()).is_ok());
    }

    // ---- mutations ----

    /// Replaces all children of `target` with the nodes parsed from `html`.
    /// Reported as one record carrying both the removals and the additions.
    pub fn set_inner_html(&self, target: &NodeRef, html: &str) {
        let removed: Vec<NodeRef> = target.children().collect();
        for child in &removed {
            child.detach();
        }
        let added = dom::parse_fragment(target, html);
        for node in &added {
            target.append(node.clone());
        }
        self.notify(MutationRecord {
            target: target.clone(),
            added,
            removed,
        });
    }

    /// Appends the nodes parsed from `html` to `parent`.
    pub fn append_html(&self, parent: &NodeRef, html: &str) {
        let added = dom::parse_fragment(parent, html);
        for node in &added {
            parent.append(node.clone());
        }
        self.notify(MutationRecord {
            target: parent.clone(),
            added,
            removed: Vec::new(),
        });
    }

    /// Detaches `node`. A node without a parent is left alone.
    pub fn remove(&self, node: &NodeRef) {
        let Some(parent) = node.parent() else {
            return;
        };
        node.detach();
        self.notify(MutationRecord {
            target: parent,
            added: Vec::new(),
            removed: vec![node.clone()],
        });
    }

    pub fn append(&self, parent: &NodeRef, node: NodeRef) {
        parent.append(node.clone());
        self.notify(MutationRecord {
            target: parent.clone(),
            added: vec![node],
            removed: Vec::new(),
        });
    }

    /// Inserts `node` as the next sibling of `anchor`. Returns `false` when
    /// `anchor` is detached and there is nowhere to insert.
    pub fn insert_after(&self, anchor: &NodeRef, node: NodeRef) -> bool {
        let Some(parent) = anchor.parent() else {
            return false;
        };
        anchor.insert_after(node.clone());
        self.notify(MutationRecord {
            target: parent,
            added: vec![node],
            removed: Vec::new(),
        });
        true
    }

    /// Inserts `node` as the previous sibling of `anchor`. Returns `false`
    /// when `anchor` is detached.
    pub fn insert_before(&self, anchor: &NodeRef, node: NodeRef) -> bool {
        let Some(parent) = anchor.parent() else {
            return false;
        };
        anchor.insert_before(node.clone());
        self.notify(MutationRecord {
            target: parent,
            added: vec![node],
            removed: Vec::new(),
        });
        true
    }
}

/// Receiving end of a page's mutation stream.
///
/// Dropping the observer disconnects it.
pub struct MutationObserver {
    rx: mpsc::UnboundedReceiver<MutationBatch>,
    handle: ObserverHandle,
}

impl MutationObserver {
    /// Next batch, or `None` once disconnected and drained.
    pub async fn next_batch(&mut self) -> Option<MutationBatch> {
        self.rx.recv().await
    }

    /// Handle that can disconnect this observer from elsewhere.
    #[must_use]
    pub fn handle(&self) -> ObserverHandle {
        self.handle.clone()
    }

    /// Stops delivery and discards batches not yet received.
    pub fn disconnect(&mut self) {
        self.handle.disconnect();
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }
}

impl Drop for MutationObserver {
    fn drop(&mut self) {
        self.handle.disconnect();
    }
}

/// Detached control over one observer's registration.
#[derive(Clone)]
pub struct ObserverHandle {
    id: u64,
    page: Weak<PageInner>,
}

impl ObserverHandle {
    /// Unregisters the observer. Idempotent.
    pub fn disconnect(&self) {
        if let Some(page) = self.page.upgrade() {
            page.observers.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.page
            .upgrade()
            .is_some_and(|page| page.observers.borrow().iter().any(|(id, _)| *id == self.id))
    }
}
