//! Async host integration for the picker.
//!
//! [`PickerHost`] owns a page and one [`PickerSession`] behind a tokio mutex.
//! The surrounding UI drives it with `enable()`/`disable()` and raw pointer
//! events, and listens for [`PickerEvent`]s on a broadcast channel.
//!
//! The confirmation delay after a click runs on a spawned task holding only a
//! weak reference, so dropping the host never waits on a pending commit.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use pagepick_core::config::PickerConfig;
use pagepick_core::dom::{MemoryDocument, Point};
use pagepick_core::error::PickError;
use pagepick_core::picker::{ClickOutcome, CommitTicket, PickerSession, PickerState};
use pagepick_core::snapshot::ElementSnapshot;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Capacity of the event channel. Slow subscribers lag rather than block.
const EVENT_CAPACITY: usize = 16;

/// A committed pick as delivered to the host UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Identifies the armed session that produced the pick.
    pub session_id: Uuid,
    /// When the click was accepted (the snapshot's instant).
    pub captured_at: DateTime<Utc>,
    pub snapshot: ElementSnapshot,
}

/// Lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PickerEvent {
    Armed,
    Committing,
    Selected(Selection),
    Cancelled,
}

/// A raw pointer event in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointerEvent {
    Move { x: f64, y: f64 },
    Click { x: f64, y: f64 },
}

/// What the page should do with a dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dispatch {
    /// The page's default action (navigation, handlers) must not run.
    pub default_prevented: bool,
}

struct Page {
    doc: MemoryDocument,
    picker: PickerSession,
    /// Set while armed or committing.
    session_id: Option<Uuid>,
}

impl Page {
    /// Abort any session and forget its id.
    fn teardown(&mut self) {
        let Page {
            doc,
            picker,
            session_id,
        } = self;
        if picker.abort(doc) {
            *session_id = None;
            info!("Picker host dropped; session torn down");
        }
    }
}

struct HostInner {
    page: Mutex<Page>,
    latest: RwLock<Option<Selection>>,
    events: broadcast::Sender<PickerEvent>,
}

impl HostInner {
    fn emit(&self, event: PickerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    async fn finish(&self, ticket: CommitTicket, captured_at: DateTime<Utc>) {
        let selection = {
            let mut page = self.page.lock().await;
            let Page {
                doc,
                picker,
                session_id,
            } = &mut *page;
            let Some(snapshot) = picker.finish_commit(doc, ticket) else {
                debug!("Commit {:?} no longer pending", ticket);
                return;
            };
            Selection {
                session_id: session_id.take().unwrap_or_else(Uuid::new_v4),
                captured_at,
                snapshot,
            }
        };

        *self.latest.write().await = Some(selection.clone());
        info!("Selection {} ready", selection.session_id);
        self.emit(PickerEvent::Selected(selection));
    }
}

/// Host-side handle on one page's picker.
pub struct PickerHost {
    inner: Arc<HostInner>,
}

impl PickerHost {
    pub fn new(doc: MemoryDocument, config: PickerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(HostInner {
                page: Mutex::new(Page {
                    doc,
                    picker: PickerSession::new(config),
                    session_id: None,
                }),
                latest: RwLock::new(None),
                events,
            }),
        }
    }

    /// Arm the picker. Returns `Ok(false)` if it was already active.
    pub async fn enable(&self) -> Result<bool, PickError> {
        let mut page = self.inner.page.lock().await;
        let Page {
            doc,
            picker,
            session_id,
        } = &mut *page;
        let armed = picker.enable(doc)?;
        if armed {
            *session_id = Some(Uuid::new_v4());
            self.inner.emit(PickerEvent::Armed);
        }
        Ok(armed)
    }

    /// Cancel an armed picker. A commit already in flight still completes.
    pub async fn disable(&self) -> bool {
        let mut page = self.inner.page.lock().await;
        let Page {
            doc,
            picker,
            session_id,
        } = &mut *page;
        let cancelled = picker.disable(doc);
        if cancelled {
            *session_id = None;
            self.inner.emit(PickerEvent::Cancelled);
        }
        cancelled
    }

    /// True while armed or committing.
    pub async fn is_active(&self) -> bool {
        self.inner.page.lock().await.picker.is_active()
    }

    pub async fn state(&self) -> PickerState {
        self.inner.page.lock().await.picker.state()
    }

    /// The most recent selection, if any.
    pub async fn selection(&self) -> Option<Selection> {
        self.inner.latest.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PickerEvent> {
        self.inner.events.subscribe()
    }

    /// Run `f` against the current document.
    pub async fn with_document<R>(&self, f: impl FnOnce(&MemoryDocument) -> R) -> R {
        f(&self.inner.page.lock().await.doc)
    }

    /// Feed one pointer event through the picker.
    pub async fn dispatch(&self, event: PointerEvent) -> Dispatch {
        let mut page = self.inner.page.lock().await;
        let Page { doc, picker, .. } = &mut *page;

        match event {
            PointerEvent::Move { x, y } => {
                let outcome = picker.pointer_move(doc, Point::new(x, y));
                debug!("move ({}, {}) -> {:?}", x, y, outcome);
                Dispatch::default()
            }
            PointerEvent::Click { x, y } => {
                let outcome = picker.click(doc, Point::new(x, y));
                let dispatch = Dispatch {
                    default_prevented: outcome.default_prevented(),
                };
                match outcome {
                    ClickOutcome::Committing { ticket, delay, .. } => {
                        self.inner.emit(PickerEvent::Committing);
                        self.schedule_finish(ticket, delay);
                    }
                    ClickOutcome::Failed(e) => warn!("Pick at ({}, {}) failed: {}", x, y, e),
                    other => debug!("click ({}, {}) -> {:?}", x, y, other),
                }
                dispatch
            }
        }
    }

    fn schedule_finish(&self, ticket: CommitTicket, delay: Duration) {
        let captured_at = Utc::now();
        let weak: Weak<HostInner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                debug!("Host dropped before commit {:?} finished", ticket);
                return;
            };
            inner.finish(ticket, captured_at).await;
        });
    }
}

/// Tears the session down. If another task holds the page at that moment,
/// teardown is deferred to a task on the current runtime; outside a runtime
/// it is skipped.
impl Drop for PickerHost {
    fn drop(&mut self) {
        if let Ok(mut page) = self.inner.page.try_lock() {
            page.teardown();
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("Page busy at drop; deferring teardown");
                let inner = Arc::clone(&self.inner);
                handle.spawn(async move {
                    inner.page.lock().await.teardown();
                });
            }
            Err(_) => warn!("Picker host dropped while the page was busy; skipping teardown"),
        }
    }
}
