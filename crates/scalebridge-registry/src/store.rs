//! Status store — the single source of truth for activation state.
//!
//! A `std::sync::RwLock` guards the object map and the global default.
//! Queries take the shared lock; events, registration and deregistration
//! take the exclusive lock. Nothing awaits while a lock is held: the
//! notification path uses `try_send` on a capacity-1 channel, so a slow
//! stream can never stall a writer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{Span, debug, error, info, warn};

use crate::event::UpdateEvent;
use crate::types::*;

/// Capacity of each object's notification slot.
///
/// Exactly one pending value: further updates while it is full are
/// coalesced, and the reader re-reads the latest state on wake-up.
pub const NOTIFY_CAPACITY: usize = 1;

/// Per-object entry owned by the store.
struct ObjectEntry {
    status: ActivationStatus,
    session: SessionId,
    notify: mpsc::Sender<bool>,
}

struct Inner {
    default: ActivationStatus,
    objects: HashMap<String, ObjectEntry>,
}

/// Concurrency-safe registry of activation state.
///
/// Share it behind an `Arc`; all methods take `&self`.
pub struct StatusStore {
    spec: MetricSpec,
    inner: RwLock<Inner>,
    next_session: AtomicU64,
    span: Span,
}

/// Ownership handle for one registered object.
///
/// Returned by [`StatusStore::register`]. Holds the only receiver of the
/// object's notification slot; hand it back to
/// [`StatusStore::deregister_session`] when the stream ends.
#[derive(Debug)]
pub struct Registration {
    name: String,
    session: SessionId,
    rx: mpsc::Receiver<bool>,
}

impl Registration {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    /// Wait for the next notification.
    ///
    /// Returns `None` once the entry has been removed or replaced by a
    /// newer registration for the same name: no further notifications will
    /// ever arrive on this handle.
    pub async fn recv(&mut self) -> Option<bool> {
        self.rx.recv().await
    }

    /// Take a pending notification without waiting.
    pub fn try_recv(&mut self) -> Option<bool> {
        self.rx.try_recv().ok()
    }
}

impl StatusStore {
    /// Create a store seeded with the configured global default.
    pub fn new(default: DefaultStatus) -> Self {
        Self {
            spec: default.metric_spec(),
            inner: RwLock::new(Inner {
                default: default.activation(),
                objects: HashMap::new(),
            }),
            next_session: AtomicU64::new(1),
            span: tracing::info_span!("registry"),
        }
    }

    /// Use `span` for everything this store logs.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Apply an update event.
    ///
    /// An empty object name overwrites the global default. A named object
    /// without a registered session is an error: the event is logged and
    /// discarded, never queued.
    pub fn apply_event(&self, event: &UpdateEvent) -> ApplyOutcome {
        let _enter = self.span.enter();
        let status = ActivationStatus {
            active: event.active,
            metric_value: event.metric_value,
        };

        let mut inner = self.write();

        if event.is_global() {
            inner.default = status;
            debug!(
                active = status.active,
                metric_value = status.metric_value,
                "global default updated"
            );
            return ApplyOutcome::DefaultUpdated;
        }

        let Some(entry) = inner.objects.get_mut(&event.object_name) else {
            error!(
                object = %event.object_name,
                "failed to update object status: object is not registered yet"
            );
            return ApplyOutcome::Unregistered;
        };

        entry.status = status;
        let notified = match entry.notify.try_send(status.active) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!(
                    object = %event.object_name,
                    reason = "notification slot is full",
                    "coalescing object status update"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(
                    object = %event.object_name,
                    session = %entry.session,
                    "notification receiver is gone; session did not deregister"
                );
                false
            }
        };

        debug!(
            object = %event.object_name,
            active = status.active,
            metric_value = status.metric_value,
            notified,
            "object status updated"
        );
        ApplyOutcome::ObjectUpdated { notified }
    }

    /// Current status of `name`, falling back to the global default when
    /// no entry exists.
    pub fn status(&self, name: &str) -> ActivationStatus {
        let inner = self.read();
        inner
            .objects
            .get(name)
            .map(|entry| entry.status)
            .unwrap_or(inner.default)
    }

    /// Snapshot of the global default's activation state.
    pub fn defaults(&self) -> ActivationStatus {
        self.read().default
    }

    /// The configured metric name and target size.
    pub fn metric_spec(&self) -> &MetricSpec {
        &self.spec
    }

    /// Register `name` and return the handle that owns its notifications.
    ///
    /// The new entry is seeded from the current global default. If `name`
    /// is already registered the newer registration wins; the previous
    /// session's handle is woken with `None` and will not receive further
    /// notifications.
    pub fn register(&self, name: &str) -> Registration {
        let _enter = self.span.enter();
        let session = SessionId(self.next_session.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(NOTIFY_CAPACITY);

        let mut inner = self.write();
        let entry = ObjectEntry {
            status: inner.default,
            session,
            notify: tx,
        };
        match inner.objects.insert(name.to_string(), entry) {
            Some(previous) => warn!(
                object = %name,
                %session,
                superseded = %previous.session,
                "object re-registered; previous stream will no longer be notified"
            ),
            None => info!(object = %name, %session, "object registered"),
        }

        Registration {
            name: name.to_string(),
            session,
            rx,
        }
    }

    /// Remove the entry for `name`, whoever owns it.
    ///
    /// Idempotent: returns `false` when there was nothing to remove.
    pub fn deregister(&self, name: &str) -> bool {
        let _enter = self.span.enter();
        let removed = self.write().objects.remove(name).is_some();
        if removed {
            info!(object = %name, "object deregistered");
        }
        removed
    }

    /// Remove the entry for `registration`, but only if it still belongs
    /// to that session.
    ///
    /// A superseded session therefore never removes its successor's entry.
    pub fn deregister_session(&self, registration: &Registration) -> bool {
        let _enter = self.span.enter();
        let mut inner = self.write();
        let owned = inner
            .objects
            .get(registration.name())
            .is_some_and(|entry| entry.session == registration.session);

        if owned {
            inner.objects.remove(registration.name());
            info!(
                object = %registration.name(),
                session = %registration.session,
                "object deregistered"
            );
        } else {
            debug!(
                object = %registration.name(),
                session = %registration.session,
                "entry already removed or owned by a newer session"
            );
        }
        owned
    }

    /// Latest `active` flag of the entry owned by `registration`.
    ///
    /// `None` when the entry is gone or belongs to another session.
    pub fn latest_active(&self, registration: &Registration) -> Option<bool> {
        self.read()
            .objects
            .get(registration.name())
            .filter(|entry| entry.session == registration.session)
            .map(|entry| entry.status.active)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.read().objects.contains_key(name)
    }

    pub fn registered_count(&self) -> usize {
        self.read().objects.len()
    }

    // A poisoned lock means a writer panicked mid-update; the map itself is
    // still structurally valid, so keep serving.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
