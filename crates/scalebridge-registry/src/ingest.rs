//! Event ingestion — validates raw submissions and applies them.

use std::sync::Arc;

use tracing::{Span, debug, warn};

use crate::error::EventResult;
use crate::event::UpdateEvent;
use crate::store::StatusStore;
use crate::types::ApplyOutcome;

/// Front door for inbound update events.
///
/// `submit` is synchronous: it returns only after the event has been
/// applied to the store (or discarded because the object is not
/// registered), so a caller that sees `Ok` observes the new state.
#[derive(Clone)]
pub struct EventIngestor {
    store: Arc<StatusStore>,
    span: Span,
}

impl EventIngestor {
    pub fn new(store: Arc<StatusStore>) -> Self {
        Self {
            store,
            span: tracing::info_span!("ingest"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        &self.store
    }

    /// Parse raw parameters into an `UpdateEvent` and apply it.
    pub fn submit(
        &self,
        name: Option<&str>,
        active: Option<&str>,
        value: Option<&str>,
    ) -> EventResult<ApplyOutcome> {
        let _enter = self.span.enter();
        let event = UpdateEvent::parse(name, active, value).inspect_err(|e| {
            warn!(parameter = e.parameter(), error = %e, "rejected update event");
        })?;
        Ok(self.apply(&event))
    }

    /// Apply an already-validated event.
    pub fn apply(&self, event: &UpdateEvent) -> ApplyOutcome {
        let outcome = self.store.apply_event(event);
        debug!(
            object = %event.object_name,
            outcome = outcome.label(),
            "update event applied"
        );
        outcome
    }
}
