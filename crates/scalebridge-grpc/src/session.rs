//! Streaming session — one per open `StreamIsActive` call.
//!
//! ```text
//! Start ──► Listening ──(notification)──► Emitting ──(sent)──► Listening
//!               │                              │
//!               │ (cancelled / shutdown)       │ (send failed / shutdown)
//!               ▼                              ▼
//!           Terminating ◄──────────────────────┘
//!               └── deregister_session() → return
//! ```
//!
//! The session owns the only receiver of its object's notification slot.
//! A wake-up carries the `active` value that was current when the slot was
//! filled; before emitting, the session re-reads its entry so updates
//! coalesced behind a full slot still surface as the latest state.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tonic::Status;
use tracing::{Instrument, Span, debug, info, warn};

use scalebridge_registry::{Registration, StatusStore};

use crate::proto::IsActiveResponse;

/// Sending half of a `StreamIsActive` response stream.
pub type ActiveSender = mpsc::Sender<Result<IsActiveResponse, Status>>;

/// Why a session reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The caller went away (response stream dropped).
    Cancelled,
    /// The server is shutting down.
    Shutdown,
    /// Writing to the response stream failed.
    SendFailed,
}

/// A registered object relaying activation changes to one RPC caller.
pub struct StreamingSession {
    store: Arc<StatusStore>,
    registration: Registration,
    tx: ActiveSender,
    shutdown: watch::Receiver<bool>,
    span: Span,
}

impl StreamingSession {
    /// Enter the session: registers `name` in the store right away, so the
    /// object is visible to events before the first poll of [`run`].
    ///
    /// [`run`]: StreamingSession::run
    pub fn start(
        store: Arc<StatusStore>,
        name: &str,
        tx: ActiveSender,
        shutdown: watch::Receiver<bool>,
        parent: &Span,
    ) -> Self {
        let registration = store.register(name);
        let span = tracing::info_span!(
            parent: parent,
            "session",
            object = %name,
            session = %registration.session_id()
        );
        Self {
            store,
            registration,
            tx,
            shutdown,
            span,
        }
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    /// Relay notifications until the call ends, then deregister.
    pub async fn run(self) -> SessionEnd {
        let span = self.span.clone();
        self.relay().instrument(span).await
    }

    async fn relay(mut self) -> SessionEnd {
        let mut superseded = false;
        let mut watching_shutdown = true;

        if *self.shutdown.borrow_and_update() {
            return self.terminate(SessionEnd::Shutdown);
        }

        let end = loop {
            tokio::select! {
                () = self.tx.closed() => break SessionEnd::Cancelled,

                changed = self.shutdown.changed(), if watching_shutdown => match changed {
                    Ok(()) if *self.shutdown.borrow_and_update() => break SessionEnd::Shutdown,
                    Ok(()) => {}
                    // No shutdown source left; only cancellation can end us now.
                    Err(_) => watching_shutdown = false,
                },

                notified = self.registration.recv(), if !superseded => match notified {
                    Some(active) => {
                        let active = self
                            .store
                            .latest_active(&self.registration)
                            .unwrap_or(active);
                        debug!(active, "sending IsActive response");
                        // A caller that stops reading must not hold up shutdown.
                        tokio::select! {
                            sent = self.tx.send(Ok(IsActiveResponse { result: active })) => {
                                if let Err(e) = sent {
                                    warn!(error = %e, "failed to send IsActive response");
                                    break SessionEnd::SendFailed;
                                }
                            }
                            () = shutdown_requested(&mut self.shutdown) => break SessionEnd::Shutdown,
                        }
                    }
                    None => {
                        superseded = true;
                        warn!("stream superseded by a newer registration; waiting for cancellation");
                    }
                },
            }
        };

        self.terminate(end)
    }

    fn terminate(self, end: SessionEnd) -> SessionEnd {
        self.store.deregister_session(&self.registration);
        info!(?end, "StreamIsActive call completed");
        end
    }
}

/// Resolves once shutdown is requested; never resolves if the shutdown
/// source is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
