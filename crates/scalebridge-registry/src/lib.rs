//! scalebridge-registry — activation state for externally scaled objects.
//!
//! Holds the latest known activation state per scaled object and a single
//! global default used for objects nobody is streaming. Writers never block:
//! every registered object has a capacity-1 notification slot, and a full
//! slot simply coalesces the update.
//!
//! # Architecture
//!
//! ```text
//! HTTP submission
//!   └── EventIngestor::submit()  → UpdateEvent::parse()
//!         └── StatusStore::apply_event()
//!               ├── empty name  → global default
//!               └── object name → entry + try_send(active)
//!
//! StatusStore
//!   ├── status(name)   → entry or global default (IsActive / GetMetrics)
//!   ├── register(name) → Registration (StreamIsActive start)
//!   └── deregister_session(&Registration) (StreamIsActive end)
//! ```

pub mod error;
pub mod event;
pub mod ingest;
pub mod store;
pub mod types;

pub use error::{EventError, EventResult};
pub use event::UpdateEvent;
pub use ingest::EventIngestor;
pub use store::{Registration, StatusStore};
pub use types::*;
