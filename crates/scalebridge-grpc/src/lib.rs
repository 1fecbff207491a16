//! scalebridge-grpc — the gRPC surface polled by the autoscaling controller.
//!
//! Implements the KEDA external-scaler protocol on top of a shared
//! [`StatusStore`](scalebridge_registry::StatusStore), plus the standard
//! `grpc.health.v1` service.
//!
//! # Architecture
//!
//! ```text
//! tonic Server
//!   ├── ScalerService (externalscaler.ExternalScaler)
//!   │   ├── IsActive()       → store.status(name).active
//!   │   ├── GetMetricSpec()  → configured metric name + target size
//!   │   ├── GetMetrics()     → store.status(name).metric_value
//!   │   └── StreamIsActive() → StreamingSession task per call
//!   │         register → listen ⇄ emit → deregister
//!   └── HealthService (grpc.health.v1.Health)
//! ```

pub mod health;
pub mod scaler;
pub mod session;

/// Generated protobuf types and gRPC stubs for the external-scaler protocol.
pub mod proto {
    tonic::include_proto!("externalscaler");
}

/// Generated protobuf types and gRPC stubs for `grpc.health.v1`.
pub mod health_proto {
    tonic::include_proto!("grpc.health.v1");
}

pub use health::HealthService;
pub use scaler::ScalerService;
pub use session::{SessionEnd, StreamingSession};

/// Fully-qualified name of the external-scaler service, as reported by
/// the health service.
pub const SCALER_SERVICE_NAME: &str = "externalscaler.ExternalScaler";
