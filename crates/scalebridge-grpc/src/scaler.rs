//! External-scaler gRPC service.
//!
//! Point-in-time queries read the store directly; `StreamIsActive`
//! hands the call to a [`StreamingSession`] task.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::{Span, debug, info};

use scalebridge_registry::StatusStore;

use crate::proto;
use crate::proto::external_scaler_server::{ExternalScaler, ExternalScalerServer};
use crate::session::StreamingSession;

/// Buffered responses per `StreamIsActive` call before the session waits
/// on the transport.
const STREAM_BUFFER: usize = 4;

/// gRPC implementation of `externalscaler.ExternalScaler`.
pub struct ScalerService {
    store: Arc<StatusStore>,
    shutdown: watch::Receiver<bool>,
    span: Span,
}

impl ScalerService {
    /// Create a scaler service over `store`.
    ///
    /// Open streams end when `shutdown` flips to `true`.
    pub fn new(store: Arc<StatusStore>, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            store,
            shutdown,
            span: tracing::info_span!("scaler"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Get the tonic service for mounting on a gRPC server.
    pub fn into_service(self) -> ExternalScalerServer<Self> {
        ExternalScalerServer::new(self)
    }
}

#[tonic::async_trait]
impl ExternalScaler for ScalerService {
    async fn is_active(
        &self,
        request: Request<proto::ScaledObjectRef>,
    ) -> Result<Response<proto::IsActiveResponse>, Status> {
        let object = request.into_inner();
        let status = self.store.status(&object.name);

        debug!(
            parent: &self.span,
            object = %object.name,
            namespace = %object.namespace,
            active = status.active,
            "IsActive called"
        );

        Ok(Response::new(proto::IsActiveResponse {
            result: status.active,
        }))
    }

    type StreamIsActiveStream = ReceiverStream<Result<proto::IsActiveResponse, Status>>;

    async fn stream_is_active(
        &self,
        request: Request<proto::ScaledObjectRef>,
    ) -> Result<Response<Self::StreamIsActiveStream>, Status> {
        let object = request.into_inner();
        // Empty-name events update the global default, so such a stream
        // could never be notified.
        if object.name.is_empty() {
            return Err(Status::invalid_argument("scaledObjectRef.name is required"));
        }

        info!(
            parent: &self.span,
            object = %object.name,
            namespace = %object.namespace,
            "StreamIsActive called"
        );

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let session = StreamingSession::start(
            Arc::clone(&self.store),
            &object.name,
            tx,
            self.shutdown.clone(),
            &self.span,
        );
        tokio::spawn(session.run());

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn get_metric_spec(
        &self,
        request: Request<proto::ScaledObjectRef>,
    ) -> Result<Response<proto::GetMetricSpecResponse>, Status> {
        let object = request.into_inner();
        let spec = self.store.metric_spec();

        debug!(
            parent: &self.span,
            object = %object.name,
            namespace = %object.namespace,
            metric = %spec.metric_name,
            "GetMetricSpec called"
        );

        Ok(Response::new(proto::GetMetricSpecResponse {
            metric_specs: vec![proto::MetricSpec {
                metric_name: spec.metric_name.clone(),
                target_size: spec.target_size,
                target_size_float: spec.target_size as f64,
            }],
        }))
    }

    async fn get_metrics(
        &self,
        request: Request<proto::GetMetricsRequest>,
    ) -> Result<Response<proto::GetMetricsResponse>, Status> {
        let req = request.into_inner();
        let object = req
            .scaled_object_ref
            .ok_or_else(|| Status::invalid_argument("scaledObjectRef is required"))?;

        let spec = self.store.metric_spec();
        let status = self.store.status(&object.name);

        debug!(
            parent: &self.span,
            object = %object.name,
            namespace = %object.namespace,
            requested_metric = %req.metric_name,
            metric_value = status.metric_value,
            "GetMetrics called"
        );

        Ok(Response::new(proto::GetMetricsResponse {
            metric_values: vec![proto::MetricValue {
                metric_name: spec.metric_name.clone(),
                metric_value: status.metric_value,
                metric_value_float: status.metric_value as f64,
            }],
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_stream::StreamExt;
    use tonic::Code;

    use super::*;
    use scalebridge_registry::{DefaultStatus, UpdateEvent};

    fn object_ref(name: &str) -> proto::ScaledObjectRef {
        proto::ScaledObjectRef {
            name: name.to_string(),
            namespace: "default".to_string(),
            scaler_metadata: Default::default(),
        }
    }

    fn test_service() -> (ScalerService, Arc<StatusStore>, watch::Sender<bool>) {
        let store = Arc::new(StatusStore::new(DefaultStatus::new("queue_depth", 1)));
        let (sd_tx, sd_rx) = watch::channel(false);
        (ScalerService::new(Arc::clone(&store), sd_rx), store, sd_tx)
    }

    async fn is_active(svc: &ScalerService, name: &str) -> bool {
        svc.is_active(Request::new(object_ref(name)))
            .await
            .unwrap()
            .into_inner()
            .result
    }

    async fn metric_value(svc: &ScalerService, name: &str) -> i64 {
        let resp = svc
            .get_metrics(Request::new(proto::GetMetricsRequest {
                scaled_object_ref: Some(object_ref(name)),
                metric_name: "queue_depth".to_string(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(resp.metric_values.len(), 1);
        assert_eq!(resp.metric_values[0].metric_name, "queue_depth");
        resp.metric_values[0].metric_value
    }

    async fn wait_until_deregistered(store: &StatusStore, name: &str) {
        for _ in 0..100 {
            if !store.is_registered(name) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{name} was never deregistered");
    }

    #[tokio::test]
    async fn is_active_falls_back_to_default() {
        let (svc, store, _sd) = test_service();
        assert!(!is_active(&svc, "unknown").await);

        store.apply_event(&UpdateEvent::global(true, 3));
        assert!(is_active(&svc, "unknown").await);
        assert_eq!(metric_value(&svc, "unknown").await, 3);
    }

    #[tokio::test]
    async fn get_metric_spec_reports_configuration() {
        let store = Arc::new(StatusStore::new(DefaultStatus::new("queue_depth", 25)));
        let (_sd_tx, sd_rx) = watch::channel(false);
        let svc = ScalerService::new(store, sd_rx);

        let resp = svc
            .get_metric_spec(Request::new(object_ref("anything")))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(resp.metric_specs.len(), 1);
        assert_eq!(resp.metric_specs[0].metric_name, "queue_depth");
        assert_eq!(resp.metric_specs[0].target_size, 25);
        assert_eq!(resp.metric_specs[0].target_size_float, 25.0);
    }

    #[tokio::test]
    async fn get_metrics_requires_object_ref() {
        let (svc, _store, _sd) = test_service();
        let err = svc
            .get_metrics(Request::new(proto::GetMetricsRequest {
                scaled_object_ref: None,
                metric_name: String::new(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn stream_rejects_empty_name() {
        let (svc, store, _sd) = test_service();
        let Err(err) = svc.stream_is_active(Request::new(object_ref(""))).await else {
            panic!("stream with an empty name was accepted");
        };
        assert_eq!(err.code(), Code::InvalidArgument);
        assert_eq!(store.registered_count(), 0);

        store.apply_event(&UpdateEvent::global(true, 7));
        assert!(is_active(&svc, "").await);
    }

    #[tokio::test]
    async fn stream_registers_and_pushes_updates() {
        let (svc, store, _sd) = test_service();
        store.apply_event(&UpdateEvent::global(true, 5));

        let mut stream = svc
            .stream_is_active(Request::new(object_ref("job-1")))
            .await
            .unwrap()
            .into_inner();

        // Registered before the response is returned, seeded from the default.
        assert!(store.is_registered("job-1"));
        assert!(is_active(&svc, "job-1").await);
        assert_eq!(metric_value(&svc, "job-1").await, 5);

        store.apply_event(&UpdateEvent::new("job-1", false, 0));
        let msg = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(!msg.result);

        assert!(!is_active(&svc, "job-1").await);
        assert!(is_active(&svc, "other").await);
        assert_eq!(metric_value(&svc, "job-1").await, 0);

        drop(stream);
        wait_until_deregistered(&store, "job-1").await;
        assert!(is_active(&svc, "job-1").await);
    }

    #[tokio::test]
    async fn shutdown_ends_open_streams() {
        let (svc, store, sd_tx) = test_service();
        let mut stream = svc
            .stream_is_active(Request::new(object_ref("A")))
            .await
            .unwrap()
            .into_inner();

        sd_tx.send(true).unwrap();
        let next = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap();
        assert!(next.is_none());
        wait_until_deregistered(&store, "A").await;
    }
}
