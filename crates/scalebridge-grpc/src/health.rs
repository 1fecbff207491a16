//! `grpc.health.v1` service.
//!
//! Keeps a serving status per service name. `Check` answers from the
//! current table; `Watch` streams the current status and every change
//! after it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::{debug, info};

use crate::health_proto::health_check_response::ServingStatus;
use crate::health_proto::health_server::{Health, HealthServer};
use crate::health_proto::{HealthCheckRequest, HealthCheckResponse};

type StatusTable = HashMap<String, ServingStatus>;

/// Shared health status table. Cloning shares the same table.
#[derive(Clone)]
pub struct HealthService {
    statuses: Arc<watch::Sender<StatusTable>>,
}

impl Default for HealthService {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthService {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(StatusTable::new());
        Self {
            statuses: Arc::new(tx),
        }
    }

    /// Set the status of `service`. The empty name is the server as a whole.
    pub fn set_status(&self, service: &str, status: ServingStatus) {
        let changed = self.statuses.send_if_modified(|table| {
            table.insert(service.to_string(), status) != Some(status)
        });
        if changed {
            info!(service = %service, status = status.as_str_name(), "health status changed");
        }
    }

    pub fn set_serving(&self, service: &str) {
        self.set_status(service, ServingStatus::Serving);
    }

    pub fn set_not_serving(&self, service: &str) {
        self.set_status(service, ServingStatus::NotServing);
    }

    /// Mark every known service `NOT_SERVING`.
    pub fn shutdown(&self) {
        self.statuses.send_if_modified(|table| {
            let mut changed = false;
            for status in table.values_mut() {
                if *status != ServingStatus::NotServing {
                    *status = ServingStatus::NotServing;
                    changed = true;
                }
            }
            changed
        });
        info!("all services marked not serving");
    }

    /// Current status of `service`, if it is known.
    pub fn status(&self, service: &str) -> Option<ServingStatus> {
        self.statuses.borrow().get(service).copied()
    }

    /// Get the tonic service for mounting on a gRPC server.
    pub fn into_service(self) -> HealthServer<Self> {
        HealthServer::new(self)
    }
}

fn response(status: ServingStatus) -> HealthCheckResponse {
    HealthCheckResponse {
        status: status.into(),
    }
}

#[tonic::async_trait]
impl Health for HealthService {
    async fn check(
        &self,
        request: Request<HealthCheckRequest>,
    ) -> Result<Response<HealthCheckResponse>, Status> {
        let service = request.into_inner().service;
        match self.status(&service) {
            Some(status) => Ok(Response::new(response(status))),
            None => Err(Status::not_found(format!("unknown service: {service:?}"))),
        }
    }

    type WatchStream = ReceiverStream<Result<HealthCheckResponse, Status>>;

    async fn watch(
        &self,
        request: Request<HealthCheckRequest>,
    ) -> Result<Response<Self::WatchStream>, Status> {
        let service = request.into_inner().service;
        let mut statuses = self.statuses.subscribe();
        let (tx, rx) = mpsc::channel(4);

        debug!(service = %service, "health watch started");

        tokio::spawn(async move {
            let mut last = None;
            loop {
                let current = statuses
                    .borrow_and_update()
                    .get(&service)
                    .copied()
                    .unwrap_or(ServingStatus::ServiceUnknown);

                if last != Some(current) {
                    if tx.send(Ok(response(current))).await.is_err() {
                        break;
                    }
                    last = Some(current);
                }

                tokio::select! {
                    changed = statuses.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    () = tx.closed() => break,
                }
            }
            debug!(service = %service, "health watch ended");
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
