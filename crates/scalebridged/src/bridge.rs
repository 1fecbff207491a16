//! Process wiring — binds both listeners and runs both servers.
//!
//! ```text
//! Bridge::bind()
//!   ├── StatusStore (shared)
//!   ├── gRPC listener  → ScalerService + HealthService
//!   └── HTTP listener  → scalebridge-api router → EventIngestor
//! Bridge::serve(shutdown)
//!   ├── either server fails → the other is stopped, error returned
//!   └── shutdown → health NOT_SERVING, streams end, servers drain
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_stream::wrappers::TcpListenerStream;
use tracing::info;

use scalebridge_grpc::{HealthService, SCALER_SERVICE_NAME, ScalerService};
use scalebridge_registry::{EventIngestor, StatusStore};

use crate::config::BridgeConfig;

/// A daemon whose listeners are bound but not yet serving.
pub struct Bridge {
    store: Arc<StatusStore>,
    health: HealthService,
    grpc_listener: TcpListener,
    http_listener: TcpListener,
}

impl Bridge {
    /// Create the store and bind both ports.
    ///
    /// Bind failures are returned here so they surface as startup errors.
    pub async fn bind(config: &BridgeConfig) -> anyhow::Result<Self> {
        let store = Arc::new(
            StatusStore::new(config.default.clone()).with_span(tracing::info_span!("registry")),
        );

        let grpc_addr = SocketAddr::from(([0, 0, 0, 0], config.grpc_port));
        let grpc_listener = TcpListener::bind(grpc_addr)
            .await
            .with_context(|| format!("bind gRPC listener on {grpc_addr}"))?;

        let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
        let http_listener = TcpListener::bind(http_addr)
            .await
            .with_context(|| format!("bind HTTP listener on {http_addr}"))?;

        Ok(Self {
            store,
            health: HealthService::new(),
            grpc_listener,
            http_listener,
        })
    }

    pub fn grpc_addr(&self) -> std::io::Result<SocketAddr> {
        self.grpc_listener.local_addr()
    }

    pub fn http_addr(&self) -> std::io::Result<SocketAddr> {
        self.http_listener.local_addr()
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        &self.store
    }

    pub fn health(&self) -> &HealthService {
        &self.health
    }

    /// Serve until `shutdown` flips to `true` (or its sender is dropped),
    /// or until either server fails.
    pub async fn serve(self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let Self {
            store,
            health,
            grpc_listener,
            http_listener,
        } = self;

        // Internal stop signal: fired on external shutdown so open streams
        // end and both servers drain.
        let (stop_tx, stop_rx) = watch::channel(false);

        let scaler = ScalerService::new(Arc::clone(&store), stop_rx.clone())
            .with_span(tracing::info_span!("scaler"));
        let grpc_addr = grpc_listener.local_addr()?;
        let grpc = tonic::transport::Server::builder()
            .add_service(scaler.into_service())
            .add_service(health.clone().into_service())
            .serve_with_incoming_shutdown(
                TcpListenerStream::new(grpc_listener),
                stopped(stop_rx.clone()),
            );
        let grpc = async move { grpc.await.context("gRPC server failed") };

        let ingestor = EventIngestor::new(store).with_span(tracing::info_span!("api"));
        let router = scalebridge_api::build_router(ingestor);
        let http_addr = http_listener.local_addr()?;
        let http = axum::serve(http_listener, router).with_graceful_shutdown(stopped(stop_rx));
        let http = async move { http.await.context("HTTP server failed") };

        health.set_serving("");
        health.set_serving(SCALER_SERVICE_NAME);
        info!(%grpc_addr, "external scaler gRPC server starting");
        info!(%http_addr, "HTTP API server starting");

        // First error wins; the other server is dropped with it.
        let servers = async { tokio::try_join!(grpc, http).map(|_| ()) };
        tokio::pin!(servers);

        tokio::select! {
            result = &mut servers => {
                health.shutdown();
                return result;
            }
            () = stopped(shutdown) => {}
        }

        info!("shutdown signal received");
        health.shutdown();
        let _ = stop_tx.send(true);
        servers.await?;

        info!("servers stopped");
        Ok(())
    }
}

/// Resolves once `rx` reads `true` or its sender is gone.
async fn stopped(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
