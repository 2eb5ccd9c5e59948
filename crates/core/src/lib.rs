//! HTTP API of the Kafka admin gateway and the lifecycle of the server
//! hosting it.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod handlers;
mod query;
mod router;
mod state;

pub use error::{Error, Result};
pub use router::{REQUEST_ID_HEADER, create_router};
pub use state::ApiContext;

use axum::Router;
use kafka_admin_broker::BrokerGateway;
use kafka_admin_http::HttpServer;
use kafka_admin_streaming::{StreamingConfig, StreamingGateway};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};

/// Options for creating a new core.
pub struct CoreOptions<G: BrokerGateway> {
    /// The broker to serve.
    pub broker: G,

    /// Poll and heartbeat timings for the consume endpoints.
    pub streaming_config: StreamingConfig,
}

/// Serves the admin API for one broker.
pub struct Core<G: BrokerGateway> {
    broker: G,
    streaming_config: StreamingConfig,
    shutdown_token: CancellationToken,
    stream_tracker: TaskTracker,
    task_tracker: TaskTracker,
}

impl<G: BrokerGateway> Core<G> {
    /// Create new core.
    pub fn new(
        CoreOptions {
            broker,
            streaming_config,
        }: CoreOptions<G>,
    ) -> Self {
        Self {
            broker,
            streaming_config,
            shutdown_token: CancellationToken::new(),
            stream_tracker: TaskTracker::new(),
            task_tracker: TaskTracker::new(),
        }
    }

    /// The API router. Live streams started through it stop when the core
    /// shuts down.
    pub fn router(&self) -> Router {
        let gateway = StreamingGateway::new(
            self.broker.clone(),
            self.streaming_config,
            self.shutdown_token.clone(),
        );

        create_router(ApiContext::new(gateway, self.stream_tracker.clone()))
    }

    /// Start serving on `http_server`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the core has already been started or if the HTTP server fails to start.
    pub async fn start<HS: HttpServer>(
        &self,
        http_server: HS,
    ) -> Result<JoinHandle<Result<()>>> {
        if self.task_tracker.is_closed() {
            return Err(Error::AlreadyStarted);
        }

        let (local_addr, http_handle) = http_server
            .start(self.router())
            .await
            .map_err(|e| Error::HttpServer(e.to_string()))?;

        info!(%local_addr, "core started");

        let shutdown_token = self.shutdown_token.clone();
        let stream_tracker = self.stream_tracker.clone();
        let handle = self.task_tracker.spawn(async move {
            tokio::select! {
                () = shutdown_token.cancelled() => {
                    info!("shutdown command received");

                    stream_tracker.close();
                    stream_tracker.wait().await;
                    http_server.shutdown().await;

                    Ok(())
                }
                _ = http_handle => {
                    error!("http server stopped unexpectedly");

                    Err(Error::HttpServerStopped)
                }
            }
        });

        self.task_tracker.close();

        Ok(handle)
    }

    /// Shutdown the core.
    pub async fn shutdown(&self) {
        info!("core shutting down...");

        self.shutdown_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;

        info!("core shutdown");
    }
}
