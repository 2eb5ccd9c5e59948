//! Abstract interface for the HTTP server hosting the admin API.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::error::Error;
use std::fmt::Debug;
use std::net::SocketAddr;

use async_trait::async_trait;
use axum::Router;
use tokio::task::JoinHandle;

/// Marker trait for `HttpServer` errors
pub trait HttpServerError: Debug + Error + Send + Sync + 'static {}

/// An HTTP server that serves a single router until shut down.
#[async_trait]
pub trait HttpServer: Send + Sync + 'static {
    /// The error type for this server.
    type Error: HttpServerError;

    /// Binds the listener and starts serving `router` in the background.
    ///
    /// Returns the bound address and a handle that resolves when serving stops.
    async fn start(&self, router: Router) -> Result<(SocketAddr, JoinHandle<()>), Self::Error>;

    /// Stops accepting connections and waits for the server task to exit.
    async fn shutdown(&self);
}
