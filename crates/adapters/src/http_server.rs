//! HTTP server.
//!
//! Binds the webhook router to a TCP listener and serves it until the
//! supplied shutdown future resolves, then lets running relays finish.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use issue_relay_dispatch::RELAY_TIMEOUT;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use crate::webhook_router::{WebhookRouter, HEALTH_PATH, WEBHOOK_PATH};

/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 5000;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("Server error: {source}")]
    Serve { source: io::Error },
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the receiver listens on
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
        }
    }
}

/// Webhook receiver server.
pub struct HttpServer {
    config: ServerConfig,
    router: WebhookRouter,
}

impl HttpServer {
    /// Creates a new [`HttpServer`] instance from the given configuration.
    pub fn new(config: ServerConfig, router: WebhookRouter) -> Self {
        Self { config, router }
    }

    /// Access the configuration associated with this server.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.listen_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    ///
    /// After `shutdown` resolves and open connections close, relays still
    /// running get up to [`RELAY_TIMEOUT`] to finish.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Serve { source })?;
        info!(
            addr = %local_addr,
            relay = self.router.dispatcher().config().mode(),
            "Listening for webhooks at {} (health at {})",
            WEBHOOK_PATH,
            HEALTH_PATH
        );

        let relays = self.router.clone();
        axum::serve(listener, self.router.into_router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| ServerError::Serve { source })?;

        relays.drain_relays(RELAY_TIMEOUT).await;
        info!("Server stopped");
        Ok(())
    }
}
