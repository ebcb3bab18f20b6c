#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Serve an [`axum::Router`] on listeners handed over by the supervisor.
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use launchkit::{CheckinClient, platform_transport};
//! use launchkit_http::{DEFAULT_SOCKETS_KEY, LaunchHttpServer};
//!
//! # async fn run() -> Result<(), launchkit_http::HttpError> {
//! let client = CheckinClient::new(platform_transport(&[DEFAULT_SOCKETS_KEY]));
//! client.checkin()?;
//! let router = Router::new().route("/", get(|| async { "hello" }));
//! LaunchHttpServer::bind(&client)?.serve_until_signal(router).await
//! # }
//! ```

use axum::Router;
use launchkit::{CheckinClient, LaunchError, SupervisorTransport};
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Socket group an HTTP job declares its listeners under.
pub const DEFAULT_SOCKETS_KEY: &str = "HTTPSockets";

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error("HTTP server on {addr} failed: {source}")]
    Serve {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("HTTP server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// HTTP server over every listener of one socket group.
#[derive(Debug)]
pub struct LaunchHttpServer {
    listeners: Vec<TcpListener>,
}

impl LaunchHttpServer {
    /// Resolve [`DEFAULT_SOCKETS_KEY`] from a checked-in client.
    ///
    /// # Errors
    /// See [`bind_group`](Self::bind_group).
    pub fn bind<T: SupervisorTransport>(client: &CheckinClient<T>) -> Result<Self, HttpError> {
        Self::bind_group(client, DEFAULT_SOCKETS_KEY)
    }

    /// Resolve socket group `name` as TCP listeners.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns [`HttpError::Launch`] if the client has not checked in, the
    /// group is unknown, or a descriptor cannot be adopted.
    pub fn bind_group<T: SupervisorTransport>(
        client: &CheckinClient<T>,
        name: &str,
    ) -> Result<Self, HttpError> {
        let listeners: Vec<TcpListener> = client.sockets(name)?;
        tracing::debug!(group = %name, count = listeners.len(), "Resolved HTTP listeners");
        Ok(Self { listeners })
    }

    #[must_use]
    pub fn from_listeners(listeners: Vec<TcpListener>) -> Self {
        Self { listeners }
    }

    /// # Errors
    /// Returns the first address lookup failure.
    pub fn local_addrs(&self) -> io::Result<Vec<SocketAddr>> {
        self.listeners.iter().map(TcpListener::local_addr).collect()
    }

    /// Serve `router` on every listener until `cancel` fires.
    ///
    /// In-flight requests are allowed to finish. If one listener fails, the
    /// others are stopped and its error is returned.
    ///
    /// # Errors
    /// Returns [`HttpError::Serve`] or [`HttpError::Join`] for the first
    /// listener that stops abnormally.
    pub async fn serve(self, router: Router, cancel: CancellationToken) -> Result<(), HttpError> {
        let mut servers = JoinSet::new();

        for listener in self.listeners {
            let addr = listener
                .local_addr()
                .map_or_else(|_| "<unknown>".to_owned(), |a| a.to_string());
            let router = router.clone();
            let cancel = cancel.clone();

            servers.spawn(async move {
                tracing::info!(%addr, "HTTP server listening");
                let shutdown = {
                    let addr = addr.clone();
                    async move {
                        cancel.cancelled().await;
                        tracing::info!(%addr, "HTTP server shutting down gracefully (cancellation)");
                    }
                };
                axum::serve(listener, router)
                    .with_graceful_shutdown(shutdown)
                    .await
                    .map_err(|source| HttpError::Serve { addr, source })
            });
        }

        while let Some(joined) = servers.join_next().await {
            joined??;
        }
        Ok(())
    }

    /// Serve `router` until SIGTERM or Ctrl+C.
    ///
    /// # Errors
    /// As [`serve`](Self::serve).
    pub async fn serve_until_signal(self, router: Router) -> Result<(), HttpError> {
        self.serve(router, launchkit_bootstrap::shutdown_token()).await
    }
}
