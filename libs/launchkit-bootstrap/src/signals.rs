//! Termination signals.
//!
//! A supervised service is stopped with SIGTERM and must handle it by
//! running its own shutdown; the signal is never ignored.

use anyhow::Result;
use std::fmt;
use std::future::Future;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Signals that trigger shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    CtrlC,
    Sigterm,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CtrlC => "SIGINT",
            Self::Sigterm => "SIGTERM",
        })
    }
}

/// Wait for Ctrl+C or SIGTERM, whichever comes first.
///
/// # Errors
/// Returns an error if a signal handler cannot be installed.
pub async fn wait_for_shutdown() -> Result<ShutdownSignal> {
    let signal = tokio::select! {
        result = wait_ctrl_c() => result?,
        result = wait_sigterm() => result?,
    };

    tracing::info!(%signal, "Shutdown signal received, initiating graceful shutdown");
    Ok(signal)
}

async fn wait_ctrl_c() -> Result<ShutdownSignal> {
    signal::ctrl_c().await.map_err(|e| {
        tracing::error!(%e, "Error handling Ctrl+C signal");
        e
    })?;
    Ok(ShutdownSignal::CtrlC)
}

async fn wait_sigterm() -> Result<ShutdownSignal> {
    let mut handler = signal::unix::signal(signal::unix::SignalKind::terminate()).map_err(|e| {
        tracing::error!(%e, "Failed to install SIGTERM handler");
        e
    })?;
    handler.recv().await;
    Ok(ShutdownSignal::Sigterm)
}

/// Token cancelled once `waiter` completes, successfully or not.
///
/// Must be called from within a tokio runtime.
#[must_use]
pub fn cancel_on<F>(waiter: F) -> CancellationToken
where
    F: Future<Output = Result<ShutdownSignal>> + Send + 'static,
{
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if let Err(e) = waiter.await {
            tracing::error!(error = %e, "Signal handling failed, shutting down");
        }
        trigger.cancel();
    });
    token
}

/// Token cancelled on the first termination signal.
///
/// Must be called from within a tokio runtime.
#[must_use]
pub fn shutdown_token() -> CancellationToken {
    cancel_on(wait_for_shutdown())
}
