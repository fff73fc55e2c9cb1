// src/engine/signals.rs

//! Termination signal listener.

use tracing::info;

use crate::errors::Result;

/// Listens for SIGINT and SIGTERM (Ctrl+C on non-Unix).
///
/// Handlers are installed in [`ShutdownSignal::install`], so signals that
/// arrive before [`ShutdownSignal::recv`] is awaited are not lost.
#[derive(Debug)]
pub struct ShutdownSignal {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    #[cfg(unix)]
    pub fn install() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> Result<Self> {
        Ok(Self {})
    }

    /// Resolve on the first termination signal.
    #[cfg(unix)]
    pub async fn recv(mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => info!("received SIGINT"),
            _ = self.terminate.recv() => info!("received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        info!("received Ctrl+C");
    }
}
