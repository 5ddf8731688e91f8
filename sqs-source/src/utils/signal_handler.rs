use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[cfg(unix)]
use signal::unix::{signal, SignalKind};

/// Signal types that can trigger shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGTERM - Docker/Kubernetes graceful shutdown
    Terminate,
    /// SIGINT - Ctrl+C interactive shutdown
    Interrupt,
    /// SIGQUIT - Quit signal
    Quit,
    /// Internal - Application-triggered shutdown
    Internal,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
            ShutdownSignal::Interrupt => write!(f, "SIGINT"),
            ShutdownSignal::Quit => write!(f, "SIGQUIT"),
            ShutdownSignal::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Signal handler for graceful shutdown
///
/// The first signal starts a graceful pool shutdown. Once that has begun,
/// [`interrupt_on_next_signal`](Self::interrupt_on_next_signal) turns any further
/// signal into a cancellation of the pool's interrupt token.
pub struct SignalHandler {
    shutdown_signal: Option<ShutdownSignal>,
    internal_shutdown_notify: Arc<Notify>,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self { shutdown_signal: None, internal_shutdown_notify: Arc::new(Notify::new()) }
    }

    /// Get a handle to trigger internal shutdown
    pub fn get_shutdown_trigger(&self) -> Arc<Notify> {
        self.internal_shutdown_notify.clone()
    }

    /// Wait for any shutdown signal and return which one was received
    pub async fn wait_for_shutdown(&mut self) -> Result<ShutdownSignal> {
        let signal = wait_for_signal(Some(self.internal_shutdown_notify.as_ref())).await?;
        self.shutdown_signal = Some(signal);
        info!(%signal, "Received shutdown signal");
        Ok(signal)
    }

    /// Get the signal that triggered shutdown (if any)
    pub fn shutdown_signal(&self) -> Option<ShutdownSignal> {
        self.shutdown_signal
    }

    /// Cancel `interrupt` when the next OS signal arrives.
    ///
    /// The returned task must be aborted once shutdown completes.
    pub fn interrupt_on_next_signal(&self, interrupt: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::select! {
                _ = interrupt.cancelled() => {}
                received = wait_for_signal(None) => match received {
                    Ok(signal) => {
                        warn!(%signal, "Second shutdown signal received, interrupting shutdown");
                        interrupt.cancel();
                    }
                    Err(e) => error!(error = %e, "Failed to listen for interrupt signal"),
                },
            }
        })
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn wait_for_signal(internal: Option<&Notify>) -> Result<ShutdownSignal> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
    let mut sigquit = signal(SignalKind::quit()).context("Failed to create SIGQUIT handler")?;

    let internal_notified = async {
        match internal {
            Some(notify) => notify.notified().await,
            None => std::future::pending().await,
        }
    };

    let signal = tokio::select! {
        _ = sigterm.recv() => {
            info!("Docker/Kubernetes graceful shutdown initiated (SIGTERM)");
            ShutdownSignal::Terminate
        }
        _ = sigint.recv() => {
            info!("Interactive shutdown initiated (SIGINT/Ctrl+C)");
            ShutdownSignal::Interrupt
        }
        _ = sigquit.recv() => {
            warn!("Quit signal received (SIGQUIT)");
            ShutdownSignal::Quit
        }
        _ = internal_notified => {
            warn!("Internal application shutdown requested");
            ShutdownSignal::Internal
        }
    };
    Ok(signal)
}

#[cfg(not(unix))]
async fn wait_for_signal(internal: Option<&Notify>) -> Result<ShutdownSignal> {
    let internal_notified = async {
        match internal {
            Some(notify) => notify.notified().await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        result = signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            info!("Interactive shutdown initiated (Ctrl+C)");
            Ok(ShutdownSignal::Interrupt)
        }
        _ = internal_notified => {
            warn!("Internal application shutdown requested");
            Ok(ShutdownSignal::Internal)
        }
    }
}
