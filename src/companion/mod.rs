//! Companion display boundary.
//!
//! The small always-on-top status surface shown during an active session.
//! The core drives it (open, elapsed-time updates, close) and receives a
//! single kind of input back: a stop request, which feeds the exact same
//! shutdown path as a stop from the main UI.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[async_trait]
pub trait CompanionDisplay: Send + Sync {
    /// Show the display. Called when recording starts.
    async fn open(&self) -> Result<()>;

    /// Push a freshly formatted `MM:SS` elapsed time.
    async fn show_time(&self, formatted: &str) -> Result<()>;

    /// Hide the display. Best-effort; callers log failures and move on.
    async fn close(&self) -> Result<()>;
}

/// Channel pair for stop requests originating from the companion display.
pub fn stop_channel() -> (mpsc::Sender<()>, mpsc::Receiver<()>) {
    mpsc::channel(4)
}

/// Companion used by the running service. Renders through the log (no
/// display host attached yet) and owns the stop-request sender: the
/// surface's stop action feeds the same shutdown path as a stop from
/// the API.
pub struct ServiceCompanion {
    stop_tx: mpsc::Sender<()>,
}

impl ServiceCompanion {
    pub fn new(stop_tx: mpsc::Sender<()>) -> Self {
        Self { stop_tx }
    }

    /// Deliver the surface's stop action to the session loop.
    pub async fn request_stop(&self) {
        if self.stop_tx.send(()).await.is_err() {
            warn!("Stop request dropped, session loop is gone");
        }
    }
}

#[async_trait]
impl CompanionDisplay for ServiceCompanion {
    async fn open(&self) -> Result<()> {
        info!("Recording indicator shown");
        Ok(())
    }

    async fn show_time(&self, formatted: &str) -> Result<()> {
        tracing::debug!("Recording elapsed: {}", formatted);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        info!("Recording indicator hidden");
        Ok(())
    }
}

/// Headless companion for contexts with no stop path: logs state changes
/// instead of rendering a window.
pub struct LogCompanion;

#[async_trait]
impl CompanionDisplay for LogCompanion {
    async fn open(&self) -> Result<()> {
        info!("Recording indicator shown");
        Ok(())
    }

    async fn show_time(&self, formatted: &str) -> Result<()> {
        tracing::debug!("Recording elapsed: {}", formatted);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        info!("Recording indicator hidden");
        Ok(())
    }
}
