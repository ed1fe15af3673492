//! Session timer: one tick per second while recording.
//!
//! The elapsed counter is written only by the timer's own task; everyone
//! else reads. Cancellation is hard: once `stop` returns, no tick fires,
//! including a tick that was already sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::events::{EventBus, SessionEvent};
use crate::companion::CompanionDisplay;

/// Zero-padded `MM:SS` for an elapsed-seconds count.
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[derive(Default)]
pub struct SessionTimer {
    elapsed: Arc<AtomicU64>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.cancel.is_some()
    }

    /// Start ticking from zero. Each tick increments the counter, emits a
    /// `Tick` event, and pushes the formatted time to the companion display.
    pub fn start(&mut self, events: EventBus, companion: Arc<dyn CompanionDisplay>) {
        self.stop();
        self.elapsed.store(0, Ordering::SeqCst);

        let cancel = CancellationToken::new();
        let elapsed = self.elapsed.clone();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {
                        let seconds = elapsed.fetch_add(1, Ordering::SeqCst) + 1;
                        let formatted = format_elapsed(seconds);
                        events.emit(SessionEvent::Tick(formatted.clone()));
                        if let Err(e) = companion.show_time(&formatted).await {
                            debug!("Companion display rejected tick: {}", e);
                        }
                    }
                }
            }
        });

        self.cancel = Some(cancel);
        self.task = Some(task);
    }

    /// Cancel the tick loop. Safe to call twice.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
