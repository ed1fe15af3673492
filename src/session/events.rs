//! Lifecycle notifications.
//!
//! Each stage of the session reports through a tagged event carrying exactly
//! the fields valid for that stage. Subscribers hold an explicit handle and
//! tear it down when the consuming view goes away; nothing fires into a
//! closed subscription.

use std::path::PathBuf;
use tokio::sync::broadcast;

use super::status::SessionPhase;
use crate::store::RecordingRecord;

#[derive(Debug, Clone)]
pub enum SessionEvent {
    PhaseChanged(SessionPhase),
    /// One timer tick, already formatted as zero-padded `MM:SS`.
    Tick(String),
    /// The audio artifact hit disk; metadata is still pending. Always
    /// delivered before `Completed` for the same session.
    AudioSaved { audio_path: PathBuf },
    /// The user declined the save dialog; the session returned to idle.
    SaveCancelled,
    /// Transcript and summary persisted; the full record is attached.
    Completed(RecordingRecord),
    Failed {
        phase: SessionPhase,
        message: String,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Deliver to all live subscriptions. Send errors (no subscribers) are
    /// expected and ignored.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for one subscriber. Dropping (or `close`) ends delivery.
pub struct EventSubscription {
    rx: broadcast::Receiver<SessionEvent>,
}

impl EventSubscription {
    pub async fn recv(&mut self) -> Result<SessionEvent, broadcast::error::RecvError> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<SessionEvent, broadcast::error::TryRecvError> {
        self.rx.try_recv()
    }

    pub fn close(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_reaches_subscriber() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();

        bus.emit(SessionEvent::PhaseChanged(SessionPhase::Recording));

        match sub.recv().await.unwrap() {
            SessionEvent::PhaseChanged(phase) => assert_eq!(phase, SessionPhase::Recording),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.emit(SessionEvent::SaveCancelled);
    }

    #[tokio::test]
    async fn test_closed_subscription_stops_delivery() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        sub.close();

        // A second, live subscription still works.
        let mut live = bus.subscribe();
        bus.emit(SessionEvent::Tick("00:01".to_string()));
        assert!(matches!(
            live.recv().await.unwrap(),
            SessionEvent::Tick(ref t) if t == "00:01"
        ));
    }
}
