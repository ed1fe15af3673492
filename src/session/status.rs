//! Session phase types and the shared state handle.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Phase of the recording session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    RequestingAccess,
    Recording,
    Processing,
    Transcribing,
    Summarizing,
    Complete,
    Error,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::RequestingAccess => "requesting_access",
            Self::Recording => "recording",
            Self::Processing => "processing",
            Self::Transcribing => "transcribing",
            Self::Summarizing => "summarizing",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    /// True while the post-stop pipeline owns the session.
    pub fn is_pipeline(&self) -> bool {
        matches!(
            self,
            Self::Processing | Self::Transcribing | Self::Summarizing
        )
    }
}

/// Current session state, readable by API handlers.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub audio_path: Option<PathBuf>,
    pub last_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            started_at: None,
            audio_path: None,
            last_error: None,
        }
    }
}

impl SessionState {
    /// Wall-clock seconds since recording started.
    pub fn duration_seconds(&self) -> Option<u64> {
        self.started_at.map(|started| {
            let elapsed = chrono::Utc::now() - started;
            elapsed.num_seconds().max(0) as u64
        })
    }
}

/// Thread-safe handle shared between the controller, its spawned pipeline
/// task, and API handlers.
#[derive(Clone, Default)]
pub struct SessionStatusHandle {
    inner: Arc<Mutex<SessionState>>,
}

impl SessionStatusHandle {
    pub async fn get(&self) -> SessionState {
        self.inner.lock().await.clone()
    }

    pub async fn start_recording(&self) {
        let mut state = self.inner.lock().await;
        state.phase = SessionPhase::Recording;
        state.started_at = Some(chrono::Utc::now());
        state.audio_path = None;
        state.last_error = None;
    }

    pub async fn set_phase(&self, phase: SessionPhase) {
        let mut state = self.inner.lock().await;
        state.phase = phase;
    }

    pub async fn set_audio_path(&self, path: PathBuf) {
        let mut state = self.inner.lock().await;
        state.audio_path = Some(path);
    }

    pub async fn set_error(&self, error: String) {
        let mut state = self.inner.lock().await;
        state.phase = SessionPhase::Error;
        state.last_error = Some(error);
    }

    pub async fn complete(&self) {
        let mut state = self.inner.lock().await;
        state.phase = SessionPhase::Complete;
    }

    pub async fn reset(&self) {
        let mut state = self.inner.lock().await;
        *state = SessionState::default();
    }
}
