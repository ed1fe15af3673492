//! Session lifecycle orchestrator.
//!
//! Drives one recording end-to-end:
//! start → capture → stop → save → transcribe → summarize → persist
//!
//! All boundaries (capture device, speech service, companion display, save
//! dialog) are injected — no concrete types hardcoded. At most one session
//! is active per process; the long-running transcribe/summarize stages run
//! on a spawned task so the caller is never blocked.

use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::capture::{extension_for_mime, CaptureDevice, RawCapture};
use crate::companion::CompanionDisplay;
use crate::config::CredentialHandle;
use crate::openai::{SpeechService, SUMMARY_SYSTEM_PROMPT};
use crate::store::{MetadataStore, RecordingRecord};

use super::error::SessionError;
use super::events::{EventBus, SessionEvent};
use super::status::{SessionPhase, SessionStatusHandle};
use super::timer::SessionTimer;

/// Save-location confirmation boundary (the UI's save dialog).
/// `None` means the user cancelled.
#[async_trait::async_trait]
pub trait SaveLocationPrompt: Send + Sync {
    async fn confirm(&self, suggested: &Path) -> Option<PathBuf>;
}

/// Headless default: accept the proposed location as-is.
pub struct AcceptDefaultPrompt;

#[async_trait::async_trait]
impl SaveLocationPrompt for AcceptDefaultPrompt {
    async fn confirm(&self, suggested: &Path) -> Option<PathBuf> {
        Some(suggested.to_path_buf())
    }
}

/// What a stop request amounted to.
#[derive(Debug)]
pub enum StopOutcome {
    /// Audio is on disk; transcription and summarization continue in the
    /// background.
    Stopping { audio_path: PathBuf },
    /// The user declined the save dialog; session back to idle, no writes.
    SaveCancelled,
    /// There was nothing to stop (already stopping, or idle). Logged no-op,
    /// which makes duplicate stop signals from the companion display safe.
    Ignored,
}

pub struct SessionController {
    capture: Box<dyn CaptureDevice>,
    speech: Arc<dyn SpeechService>,
    companion: Arc<dyn CompanionDisplay>,
    save_prompt: Arc<dyn SaveLocationPrompt>,
    status: SessionStatusHandle,
    events: EventBus,
    timer: SessionTimer,
    recordings_dir: PathBuf,
    credentials: CredentialHandle,
}

impl SessionController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        capture: Box<dyn CaptureDevice>,
        speech: Arc<dyn SpeechService>,
        companion: Arc<dyn CompanionDisplay>,
        save_prompt: Arc<dyn SaveLocationPrompt>,
        status: SessionStatusHandle,
        recordings_dir: PathBuf,
        credentials: CredentialHandle,
    ) -> Self {
        Self {
            capture,
            speech,
            companion,
            save_prompt,
            status,
            events: EventBus::new(),
            timer: SessionTimer::new(),
            recordings_dir,
            credentials,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn status(&self) -> SessionStatusHandle {
        self.status.clone()
    }

    /// Begin a recording session.
    ///
    /// Fails with `InvalidCredential` when no API key is configured and with
    /// `SessionAlreadyActive` from any phase but Idle — a completed or
    /// errored session must be `reset` first.
    ///
    /// The credential is checked against the live handle on every call, so
    /// a key configured after the controller was built is honored.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        if !self.credentials.is_configured().await {
            return Err(SessionError::InvalidCredential);
        }

        let phase = self.status.get().await.phase;
        if phase != SessionPhase::Idle {
            warn!(
                "Start requested while session is {}, rejecting",
                phase.as_str()
            );
            return Err(SessionError::SessionAlreadyActive);
        }

        self.set_phase(SessionPhase::RequestingAccess).await;

        if let Err(e) = self.capture.open() {
            warn!("Capture device unavailable: {}", e);
            // Recoverable locally: back to idle so the user can retry.
            self.status.reset().await;
            self.events.emit(SessionEvent::PhaseChanged(SessionPhase::Idle));
            return Err(e.into());
        }

        self.status.start_recording().await;
        self.events
            .emit(SessionEvent::PhaseChanged(SessionPhase::Recording));

        self.timer.start(self.events.clone(), self.companion.clone());

        if let Err(e) = self.companion.open().await {
            warn!("Failed to open companion display: {}", e);
        }

        info!("Recording session started");
        Ok(())
    }

    /// Stop the active recording, persist the artifact, and kick off the
    /// processing pipeline in the background.
    pub async fn stop(&mut self) -> Result<StopOutcome, SessionError> {
        let phase = self.status.get().await.phase;
        match phase {
            SessionPhase::Recording => {}
            p if p.is_pipeline() => {
                warn!("Stop requested while already {}, ignoring", p.as_str());
                return Ok(StopOutcome::Ignored);
            }
            p => {
                warn!("Stop requested while {}, nothing to do", p.as_str());
                return Ok(StopOutcome::Ignored);
            }
        }

        // Halt the timer and companion first so the UI freezes immediately;
        // a companion close failure is logged, never fatal.
        self.timer.stop();
        if let Err(e) = self.companion.close().await {
            warn!("Failed to close companion display: {}", e);
        }

        let raw = self.capture.close()?;
        if raw.bytes.is_empty() {
            error!("Capture yielded no audio data");
            self.status
                .set_error("capture produced no audio data".to_string())
                .await;
            self.events.emit(SessionEvent::Failed {
                phase: SessionPhase::Recording,
                message: "capture produced no audio data".to_string(),
            });
            return Err(SessionError::EmptyCapture);
        }

        let suggested = self.suggest_audio_path(&raw);
        let audio_path = match self.save_prompt.confirm(&suggested).await {
            Some(path) => path,
            None => {
                info!("Save cancelled by user, discarding capture");
                self.status.reset().await;
                self.events.emit(SessionEvent::SaveCancelled);
                self.events.emit(SessionEvent::PhaseChanged(SessionPhase::Idle));
                return Ok(StopOutcome::SaveCancelled);
            }
        };

        if let Some(parent) = audio_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SessionError::AudioWrite {
                path: audio_path.clone(),
                source: e,
            })?;
        }
        tokio::fs::write(&audio_path, &raw.bytes)
            .await
            .map_err(|e| SessionError::AudioWrite {
                path: audio_path.clone(),
                source: e,
            })?;

        info!("Audio saved to {:?} ({} bytes)", audio_path, raw.bytes.len());

        self.status.set_audio_path(audio_path.clone()).await;
        self.set_phase(SessionPhase::Processing).await;
        // Audio-saved is observable before metadata-complete, always: the
        // pipeline task below is what eventually emits `Completed`.
        self.events.emit(SessionEvent::AudioSaved {
            audio_path: audio_path.clone(),
        });

        self.spawn_pipeline(audio_path.clone());

        Ok(StopOutcome::Stopping { audio_path })
    }

    /// Return a finished (Complete or Error) session to Idle.
    pub async fn reset(&mut self) -> Result<(), SessionError> {
        let phase = self.status.get().await.phase;
        match phase {
            SessionPhase::Complete | SessionPhase::Error => {
                self.status.reset().await;
                self.events.emit(SessionEvent::PhaseChanged(SessionPhase::Idle));
                Ok(())
            }
            SessionPhase::Idle => Ok(()),
            _ => Err(SessionError::SessionAlreadyActive),
        }
    }

    async fn set_phase(&self, phase: SessionPhase) {
        self.status.set_phase(phase).await;
        self.events.emit(SessionEvent::PhaseChanged(phase));
    }

    fn suggest_audio_path(&self, raw: &RawCapture) -> PathBuf {
        let extension = extension_for_mime(&raw.mime);
        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let path = self
            .recordings_dir
            .join(format!("meeting_{stamp}.{extension}"));

        // Handle collision by appending a counter.
        if path.exists() {
            for i in 1..100 {
                let alt = self
                    .recordings_dir
                    .join(format!("meeting_{stamp}-{i}.{extension}"));
                if !alt.exists() {
                    return alt;
                }
            }
        }

        path
    }

    /// Transcribe → summarize → persist, off the caller's task. Failures
    /// leave the audio artifact on disk; no sidecar is written unless the
    /// whole pipeline succeeded.
    fn spawn_pipeline(&self, audio_path: PathBuf) {
        let speech = Arc::clone(&self.speech);
        let status = self.status.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            status.set_phase(SessionPhase::Transcribing).await;
            events.emit(SessionEvent::PhaseChanged(SessionPhase::Transcribing));

            let transcript = match speech.transcribe(&audio_path).await {
                Ok(text) => text,
                Err(e) => {
                    let err = SessionError::TranscriptionFailed(e.to_string());
                    error!("{}", err);
                    status.set_error(err.to_string()).await;
                    events.emit(SessionEvent::Failed {
                        phase: SessionPhase::Transcribing,
                        message: err.to_string(),
                    });
                    return;
                }
            };

            status.set_phase(SessionPhase::Summarizing).await;
            events.emit(SessionEvent::PhaseChanged(SessionPhase::Summarizing));

            let summary = match speech.summarize(&transcript, SUMMARY_SYSTEM_PROMPT).await {
                Ok(text) => text,
                Err(e) => {
                    let err = SessionError::SummarizationFailed(e.to_string());
                    error!("{}", err);
                    status.set_error(err.to_string()).await;
                    events.emit(SessionEvent::Failed {
                        phase: SessionPhase::Summarizing,
                        message: err.to_string(),
                    });
                    return;
                }
            };

            let record = RecordingRecord::new(
                audio_path.display().to_string(),
                transcript,
                summary,
            );

            let sidecar = MetadataStore::sidecar_path(&audio_path);
            if let Err(e) = MetadataStore::write(&sidecar, &record) {
                error!("Failed to persist recording metadata: {}", e);
                status.set_error(e.to_string()).await;
                events.emit(SessionEvent::Failed {
                    phase: SessionPhase::Summarizing,
                    message: e.to_string(),
                });
                return;
            }

            info!("Recording complete: {:?}", sidecar);
            status.complete().await;
            events.emit(SessionEvent::PhaseChanged(SessionPhase::Complete));
            events.emit(SessionEvent::Completed(record));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureError;
    use crate::companion::LogCompanion;
    use anyhow::{anyhow, Result};
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;
    use tokio::time::{timeout, Duration};

    struct FakeCapture {
        bytes: Vec<u8>,
        mime: String,
        active: bool,
    }

    impl FakeCapture {
        fn with_audio() -> Self {
            Self {
                bytes: vec![1, 2, 3, 4],
                mime: "audio/ogg".to_string(),
                active: false,
            }
        }

        fn empty() -> Self {
            Self {
                bytes: Vec::new(),
                mime: "audio/ogg".to_string(),
                active: false,
            }
        }
    }

    impl CaptureDevice for FakeCapture {
        fn open(&mut self) -> Result<(), CaptureError> {
            self.active = true;
            Ok(())
        }

        fn close(&mut self) -> Result<RawCapture, CaptureError> {
            self.active = false;
            Ok(RawCapture {
                bytes: self.bytes.clone(),
                mime: self.mime.clone(),
            })
        }

        fn is_active(&self) -> bool {
            self.active
        }
    }

    struct DeniedCapture;

    impl CaptureDevice for DeniedCapture {
        fn open(&mut self) -> Result<(), CaptureError> {
            Err(CaptureError::AccessDenied("microphone blocked".to_string()))
        }

        fn close(&mut self) -> Result<RawCapture, CaptureError> {
            Err(CaptureError::Stream("not active".to_string()))
        }

        fn is_active(&self) -> bool {
            false
        }
    }

    enum SpeechScript {
        Ok,
        TranscribeFails,
        SummarizeFails,
    }

    struct FakeSpeech {
        script: SpeechScript,
        calls: StdMutex<Vec<&'static str>>,
    }

    impl FakeSpeech {
        fn new(script: SpeechScript) -> Self {
            Self {
                script,
                calls: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl SpeechService for FakeSpeech {
        async fn transcribe(&self, _audio_path: &Path) -> Result<String> {
            self.calls.lock().unwrap().push("transcribe");
            match self.script {
                SpeechScript::TranscribeFails => Err(anyhow!("whisper unavailable")),
                _ => Ok("the transcript".to_string()),
            }
        }

        async fn summarize(&self, _transcript: &str, _system_prompt: &str) -> Result<String> {
            self.calls.lock().unwrap().push("summarize");
            match self.script {
                SpeechScript::SummarizeFails => Err(anyhow!("model overloaded")),
                _ => Ok("the summary".to_string()),
            }
        }
    }

    /// Speech service whose transcription stage parks until released,
    /// keeping the pipeline observably in flight.
    struct GatedSpeech {
        gate: tokio::sync::Mutex<Option<tokio::sync::oneshot::Receiver<()>>>,
    }

    impl GatedSpeech {
        fn new(release: tokio::sync::oneshot::Receiver<()>) -> Self {
            Self {
                gate: tokio::sync::Mutex::new(Some(release)),
            }
        }
    }

    #[async_trait::async_trait]
    impl SpeechService for GatedSpeech {
        async fn transcribe(&self, _audio_path: &Path) -> Result<String> {
            if let Some(release) = self.gate.lock().await.take() {
                let _ = release.await;
            }
            Ok("the transcript".to_string())
        }

        async fn summarize(&self, _transcript: &str, _system_prompt: &str) -> Result<String> {
            Ok("the summary".to_string())
        }
    }

    struct CancelPrompt;

    #[async_trait::async_trait]
    impl SaveLocationPrompt for CancelPrompt {
        async fn confirm(&self, _suggested: &Path) -> Option<PathBuf> {
            None
        }
    }

    fn controller_with(
        dir: &TempDir,
        capture: Box<dyn CaptureDevice>,
        speech: Arc<dyn SpeechService>,
        prompt: Arc<dyn SaveLocationPrompt>,
        api_key: Option<&str>,
    ) -> SessionController {
        SessionController::new(
            capture,
            speech,
            Arc::new(LogCompanion),
            prompt,
            SessionStatusHandle::default(),
            dir.path().to_path_buf(),
            CredentialHandle::new(api_key.map(|k| k.to_string())),
        )
    }

    fn dir_file_count(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).map(|rd| rd.count()).unwrap_or(0)
    }

    async fn wait_for_completed(
        sub: &mut crate::session::EventSubscription,
    ) -> Vec<SessionEvent> {
        let mut seen = Vec::new();
        timeout(Duration::from_secs(5), async {
            loop {
                let event = sub.recv().await.unwrap();
                let done = matches!(
                    event,
                    SessionEvent::Completed(_) | SessionEvent::Failed { .. }
                );
                seen.push(event);
                if done {
                    break;
                }
            }
        })
        .await
        .expect("pipeline did not finish");
        seen
    }

    #[tokio::test]
    async fn test_start_without_credential_fails() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller_with(
            &dir,
            Box::new(FakeCapture::with_audio()),
            Arc::new(FakeSpeech::new(SpeechScript::Ok)),
            Arc::new(AcceptDefaultPrompt),
            None,
        );

        assert!(matches!(
            controller.start().await,
            Err(SessionError::InvalidCredential)
        ));
        assert_eq!(controller.status().get().await.phase, SessionPhase::Idle);
    }

    #[tokio::test]
    async fn test_second_start_rejected_and_session_untouched() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller_with(
            &dir,
            Box::new(FakeCapture::with_audio()),
            Arc::new(FakeSpeech::new(SpeechScript::Ok)),
            Arc::new(AcceptDefaultPrompt),
            Some("sk-test"),
        );

        controller.start().await.unwrap();
        let before = controller.status().get().await;

        assert!(matches!(
            controller.start().await,
            Err(SessionError::SessionAlreadyActive)
        ));

        let after = controller.status().get().await;
        assert_eq!(after.phase, SessionPhase::Recording);
        assert_eq!(after.started_at, before.started_at);
    }

    #[tokio::test]
    async fn test_device_access_denied_returns_to_idle() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller_with(
            &dir,
            Box::new(DeniedCapture),
            Arc::new(FakeSpeech::new(SpeechScript::Ok)),
            Arc::new(AcceptDefaultPrompt),
            Some("sk-test"),
        );

        assert!(matches!(
            controller.start().await,
            Err(SessionError::DeviceAccessDenied(_))
        ));
        assert_eq!(controller.status().get().await.phase, SessionPhase::Idle);
    }

    #[tokio::test]
    async fn test_stop_with_empty_capture_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller_with(
            &dir,
            Box::new(FakeCapture::empty()),
            Arc::new(FakeSpeech::new(SpeechScript::Ok)),
            Arc::new(AcceptDefaultPrompt),
            Some("sk-test"),
        );

        controller.start().await.unwrap();
        assert!(matches!(
            controller.stop().await,
            Err(SessionError::EmptyCapture)
        ));

        assert_eq!(dir_file_count(&dir), 0);
        assert_eq!(controller.status().get().await.phase, SessionPhase::Error);
    }

    #[tokio::test]
    async fn test_save_cancel_returns_to_idle_without_writes() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller_with(
            &dir,
            Box::new(FakeCapture::with_audio()),
            Arc::new(FakeSpeech::new(SpeechScript::Ok)),
            Arc::new(CancelPrompt),
            Some("sk-test"),
        );

        controller.start().await.unwrap();
        let outcome = controller.stop().await.unwrap();

        assert!(matches!(outcome, StopOutcome::SaveCancelled));
        assert_eq!(dir_file_count(&dir), 0);
        assert_eq!(controller.status().get().await.phase, SessionPhase::Idle);
    }

    #[tokio::test]
    async fn test_full_pipeline_writes_one_artifact_and_one_sidecar() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller_with(
            &dir,
            Box::new(FakeCapture::with_audio()),
            Arc::new(FakeSpeech::new(SpeechScript::Ok)),
            Arc::new(AcceptDefaultPrompt),
            Some("sk-test"),
        );

        let mut sub = controller.events().subscribe();
        controller.start().await.unwrap();

        let audio_path = match controller.stop().await.unwrap() {
            StopOutcome::Stopping { audio_path } => audio_path,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(audio_path.extension().and_then(|e| e.to_str()), Some("ogg"));

        let seen = wait_for_completed(&mut sub).await;

        // Audio-saved must be observable before completion.
        let saved_pos = seen
            .iter()
            .position(|e| matches!(e, SessionEvent::AudioSaved { .. }))
            .expect("no AudioSaved event");
        let completed_pos = seen
            .iter()
            .position(|e| matches!(e, SessionEvent::Completed(_)))
            .expect("no Completed event");
        assert!(saved_pos < completed_pos);

        let record = seen
            .iter()
            .find_map(|e| match e {
                SessionEvent::Completed(r) => Some(r.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(record.transcript, "the transcript");
        assert_eq!(record.summary, "the summary");
        assert_eq!(record.audio_file_path, audio_path.display().to_string());
        assert!(record.recording_timestamp.is_some());

        // Exactly one artifact and one sidecar, and the sidecar points at
        // the artifact.
        assert_eq!(dir_file_count(&dir), 2);
        let sidecar = MetadataStore::sidecar_path(&audio_path);
        let persisted = MetadataStore::read(&sidecar).unwrap();
        assert_eq!(
            PathBuf::from(&persisted.audio_file_path),
            audio_path
        );
        assert_eq!(
            controller.status().get().await.phase,
            SessionPhase::Complete
        );
    }

    #[tokio::test]
    async fn test_transcription_failure_keeps_audio_no_sidecar() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller_with(
            &dir,
            Box::new(FakeCapture::with_audio()),
            Arc::new(FakeSpeech::new(SpeechScript::TranscribeFails)),
            Arc::new(AcceptDefaultPrompt),
            Some("sk-test"),
        );

        let mut sub = controller.events().subscribe();
        controller.start().await.unwrap();
        let audio_path = match controller.stop().await.unwrap() {
            StopOutcome::Stopping { audio_path } => audio_path,
            other => panic!("unexpected outcome: {other:?}"),
        };

        let seen = wait_for_completed(&mut sub).await;
        assert!(seen.iter().any(|e| matches!(
            e,
            SessionEvent::Failed { phase: SessionPhase::Transcribing, .. }
        )));

        assert!(audio_path.exists(), "audio artifact must be retained");
        assert!(!MetadataStore::sidecar_path(&audio_path).exists());
        assert_eq!(controller.status().get().await.phase, SessionPhase::Error);
    }

    #[tokio::test]
    async fn test_summarization_failure_keeps_audio_no_sidecar() {
        let dir = TempDir::new().unwrap();
        let speech = Arc::new(FakeSpeech::new(SpeechScript::SummarizeFails));
        let mut controller = controller_with(
            &dir,
            Box::new(FakeCapture::with_audio()),
            speech.clone(),
            Arc::new(AcceptDefaultPrompt),
            Some("sk-test"),
        );

        let mut sub = controller.events().subscribe();
        controller.start().await.unwrap();
        let audio_path = match controller.stop().await.unwrap() {
            StopOutcome::Stopping { audio_path } => audio_path,
            other => panic!("unexpected outcome: {other:?}"),
        };

        let seen = wait_for_completed(&mut sub).await;
        assert!(seen.iter().any(|e| matches!(
            e,
            SessionEvent::Failed { phase: SessionPhase::Summarizing, .. }
        )));

        assert_eq!(
            *speech.calls.lock().unwrap(),
            vec!["transcribe", "summarize"]
        );
        assert!(audio_path.exists());
        assert!(!MetadataStore::sidecar_path(&audio_path).exists());
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_ignored() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller_with(
            &dir,
            Box::new(FakeCapture::with_audio()),
            Arc::new(FakeSpeech::new(SpeechScript::Ok)),
            Arc::new(AcceptDefaultPrompt),
            Some("sk-test"),
        );

        assert!(matches!(
            controller.stop().await.unwrap(),
            StopOutcome::Ignored
        ));
    }

    #[tokio::test]
    async fn test_reset_after_complete_allows_new_start() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller_with(
            &dir,
            Box::new(FakeCapture::with_audio()),
            Arc::new(FakeSpeech::new(SpeechScript::Ok)),
            Arc::new(AcceptDefaultPrompt),
            Some("sk-test"),
        );

        let mut sub = controller.events().subscribe();
        controller.start().await.unwrap();
        controller.stop().await.unwrap();
        wait_for_completed(&mut sub).await;

        // Complete is not restartable until reset.
        assert!(matches!(
            controller.start().await,
            Err(SessionError::SessionAlreadyActive)
        ));

        controller.reset().await.unwrap();
        assert_eq!(controller.status().get().await.phase, SessionPhase::Idle);
        controller.start().await.unwrap();
        assert_eq!(
            controller.status().get().await.phase,
            SessionPhase::Recording
        );
    }

    #[tokio::test]
    async fn test_reset_while_recording_rejected() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller_with(
            &dir,
            Box::new(FakeCapture::with_audio()),
            Arc::new(FakeSpeech::new(SpeechScript::Ok)),
            Arc::new(AcceptDefaultPrompt),
            Some("sk-test"),
        );

        controller.start().await.unwrap();
        assert!(matches!(
            controller.reset().await,
            Err(SessionError::SessionAlreadyActive)
        ));
    }

    #[tokio::test]
    async fn test_credential_set_after_construction_is_honored() {
        let dir = TempDir::new().unwrap();
        let credentials = CredentialHandle::new(None);
        let mut controller = SessionController::new(
            Box::new(FakeCapture::with_audio()),
            Arc::new(FakeSpeech::new(SpeechScript::Ok)),
            Arc::new(LogCompanion),
            Arc::new(AcceptDefaultPrompt),
            SessionStatusHandle::default(),
            dir.path().to_path_buf(),
            credentials.clone(),
        );

        assert!(matches!(
            controller.start().await,
            Err(SessionError::InvalidCredential)
        ));

        // The key arrives while the service is running; the next start
        // must see it without rebuilding anything.
        credentials.set(Some("sk-live".to_string())).await;
        controller.start().await.unwrap();
        assert_eq!(
            controller.status().get().await.phase,
            SessionPhase::Recording
        );

        // And clearing it blocks the session after the next reset.
        controller.stop().await.unwrap();
        credentials.set(None).await;
        assert!(matches!(
            controller.start().await,
            Err(SessionError::InvalidCredential)
        ));
    }

    #[tokio::test]
    async fn test_stop_during_pipeline_is_ignored_and_pipeline_completes() {
        let dir = TempDir::new().unwrap();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel();
        let mut controller = controller_with(
            &dir,
            Box::new(FakeCapture::with_audio()),
            Arc::new(GatedSpeech::new(release_rx)),
            Arc::new(AcceptDefaultPrompt),
            Some("sk-test"),
        );

        let mut sub = controller.events().subscribe();
        controller.start().await.unwrap();
        controller.stop().await.unwrap();

        // The transcription stage is parked on the gate; a second stop
        // while the pipeline owns the session must be a no-op.
        assert!(controller.status().get().await.phase.is_pipeline());
        assert!(matches!(
            controller.stop().await.unwrap(),
            StopOutcome::Ignored
        ));

        release_tx.send(()).unwrap();
        let seen = wait_for_completed(&mut sub).await;
        assert!(seen
            .iter()
            .any(|e| matches!(e, SessionEvent::Completed(_))));
        assert_eq!(
            controller.status().get().await.phase,
            SessionPhase::Complete
        );
    }
}
