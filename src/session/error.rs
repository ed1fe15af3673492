use std::path::PathBuf;
use thiserror::Error;

use crate::capture::CaptureError;
use crate::store::StoreError;

/// Failures of the session lifecycle. `SaveCancelled` is deliberately not
/// here: cancelling the save dialog is a user choice, reported through
/// `StopOutcome`.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no API credential configured")]
    InvalidCredential,

    #[error("a recording session is already active")]
    SessionAlreadyActive,

    #[error("capture produced no audio data")]
    EmptyCapture,

    #[error("audio device access denied: {0}")]
    DeviceAccessDenied(String),

    #[error("audio input device not found: {0}")]
    DeviceNotFound(String),

    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("summarization failed: {0}")]
    SummarizationFailed(String),

    #[error("failed to write audio artifact {path}: {source}")]
    AudioWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CaptureError> for SessionError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::NotFound(msg) => SessionError::DeviceNotFound(msg),
            CaptureError::AccessDenied(msg) | CaptureError::Stream(msg) => {
                SessionError::DeviceAccessDenied(msg)
            }
        }
    }
}
