//! Audio capture boundary.
//!
//! The session controller consumes these capabilities; it does not implement
//! capture itself. The built-in implementation records the microphone via
//! cpal and hands back WAV bytes.

use thiserror::Error;

mod mic;

pub use mic::MicCaptureDevice;

/// Raw capture bytes plus the container MIME they were encoded with.
#[derive(Debug, Clone)]
pub struct RawCapture {
    pub bytes: Vec<u8>,
    pub mime: String,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("audio device access denied: {0}")]
    AccessDenied(String),
    #[error("audio input device not found: {0}")]
    NotFound(String),
    #[error("audio stream error: {0}")]
    Stream(String),
}

/// Capability to open an input stream and drain it into raw bytes.
///
/// Implementations are not required to be `Send`; the controller keeps the
/// device on the task that created it.
pub trait CaptureDevice {
    /// Acquire the device and start accumulating audio.
    fn open(&mut self) -> Result<(), CaptureError>;

    /// Stop capturing and return everything accumulated since `open`.
    fn close(&mut self) -> Result<RawCapture, CaptureError>;

    fn is_active(&self) -> bool;
}

/// Enumerate input device names on the default host.
pub fn list_input_devices() -> Result<Vec<String>, CaptureError> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| CaptureError::AccessDenied(e.to_string()))?;

    Ok(devices
        .filter_map(|d| d.name().ok())
        .collect())
}

/// File extension for a capture MIME. Unknown containers fall back to webm,
/// which is what browser-side recorders produce by default.
pub fn extension_for_mime(mime: &str) -> &'static str {
    if mime.contains("ogg") {
        "ogg"
    } else if mime.contains("mp4") {
        "mp4"
    } else if mime.contains("aac") {
        "aac"
    } else if mime.contains("wav") {
        "wav"
    } else {
        "webm"
    }
}
