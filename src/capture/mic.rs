//! Microphone capture via cpal.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

use super::{CaptureDevice, CaptureError, RawCapture};

const SAMPLE_RATE: u32 = 16000;

pub struct MicCaptureDevice {
    device: cpal::Device,
    config: cpal::StreamConfig,
    samples: Arc<Mutex<Vec<f32>>>,
    stream: Option<cpal::Stream>,
    active: bool,
}

impl MicCaptureDevice {
    /// Create a capture device, by name or the host default.
    pub fn new(device_name: Option<&str>) -> Result<Self, CaptureError> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => host
                .input_devices()
                .map_err(|e| CaptureError::AccessDenied(e.to_string()))?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| CaptureError::NotFound(name.to_string()))?,
            None => host
                .default_input_device()
                .ok_or_else(|| CaptureError::NotFound("default input device".to_string()))?,
        };

        info!(
            "Using input device: {}",
            device.name().unwrap_or_else(|_| "unknown".to_string())
        );

        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        Ok(Self {
            device,
            config,
            samples: Arc::new(Mutex::new(Vec::new())),
            stream: None,
            active: false,
        })
    }
}

impl CaptureDevice for MicCaptureDevice {
    fn open(&mut self) -> Result<(), CaptureError> {
        if self.active {
            return Err(CaptureError::Stream("capture already active".to_string()));
        }

        {
            let mut samples = self.samples.lock().unwrap();
            samples.clear();
            samples.shrink_to_fit();
        }

        let samples_clone = self.samples.clone();
        let err_fn = |err| error!("Input stream error: {}", err);

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut samples) = samples_clone.lock() {
                        samples.extend_from_slice(data);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| match e {
                cpal::BuildStreamError::DeviceNotAvailable => {
                    CaptureError::NotFound("input device no longer available".to_string())
                }
                other => CaptureError::AccessDenied(other.to_string()),
            })?;

        stream
            .play()
            .map_err(|e| CaptureError::Stream(e.to_string()))?;
        self.stream = Some(stream);
        self.active = true;

        info!("Microphone capture started");
        Ok(())
    }

    fn close(&mut self) -> Result<RawCapture, CaptureError> {
        if !self.active {
            return Err(CaptureError::Stream("capture not active".to_string()));
        }

        if let Some(stream) = self.stream.take() {
            debug!("Stopping input stream");
            drop(stream);
        }
        self.active = false;

        let samples = {
            let mut guard = self.samples.lock().unwrap();
            let s = std::mem::take(&mut *guard);
            guard.shrink_to_fit();
            s
        };

        info!("Microphone stopped, {} samples captured", samples.len());

        if samples.is_empty() {
            return Ok(RawCapture {
                bytes: Vec::new(),
                mime: "audio/wav".to_string(),
            });
        }

        let bytes = encode_wav(&samples, SAMPLE_RATE)
            .map_err(|e| CaptureError::Stream(e.to_string()))?;

        Ok(RawCapture {
            bytes,
            mime: "audio/wav".to_string(),
        })
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for MicCaptureDevice {
    fn drop(&mut self) {
        if self.active {
            debug!("Dropping active MicCaptureDevice, cleaning up");
            let _ = self.close();
        }
    }
}

fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_wav_produces_riff_header() {
        let samples = vec![0.0f32; 160];
        let bytes = encode_wav(&samples, 16000).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
    }
}
