//! Local recordings index.
//!
//! Scans the recordings directory for `meeting_*.json` sidecars and derives a
//! displayable, most-recent-first listing. Reading is strictly per-file: one
//! corrupt sidecar degrades to a minimal entry instead of failing the whole
//! listing. This module never writes sidecars.

use chrono::{Local, TimeZone};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::store::{self, MetadataStore, DEFAULT_DISPLAY_NAME};

const SIDECAR_PREFIX: &str = "meeting_";
const SIDECAR_SUFFIX: &str = ".json";

const FALLBACK_SUMMARY: &str = "Summary not available.";
const FALLBACK_TRANSCRIPT: &str = "Transcript not available.";
const FALLBACK_AUDIO_PATH: &str = "Audio file path not available.";

/// One row of the recordings listing.
#[derive(Debug, Clone, Serialize)]
pub struct RecordingEntry {
    /// Path of the sidecar file; doubles as the entry's identifier.
    pub sidecar_path: PathBuf,
    pub display_name: String,
    pub tags: Vec<String>,
    pub summary: String,
    pub transcript: String,
    pub audio_file_path: String,
    /// Ordering key: the sidecar's `recordingTimestamp`, or the file's
    /// last-modified time when the sidecar lacks one.
    pub timestamp_ms: i64,
    /// Human-readable form of `timestamp_ms` in local time.
    pub recorded_at: String,
    pub size_bytes: u64,
    /// The raw value from the sidecar, if it had one.
    pub recording_timestamp: Option<i64>,
}

pub struct RecordingsLibrary {
    dir: PathBuf,
    updates: broadcast::Sender<Vec<RecordingEntry>>,
}

impl RecordingsLibrary {
    pub fn new(dir: PathBuf) -> Self {
        let (updates, _) = broadcast::channel(8);
        Self { dir, updates }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Receive fresh listings whenever `refresh` runs.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<RecordingEntry>> {
        self.updates.subscribe()
    }

    /// Enumerate all recordings, most recent first.
    ///
    /// A missing directory yields an empty listing (nothing recorded yet).
    pub fn list(&self) -> Vec<RecordingEntry> {
        let read_dir = match std::fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) => {
                debug!("Recordings directory {:?} not readable: {}", self.dir, e);
                return Vec::new();
            }
        };

        let mut entries: Vec<RecordingEntry> = read_dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| is_sidecar(path))
            .map(|path| self.load_entry(&path))
            .collect();

        // Stable sort keeps ties in scan order.
        entries.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
        entries
    }

    /// Re-list and notify subscribers. Called after a save or metadata edit.
    pub fn refresh(&self) -> Vec<RecordingEntry> {
        let entries = self.list();
        let _ = self.updates.send(entries.clone());
        entries
    }

    fn load_entry(&self, sidecar_path: &Path) -> RecordingEntry {
        let size_bytes = std::fs::metadata(sidecar_path).map(|m| m.len()).unwrap_or(0);
        let mtime_ms = store::file_mtime_millis(sidecar_path).unwrap_or(0);

        match MetadataStore::read(sidecar_path) {
            Ok(record) => {
                let timestamp_ms = match record.recording_timestamp {
                    Some(ts) => ts,
                    None => {
                        warn!(
                            "Sidecar {:?} missing recordingTimestamp, using mtime as fallback",
                            sidecar_path
                        );
                        mtime_ms
                    }
                };
                RecordingEntry {
                    sidecar_path: sidecar_path.to_path_buf(),
                    display_name: record.display_name,
                    tags: record.tags,
                    summary: record.summary,
                    transcript: record.transcript,
                    audio_file_path: record.audio_file_path,
                    timestamp_ms,
                    recorded_at: format_timestamp(timestamp_ms),
                    size_bytes,
                    recording_timestamp: record.recording_timestamp,
                }
            }
            Err(e) => {
                warn!("Error reading sidecar {:?}: {}", sidecar_path, e);
                RecordingEntry {
                    sidecar_path: sidecar_path.to_path_buf(),
                    display_name: DEFAULT_DISPLAY_NAME.to_string(),
                    tags: Vec::new(),
                    summary: FALLBACK_SUMMARY.to_string(),
                    transcript: FALLBACK_TRANSCRIPT.to_string(),
                    audio_file_path: FALLBACK_AUDIO_PATH.to_string(),
                    timestamp_ms: mtime_ms,
                    recorded_at: format_timestamp(mtime_ms),
                    size_bytes,
                    recording_timestamp: None,
                }
            }
        }
    }
}

fn is_sidecar(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(SIDECAR_PREFIX) && n.ends_with(SIDECAR_SUFFIX))
        .unwrap_or(false)
}

fn format_timestamp(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "Unknown".to_string(),
    }
}
