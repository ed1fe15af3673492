//! Sidecar metadata store.
//!
//! Every recording has exactly one JSON sidecar next to its audio artifact
//! (`meeting_X.ogg` → `meeting_X.json`). This module is the only writer of
//! sidecar files; the recordings library only reads them.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Display name given to a recording until the user renames it.
pub const DEFAULT_DISPLAY_NAME: &str = "Meeting";

/// The persisted unit for one completed recording.
///
/// Field names follow the on-disk JSON contract (camelCase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingRecord {
    /// Epoch millis captured when processing completed. Absent on legacy
    /// sidecars; backfilled from file mtime on the next write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_timestamp: Option<i64>,
    pub display_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub summary: String,
    pub audio_file_path: String,
}

impl RecordingRecord {
    /// A freshly processed record with the default display name and no tags.
    pub fn new(audio_file_path: String, transcript: String, summary: String) -> Self {
        Self {
            recording_timestamp: Some(Utc::now().timestamp_millis()),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            tags: Vec::new(),
            transcript,
            summary,
            audio_file_path,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("recording metadata not found: {0}")]
    NotFound(PathBuf),
    #[error("recording metadata is corrupt: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub struct MetadataStore;

impl MetadataStore {
    /// Sidecar path for an audio artifact: same stem, `.json` extension.
    pub fn sidecar_path(audio_path: &Path) -> PathBuf {
        audio_path.with_extension("json")
    }

    /// Parse the sidecar at `path`.
    pub fn read(path: &Path) -> Result<RecordingRecord, StoreError> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    /// Serialize and replace the sidecar atomically: a reader never observes
    /// a half-written file. Writes to a temp file in the same directory and
    /// renames over the target.
    pub fn write(path: &Path, record: &RecordingRecord) -> Result<(), StoreError> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let json = serde_json::to_string_pretty(record)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;

        debug!("Sidecar written: {:?}", path);
        Ok(())
    }

    /// Apply a user edit to `displayName` and `tags`, leaving everything else
    /// untouched. A missing `recordingTimestamp` is backfilled from the
    /// sidecar's pre-edit mtime before the rewrite.
    pub fn update(
        path: &Path,
        display_name: String,
        tags: Vec<String>,
    ) -> Result<RecordingRecord, StoreError> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }

        // mtime must be captured before the write below changes it.
        let modified_ms = file_mtime_millis(path)?;
        let mut record = Self::read(path)?;

        if record.recording_timestamp.is_none() {
            info!(
                "Sidecar {:?} missing recordingTimestamp, backfilling from mtime",
                path
            );
            record.recording_timestamp = Some(modified_ms);
        }

        record.display_name = display_name;
        record.tags = tags;

        Self::write(path, &record)?;
        Ok(record)
    }
}

/// File last-modified time as epoch millis.
pub fn file_mtime_millis(path: &Path) -> Result<i64, std::io::Error> {
    let modified = std::fs::metadata(path)?.modified()?;
    let since_epoch = modified
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    Ok(since_epoch.as_millis() as i64)
}
