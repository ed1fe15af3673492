//! Recordings listing and metadata editing endpoints.
//!
//! Provides HTTP endpoints for:
//! - Listing recordings, most recent first (GET /recordings)
//! - Editing a recording's name and tags (PATCH /recordings)

use crate::api::error::{ApiError, ApiResult};
use crate::library::{RecordingEntry, RecordingsLibrary};
use crate::store::MetadataStore;
use axum::{
    extract::State,
    response::Json,
    routing::{get, patch},
    Router,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct RecordingsApiState {
    pub library: Arc<RecordingsLibrary>,
}

/// Request body for metadata edits. The sidecar path identifies the
/// recording; omitted fields keep their current value.
#[derive(Debug, serde::Deserialize)]
pub struct EditRequest {
    pub sidecar_path: PathBuf,
    pub display_name: Option<String>,
    pub tags: Option<Vec<String>>,
}

pub fn router(state: RecordingsApiState) -> Router {
    Router::new()
        .route("/recordings", get(list_recordings))
        .route("/recordings", patch(edit_recording))
        .with_state(state)
}

async fn list_recordings(
    State(state): State<RecordingsApiState>,
) -> ApiResult<Json<Vec<RecordingEntry>>> {
    let library = Arc::clone(&state.library);
    let entries = tokio::task::spawn_blocking(move || library.list())
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(entries))
}

async fn edit_recording(
    State(state): State<RecordingsApiState>,
    Json(req): Json<EditRequest>,
) -> ApiResult<Json<Value>> {
    info!("Metadata edit received via API for {:?}", req.sidecar_path);

    let library = Arc::clone(&state.library);
    let record = tokio::task::spawn_blocking(move || {
        let current = MetadataStore::read(&req.sidecar_path)?;
        let display_name = req.display_name.unwrap_or(current.display_name);
        let tags = req.tags.unwrap_or(current.tags);
        let record = MetadataStore::update(&req.sidecar_path, display_name, tags)?;
        library.refresh();
        Ok::<_, crate::store::StoreError>(record)
    })
    .await
    .map_err(|e| ApiError::internal(e.to_string()))??;

    Ok(Json(json!({
        "success": true,
        "record": record,
    })))
}
