//! Session control endpoints.
//!
//! Provides HTTP endpoints for:
//! - Starting a recording session (POST /session/start)
//! - Stopping a recording session (POST /session/stop)
//! - Resetting a finished session (POST /session/reset)
//! - Getting session status (GET /session/status)

use crate::session::{SessionPhase, SessionStatusHandle};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{error, info};

/// Commands the API forwards to the main loop, which owns the controller.
#[derive(Debug, Clone, Copy)]
pub enum AppCommand {
    StartSession,
    StopSession,
    ResetSession,
}

/// Shared state for session routes.
#[derive(Clone)]
pub struct SessionApiState {
    pub tx: mpsc::Sender<AppCommand>,
    pub status: SessionStatusHandle,
}

pub fn router(state: SessionApiState) -> Router {
    Router::new()
        .route("/session/start", post(start_session))
        .route("/session/stop", post(stop_session))
        .route("/session/reset", post(reset_session))
        .route("/session/status", get(session_status))
        .with_state(state)
}

async fn start_session(State(state): State<SessionApiState>) -> Result<Json<Value>, StatusCode> {
    info!("Session start command received via API");

    match state.tx.send(AppCommand::StartSession).await {
        Ok(_) => {
            // Small delay to allow the status to be updated
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

            let status = state.status.get().await;
            Ok(Json(json!({
                "success": status.phase == SessionPhase::Recording,
                "phase": status.phase.as_str(),
                "last_error": status.last_error,
            })))
        }
        Err(e) => {
            error!("Failed to send session start command: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn stop_session(State(state): State<SessionApiState>) -> Result<Json<Value>, StatusCode> {
    info!("Session stop command received via API");

    match state.tx.send(AppCommand::StopSession).await {
        Ok(_) => {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

            let status = state.status.get().await;
            Ok(Json(json!({
                "success": true,
                "phase": status.phase.as_str(),
                "audio_path": status.audio_path.as_ref().map(|p| p.to_string_lossy().to_string()),
                "last_error": status.last_error,
            })))
        }
        Err(e) => {
            error!("Failed to send session stop command: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn reset_session(State(state): State<SessionApiState>) -> Result<Json<Value>, StatusCode> {
    info!("Session reset command received via API");

    match state.tx.send(AppCommand::ResetSession).await {
        Ok(_) => {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

            let status = state.status.get().await;
            Ok(Json(json!({
                "success": status.phase == SessionPhase::Idle,
                "phase": status.phase.as_str(),
            })))
        }
        Err(e) => {
            error!("Failed to send session reset command: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn session_status(State(state): State<SessionApiState>) -> Json<Value> {
    let status = state.status.get().await;

    Json(json!({
        "recording": status.phase == SessionPhase::Recording,
        "phase": status.phase.as_str(),
        "duration_seconds": status.duration_seconds(),
        "audio_path": status.audio_path.as_ref().map(|p| p.to_string_lossy().to_string()),
        "last_error": status.last_error,
    }))
}
