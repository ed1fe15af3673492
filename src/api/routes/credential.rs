//! Credential management endpoints.
//!
//! The API key itself never leaves the process: responses only carry a
//! masked form and a configured/not-configured flag. Changes are persisted
//! to the config file and pushed into the live credential handle, so the
//! running session loop and speech client see them immediately.

use crate::api::error::{ApiError, ApiResult};
use crate::config::{self, CredentialHandle};
use axum::{
    extract::State,
    response::Json,
    routing::{delete, get, put},
    Router,
};
use serde_json::{json, Value};
use tracing::info;

#[derive(Clone)]
pub struct CredentialApiState {
    pub credentials: CredentialHandle,
}

#[derive(Debug, serde::Deserialize)]
pub struct SetCredentialRequest {
    pub api_key: String,
}

pub fn router(state: CredentialApiState) -> Router {
    Router::new()
        .route("/credential", get(get_credential))
        .route("/credential", put(set_credential))
        .route("/credential", delete(clear_credential))
        .with_state(state)
}

async fn get_credential(State(state): State<CredentialApiState>) -> ApiResult<Json<Value>> {
    let key = state.credentials.get().await;
    Ok(Json(json!({
        "configured": state.credentials.is_configured().await,
        "api_key": config::mask_secret(&key),
    })))
}

async fn set_credential(
    State(state): State<CredentialApiState>,
    Json(req): Json<SetCredentialRequest>,
) -> ApiResult<Json<Value>> {
    if req.api_key.trim().is_empty() {
        return Err(ApiError::bad_request("api_key must not be empty"));
    }

    let key = req.api_key.trim().to_string();
    config::set_api_key(&key).map_err(ApiError::from)?;
    state.credentials.set(Some(key)).await;
    info!("API credential updated via API");

    Ok(Json(json!({ "success": true })))
}

async fn clear_credential(State(state): State<CredentialApiState>) -> ApiResult<Json<Value>> {
    config::clear_api_key().map_err(ApiError::from)?;
    state.credentials.set(None).await;
    info!("API credential cleared via API");

    Ok(Json(json!({ "success": true })))
}
