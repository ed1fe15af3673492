//! REST API server for Recap.
//!
//! Provides HTTP endpoints for:
//! - Session control (start, stop, reset, status)
//! - Recordings listing and metadata editing
//! - Credential management

pub mod error;
pub mod routes;

use crate::config::{Config, CredentialHandle};
use crate::library::RecordingsLibrary;
use crate::session::SessionStatusHandle;
use anyhow::Result;
use axum::{
    error_handling::HandleErrorLayer, http::StatusCode, response::Json, routing::get, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::{BoxError, ServiceBuilder};
use tracing::info;

pub use routes::credential::CredentialApiState;
pub use routes::recordings::RecordingsApiState;
pub use routes::session::{AppCommand, SessionApiState};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ApiServer {
    port: u16,
    session_state: SessionApiState,
    recordings_state: RecordingsApiState,
    credential_state: CredentialApiState,
}

impl ApiServer {
    pub fn new(
        tx: tokio::sync::mpsc::Sender<AppCommand>,
        status: SessionStatusHandle,
        library: Arc<RecordingsLibrary>,
        credentials: CredentialHandle,
        config: &Config,
    ) -> Self {
        Self {
            port: config.api.port,
            session_state: SessionApiState { tx, status },
            recordings_state: RecordingsApiState { library },
            credential_state: CredentialApiState { credentials },
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = Router::new()
            .route("/", get(status))
            .route("/version", get(version))
            .merge(routes::session::router(self.session_state))
            .merge(routes::recordings::router(self.recordings_state))
            .merge(routes::credential::router(self.credential_state))
            .layer(
                ServiceBuilder::new()
                    .layer(HandleErrorLayer::new(handle_middleware_error))
                    .timeout(REQUEST_TIMEOUT),
            );

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("API server listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  GET    /                - Service info");
        info!("  GET    /version         - Version info");
        info!("  POST   /session/start   - Start a recording session");
        info!("  POST   /session/stop    - Stop the active session");
        info!("  POST   /session/reset   - Reset a finished session");
        info!("  GET    /session/status  - Session status");
        info!("  GET    /recordings      - List recordings");
        info!("  PATCH  /recordings      - Edit recording name/tags");
        info!("  GET    /credential      - Credential status (masked)");
        info!("  PUT    /credential      - Set API credential");
        info!("  DELETE /credential      - Clear API credential");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn handle_middleware_error(err: BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "request timed out".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("internal error: {err}"),
        )
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "recap",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "recap"
    }))
}
