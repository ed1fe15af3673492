#![allow(clippy::arc_with_non_send_sync)]

use crate::api::{ApiServer, AppCommand};
use crate::capture::MicCaptureDevice;
use crate::companion::{self, ServiceCompanion};
use crate::config::{Config, CredentialHandle};
use crate::library::RecordingsLibrary;
use crate::openai::OpenAiSpeechService;
use crate::session::{
    AcceptDefaultPrompt, SessionController, SessionEvent, SessionStatusHandle, StopOutcome,
};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub async fn run_service() -> Result<()> {
    info!("Starting Recap service");

    let config = Config::load()?;
    let recordings_dir = config.recordings_dir()?;

    let (tx, rx) = mpsc::channel::<AppCommand>(10);
    let (stop_tx, stop_rx) = companion::stop_channel();

    // One live credential view: the controller checks it on start, the
    // speech client reads it per request, the credential routes update it.
    let credentials = CredentialHandle::new(config.openai.api_key.clone());

    let capture = MicCaptureDevice::new(config.recording.input_device.as_deref())?;
    let speech = Arc::new(OpenAiSpeechService::new(
        credentials.clone(),
        &config.openai,
    ));
    let library = Arc::new(RecordingsLibrary::new(recordings_dir.clone()));

    // The capture device is not Send, so the controller lives on this task
    // and everything else reaches it through the command channel.
    let status_handle = SessionStatusHandle::default();
    let mut controller = SessionController::new(
        Box::new(capture),
        speech,
        Arc::new(ServiceCompanion::new(stop_tx)),
        Arc::new(AcceptDefaultPrompt),
        status_handle.clone(),
        recordings_dir,
        credentials.clone(),
    );

    spawn_library_refresher(&controller, Arc::clone(&library));

    let api_server = ApiServer::new(
        tx,
        status_handle,
        Arc::clone(&library),
        credentials,
        &config,
    );
    tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            error!("API server failed: {}", e);
        }
    });

    info!("Recap is ready!");
    info!(
        "Start a session with: curl -X POST http://127.0.0.1:{}/session/start",
        config.api.port
    );

    command_loop(&mut controller, rx, stop_rx).await;

    Ok(())
}

/// Drive the controller from the API command channel and the companion
/// display's stop channel until the command channel closes. A stop from
/// the companion goes through exactly the same path as one from the API.
pub async fn command_loop(
    controller: &mut SessionController,
    mut rx: mpsc::Receiver<AppCommand>,
    mut stop_rx: mpsc::Receiver<()>,
) {
    loop {
        tokio::select! {
            command = rx.recv() => {
                let Some(command) = command else { break };
                handle_command(controller, command).await;
            }
            Some(()) = stop_rx.recv() => {
                info!("Stop requested from companion display");
                handle_command(controller, AppCommand::StopSession).await;
            }
        }
    }
}

async fn handle_command(controller: &mut SessionController, command: AppCommand) {
    match command {
        AppCommand::StartSession => match controller.start().await {
            Ok(()) => info!("Recording session started"),
            Err(e) => error!("Failed to start session: {}", e),
        },
        AppCommand::StopSession => match controller.stop().await {
            Ok(StopOutcome::Stopping { audio_path }) => {
                info!("Session stopping, audio at {:?}", audio_path);
            }
            Ok(StopOutcome::SaveCancelled) => info!("Save cancelled, session discarded"),
            Ok(StopOutcome::Ignored) => warn!("No active session to stop"),
            Err(e) => error!("Failed to stop session: {}", e),
        },
        AppCommand::ResetSession => match controller.reset().await {
            Ok(()) => info!("Session reset"),
            Err(e) => error!("Failed to reset session: {}", e),
        },
    }
}

/// Keep the recordings listing current: re-scan whenever a session saves
/// audio or finishes processing, so subscribers see new entries promptly.
fn spawn_library_refresher(controller: &SessionController, library: Arc<RecordingsLibrary>) {
    let mut events = controller.events().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::AudioSaved { .. } | SessionEvent::Completed(_) => {
                    let library = Arc::clone(&library);
                    let _ = tokio::task::spawn_blocking(move || library.refresh()).await;
                }
                _ => {}
            }
        }
    });
}
