//! Remote transcription and summarization boundary.
//!
//! The controller only sees the `SpeechService` trait; the OpenAI-backed
//! implementation sends the saved artifact to the Whisper endpoint and the
//! transcript to the chat-completions endpoint.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, error, info};

use crate::config::{CredentialHandle, OpenAiConfig};

/// Fixed instruction for the summarization stage.
pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a helpful assistant that summarizes meeting \
    transcripts. Create a concise summary with key points, action items, and decisions made.";

#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Speech-to-text for a saved audio artifact.
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;

    /// Summarize a transcript under the given system instruction.
    async fn summarize(&self, transcript: &str, system_prompt: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

pub struct OpenAiSpeechService {
    client: reqwest::Client,
    credentials: CredentialHandle,
    base_url: String,
    transcription_model: String,
    chat_model: String,
}

impl OpenAiSpeechService {
    pub fn new(credentials: CredentialHandle, config: &OpenAiConfig) -> Self {
        let base_url = config
            .api_endpoint
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        info!("Initialized OpenAI speech service with base URL: {}", base_url);

        Self {
            client: reqwest::Client::new(),
            credentials,
            base_url,
            transcription_model: config.transcription_model.clone(),
            chat_model: config.chat_model.clone(),
        }
    }

    /// Read the credential as configured right now, so a key set or
    /// replaced while the service runs is picked up on the next request.
    async fn api_key(&self) -> Result<String> {
        self.credentials
            .get()
            .await
            .filter(|k| !k.trim().is_empty())
            .context("No API credential configured")
    }
}

#[async_trait]
impl SpeechService for OpenAiSpeechService {
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        let url = format!("{}/audio/transcriptions", self.base_url);
        info!("Transcribing audio file: {:?}", audio_path);

        let api_key = self.api_key().await?;

        let audio_data = tokio::fs::read(audio_path)
            .await
            .context("Failed to read audio file")?;

        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio")
            .to_string();

        let part = reqwest::multipart::Part::bytes(audio_data).file_name(file_name);
        let form = reqwest::multipart::Form::new()
            .text("model", self.transcription_model.clone())
            .part("file", part);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&api_key)
            .multipart(form)
            .send()
            .await
            .context("Failed to send transcription request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read transcription response body")?;

        if !status.is_success() {
            error!("Transcription request failed with status {}: {}", status, body);
            return Err(anyhow::anyhow!(
                "Transcription request failed with status {}: {}",
                status,
                body
            ));
        }

        let parsed: TranscriptionResponse =
            serde_json::from_str(&body).context("Failed to parse transcription response")?;

        info!("Transcription complete: {} chars", parsed.text.len());
        debug!("First 100 chars: {}", parsed.text.chars().take(100).collect::<String>());
        Ok(parsed.text)
    }

    async fn summarize(&self, transcript: &str, system_prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        info!("Requesting summary for transcript ({} chars)", transcript.len());

        let api_key = self.api_key().await?;

        let request_body = serde_json::json!({
            "model": self.chat_model,
            "messages": [
                { "role": "system", "content": system_prompt },
                {
                    "role": "user",
                    "content": format!(
                        "Here is the meeting transcript:\n\n{transcript}\n\nPlease provide a summary."
                    )
                }
            ]
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&api_key)
            .json(&request_body)
            .send()
            .await
            .context("Failed to send summarization request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read summarization response body")?;

        if !status.is_success() {
            error!("Summarization request failed with status {}: {}", status, body);
            return Err(anyhow::anyhow!(
                "Summarization request failed with status {}: {}",
                status,
                body
            ));
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).context("Failed to parse summarization response")?;

        let summary = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .context("Summarization response contained no choices")?;

        info!("Summary generated: {} chars", summary.len());
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_response_parsing() {
        let body = r#"{
            "choices": [
                { "message": { "role": "assistant", "content": "Key points: ..." } }
            ]
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "Key points: ...");
    }

    #[test]
    fn test_transcription_response_parsing() {
        let body = r#"{ "text": "hello from the meeting" }"#;
        let parsed: TranscriptionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.text, "hello from the meeting");
    }

    #[test]
    fn test_default_base_url() {
        let credentials = CredentialHandle::new(Some("sk-test".to_string()));
        let service = OpenAiSpeechService::new(credentials, &OpenAiConfig::default());
        assert_eq!(service.base_url, "https://api.openai.com/v1");
        assert_eq!(service.transcription_model, "whisper-1");
        assert_eq!(service.chat_model, "gpt-4");
    }

    #[tokio::test]
    async fn test_api_key_follows_live_credential() {
        let credentials = CredentialHandle::new(None);
        let service =
            OpenAiSpeechService::new(credentials.clone(), &OpenAiConfig::default());
        assert!(service.api_key().await.is_err());

        credentials.set(Some("sk-fresh".to_string())).await;
        assert_eq!(service.api_key().await.unwrap(), "sk-fresh");

        credentials.set(None).await;
        assert!(service.api_key().await.is_err());
    }
}
