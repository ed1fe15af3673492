use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai: OpenAiConfig,
    pub recording: RecordingConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key for the OpenAI endpoints. Required before a session can start.
    pub api_key: Option<String>,
    /// Base URL override, mostly for testing against a local stub.
    pub api_endpoint: Option<String>,
    pub transcription_model: String,
    pub chat_model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_endpoint: None,
            transcription_model: "whisper-1".to_string(),
            chat_model: "gpt-4".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Where audio artifacts and sidecars live. Defaults to the music dir.
    pub recordings_dir: Option<PathBuf>,
    /// Input device name; default input device when unset.
    pub input_device: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3747 }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// The recordings directory, honoring the config override.
    pub fn recordings_dir(&self) -> Result<PathBuf> {
        match &self.recording.recordings_dir {
            Some(dir) => Ok(dir.clone()),
            None => global::recordings_dir(),
        }
    }

    /// True when a usable API credential is configured.
    pub fn has_credential(&self) -> bool {
        self.openai
            .api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

/// Persist a new API credential.
pub fn set_api_key(key: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.openai.api_key = Some(key.trim().to_string());
    config.save()?;
    info!("API credential saved");
    Ok(())
}

/// Live view of the API credential, shared between the session controller,
/// the speech client, and the credential routes. Updates through any clone
/// are visible to every holder immediately; no restart needed.
#[derive(Clone, Default)]
pub struct CredentialHandle {
    inner: Arc<RwLock<Option<String>>>,
}

impl CredentialHandle {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub async fn get(&self) -> Option<String> {
        self.inner.read().await.clone()
    }

    pub async fn set(&self, key: Option<String>) {
        *self.inner.write().await = key;
    }

    pub async fn is_configured(&self) -> bool {
        self.inner
            .read()
            .await
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Redacted form of a credential, safe for display and API responses.
/// Counts characters, not bytes, so non-ASCII keys never split mid-char.
pub fn mask_secret(value: &Option<String>) -> String {
    let Some(secret) = value.as_deref().filter(|s| !s.is_empty()) else {
        return "<not set>".to_string();
    };

    let count = secret.chars().count();
    if count > 8 {
        let prefix: String = secret.chars().take(4).collect();
        let suffix: String = secret.chars().skip(count - 2).collect();
        format!("{prefix}****{suffix}")
    } else {
        "*".repeat(count)
    }
}

/// Clear the stored API credential.
pub fn clear_api_key() -> Result<()> {
    let mut config = Config::load()?;
    config.openai.api_key = None;
    config.save()?;
    info!("API credential cleared");
    Ok(())
}
