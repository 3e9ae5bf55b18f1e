//! Speech-to-text collaborator
//!
//! The core only ever sees the resulting text.

use crate::config::TranscriptionConfig;
use crate::error::LedgerError;
use crate::Result;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};

const HF_INFERENCE_URL: &str = "https://router.huggingface.co/hf-inference/models";

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>, content_type: &str) -> Result<String>;
}

/// Hugging Face inference API (Whisper by default)
pub struct HuggingFaceTranscriber {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl HuggingFaceTranscriber {
    pub fn new(api_key: String, model: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(LedgerError::ConfigError("HUGGINGFACE_API_KEY not configured".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/{}", HF_INFERENCE_URL, model.trim_matches('/')),
        })
    }

    /// `Ok(None)` when no key is configured
    pub fn from_config(config: &TranscriptionConfig) -> Result<Option<Self>> {
        config
            .api_key
            .clone()
            .map(|key| Self::new(key, &config.model))
            .transpose()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Text { text: String },
    Error { error: String },
}

#[async_trait]
impl Transcriber for HuggingFaceTranscriber {
    async fn transcribe(&self, audio: Vec<u8>, content_type: &str) -> Result<String> {
        if audio.is_empty() {
            return Err(LedgerError::TranscriptionError("empty audio payload".to_string()));
        }

        info!(bytes = audio.len(), content_type, "Sending audio for transcription");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, content_type)
            .body(audio)
            .send()
            .await
            .map_err(|e| {
                error!("Transcription request failed: {}", e);
                LedgerError::TranscriptionError(format!("request failed: {}", e))
            })?;

        let status = response.status();
        let body = response.text().await?;
        parse_response(status.is_success(), &body).map_err(|e| {
            error!(%status, "Transcription failed: {}", e);
            e
        })
    }
}

fn parse_response(ok_status: bool, body: &str) -> Result<String> {
    match serde_json::from_str::<InferenceResponse>(body) {
        Ok(InferenceResponse::Text { text }) if ok_status => {
            let text = text.trim().to_string();
            if text.is_empty() {
                Err(LedgerError::TranscriptionError("no speech recognized".to_string()))
            } else {
                Ok(text)
            }
        }
        Ok(InferenceResponse::Error { error }) => Err(LedgerError::TranscriptionError(error)),
        _ => Err(LedgerError::TranscriptionError(format!(
            "unexpected response: {}",
            body.chars().take(200).collect::<String>()
        ))),
    }
}

/// MIME type sent with an audio file, by extension
pub fn content_type_for_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("webm") => "audio/webm",
        _ => "application/octet-stream",
    }
}
