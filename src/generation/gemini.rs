//! Gemini API backend
//!
//! Uses a long-lived reqwest::Client for connection pooling.

use super::{GroundingFacts, TextGenerator, GROUNDED_SYSTEM_PROMPT, SAMPLING_TEMPERATURE};
use crate::config::GenerationConfig;
use crate::error::LedgerError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiGenerator {
    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>) -> crate::Result<Self> {
        if api_key.trim().is_empty() {
            return Err(LedgerError::ConfigError("GEMINI_API_KEY not configured".to_string()));
        }

        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/{}:generateContent", base_url.trim_end_matches('/'), model),
        })
    }

    pub fn from_config(config: &GenerationConfig) -> crate::Result<Self> {
        Self::new(
            config.api_key.clone().unwrap_or_default(),
            config.model.clone(),
            config.base_url.clone(),
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, prompt: &str, _facts: &GroundingFacts) -> crate::Result<String> {
        let request = build_request(prompt);

        info!("Calling Gemini API");

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                LedgerError::GenerationUnavailable(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API error response: {}", error_text);
            return Err(LedgerError::GenerationUnavailable(format!(
                "Gemini API returned {}",
                status
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            LedgerError::GenerationUnavailable(format!("Gemini parse error: {}", e))
        })?;

        let answer = extract_text(gemini_response)?;
        info!(length = answer.len(), "Gemini response received");
        Ok(answer)
    }
}

fn build_request(prompt: &str) -> GeminiRequest {
    GeminiRequest {
        contents: vec![Content {
            parts: vec![Part { text: prompt.to_string() }],
        }],
        generation_config: SamplingConfig {
            temperature: SAMPLING_TEMPERATURE,
            top_p: 0.9,
            top_k: 40,
            max_output_tokens: 512,
        },
        system_instruction: SystemInstruction {
            parts: vec![Part { text: GROUNDED_SYSTEM_PROMPT.to_string() }],
        },
    }
}

fn extract_text(response: GeminiResponse) -> crate::Result<String> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text)
        .ok_or_else(|| LedgerError::GenerationUnavailable("Empty response from Gemini".to_string()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: SamplingConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SamplingConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let json = serde_json::to_value(build_request("How much did I earn?")).unwrap();

        assert_eq!(json["contents"][0]["parts"][0]["text"], "How much did I earn?");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 512);
        assert!(json["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Use ONLY the numbers"));
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Net was 5.00"}]},"finishReason":"STOP"}]}"#;
        let response: GeminiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(extract_text(response).unwrap(), "Net was 5.00");

        let empty: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(extract_text(empty).is_err());
    }

    #[test]
    fn test_missing_key_rejected() {
        assert!(GeminiGenerator::new(String::new(), None, None).is_err());

        let generator = GeminiGenerator::new("k".into(), Some("gemini-1.5-pro".into()), None).unwrap();
        assert!(generator.endpoint.ends_with("/models/gemini-1.5-pro:generateContent"));
    }
}
