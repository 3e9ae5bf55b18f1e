//! OpenAI-compatible `/chat/completions` backend
//!
//! Serves Groq, OpenAI and a local Ollama server; they differ only in base
//! URL, default model and whether a bearer token is sent.

use super::{GroundingFacts, TextGenerator, GROUNDED_SYSTEM_PROMPT, SAMPLING_TEMPERATURE};
use crate::config::{GenerationConfig, LlmBackend};
use crate::error::LedgerError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const MAX_TOKENS: u32 = 512;

pub struct ChatCompletionsGenerator {
    client: Client,
    name: &'static str,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl ChatCompletionsGenerator {
    pub fn from_config(config: &GenerationConfig) -> crate::Result<Self> {
        let (name, default_base, default_model, needs_key) = match config.backend {
            LlmBackend::Groq => ("groq", "https://api.groq.com/openai/v1", "llama-3.1-8b-instant", true),
            LlmBackend::OpenAi => ("openai", "https://api.openai.com/v1", "gpt-4o-mini", true),
            LlmBackend::Ollama => ("ollama", "http://localhost:11434/v1", "llama3.1", false),
            other => {
                return Err(LedgerError::ConfigError(format!(
                    "{:?} is not a chat-completions backend",
                    other
                )))
            }
        };

        if needs_key && config.api_key.is_none() {
            return Err(LedgerError::ConfigError(format!("{} backend needs an API key", name)));
        }

        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        let base_url = config.base_url.as_deref().unwrap_or(default_base);

        Ok(Self {
            client,
            name,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone().unwrap_or_else(|| default_model.to_string()),
        })
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: GROUNDED_SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: SAMPLING_TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionsGenerator {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn generate(&self, prompt: &str, _facts: &GroundingFacts) -> crate::Result<String> {
        let mut request = self.client.post(&self.endpoint).json(&self.build_request(prompt));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        info!(backend = self.name, model = %self.model, "Calling chat completions API");

        let response = request.send().await.map_err(|e| {
            error!(backend = self.name, "Chat completions request failed: {}", e);
            LedgerError::GenerationUnavailable(format!("{} API error: {}", self.name, e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(backend = self.name, %status, "Chat completions error response: {}", error_text);
            return Err(LedgerError::GenerationUnavailable(format!(
                "{} API returned {}",
                self.name, status
            )));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            LedgerError::GenerationUnavailable(format!("{} parse error: {}", self.name, e))
        })?;

        first_choice(body)
    }
}

fn first_choice(body: ChatResponse) -> crate::Result<String> {
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| LedgerError::GenerationUnavailable("no choices in response".to_string()))
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(backend: LlmBackend, api_key: Option<&str>, base_url: Option<&str>) -> GenerationConfig {
        GenerationConfig {
            backend,
            api_key: api_key.map(str::to_string),
            model: None,
            base_url: base_url.map(str::to_string),
            timeout: Duration::from_secs(15),
        }
    }

    #[test]
    fn test_backend_defaults() {
        let groq = ChatCompletionsGenerator::from_config(&config(LlmBackend::Groq, Some("k"), None)).unwrap();
        assert_eq!(groq.name(), "groq");
        assert_eq!(groq.endpoint, "https://api.groq.com/openai/v1/chat/completions");

        let ollama = ChatCompletionsGenerator::from_config(&config(
            LlmBackend::Ollama,
            None,
            Some("http://gpu-box:11434/v1/"),
        ))
        .unwrap();
        assert_eq!(ollama.endpoint, "http://gpu-box:11434/v1/chat/completions");
        assert_eq!(ollama.model, "llama3.1");
    }

    #[test]
    fn test_hosted_backends_need_key() {
        assert!(ChatCompletionsGenerator::from_config(&config(LlmBackend::OpenAi, None, None)).is_err());
        assert!(ChatCompletionsGenerator::from_config(&config(LlmBackend::Template, None, None)).is_err());
    }

    #[test]
    fn test_request_serialization() {
        let generator = ChatCompletionsGenerator::from_config(&config(LlmBackend::OpenAi, Some("k"), None)).unwrap();
        let json = serde_json::to_value(generator.build_request("Totals?")).unwrap();

        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Totals?");
        assert_eq!(json["max_tokens"], 512);
    }

    #[test]
    fn test_response_parsing() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":"Net: 5.00"}}]}"#)
                .unwrap();
        assert_eq!(first_choice(body).unwrap(), "Net: 5.00");

        let body: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(first_choice(body).is_err());
    }
}
