//! Runtime configuration
//!
//! Read from environment variables (after `.env` is loaded by the binaries).
//! Everything goes through a lookup function so tests never touch the process
//! environment.

use crate::error::LedgerError;
use crate::Result;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CSV_PATH: &str = "financial_records.csv";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "openai/whisper-large-v3";
pub const DEFAULT_PORT: u16 = 8000;
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    /// No generator, deterministic text only
    Template,
    Gemini,
    Groq,
    OpenAi,
    Ollama,
}

impl FromStr for LlmBackend {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "template" | "none" => Ok(LlmBackend::Template),
            "gemini" => Ok(LlmBackend::Gemini),
            "groq" => Ok(LlmBackend::Groq),
            "openai" => Ok(LlmBackend::OpenAi),
            "ollama" => Ok(LlmBackend::Ollama),
            other => Err(LedgerError::ConfigError(format!("unknown LLM_BACKEND '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub csv_path: PathBuf,
    pub check_duplicates: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    pub backend: LlmBackend,
    pub api_key: Option<String>,
    /// Backend default when unset
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionConfig {
    /// Transcription is disabled without a key
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub generation: GenerationConfig,
    pub transcription: TranscriptionConfig,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let store = StoreConfig {
            csv_path: get("LEDGER_CSV_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CSV_PATH)),
            check_duplicates: match get("LEDGER_CHECK_DUPLICATES") {
                Some(raw) => parse_bool("LEDGER_CHECK_DUPLICATES", &raw)?,
                None => true,
            },
        };

        let gemini_key = get("GEMINI_API_KEY");
        let groq_key = get("GROQ_API_KEY");
        let openai_key = get("OPENAI_API_KEY");

        let backend = match get("LLM_BACKEND") {
            Some(raw) => raw.parse()?,
            None if gemini_key.is_some() => LlmBackend::Gemini,
            None if groq_key.is_some() => LlmBackend::Groq,
            None if openai_key.is_some() => LlmBackend::OpenAi,
            None => LlmBackend::Template,
        };

        let api_key = match backend {
            LlmBackend::Gemini => gemini_key,
            LlmBackend::Groq => groq_key,
            LlmBackend::OpenAi => openai_key,
            LlmBackend::Ollama | LlmBackend::Template => None,
        };

        let timeout_secs = match get("LLM_TIMEOUT_SECS") {
            Some(raw) => parse_number::<u64>("LLM_TIMEOUT_SECS", &raw)?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let generation = GenerationConfig {
            backend,
            api_key,
            model: get("LLM_MODEL"),
            base_url: get("LLM_BASE_URL"),
            timeout: Duration::from_secs(timeout_secs),
        };

        let transcription = TranscriptionConfig {
            api_key: get("HUGGINGFACE_API_KEY"),
            model: get("TRANSCRIPTION_MODEL").unwrap_or_else(|| DEFAULT_TRANSCRIPTION_MODEL.to_string()),
        };

        let port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => parse_number::<u16>("PORT", &raw)?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            store,
            generation,
            transcription,
            port,
        })
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(LedgerError::ConfigError(format!("{} must be a boolean, got '{}'", key, raw))),
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| LedgerError::ConfigError(format!("{} must be a number, got '{}'", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.store.csv_path, PathBuf::from("financial_records.csv"));
        assert!(cfg.store.check_duplicates);
        assert_eq!(cfg.generation.backend, LlmBackend::Template);
        assert_eq!(cfg.generation.timeout, Duration::from_secs(15));
        assert_eq!(cfg.transcription.model, "openai/whisper-large-v3");
        assert!(cfg.transcription.api_key.is_none());
        assert_eq!(cfg.port, 8000);
    }

    #[test]
    fn test_backend_inferred_from_key() {
        let cfg = config(&[("GROQ_API_KEY", "gsk_test")]).unwrap();
        assert_eq!(cfg.generation.backend, LlmBackend::Groq);
        assert_eq!(cfg.generation.api_key.as_deref(), Some("gsk_test"));

        // explicit backend wins, blank keys are ignored
        let cfg = config(&[("LLM_BACKEND", "ollama"), ("GEMINI_API_KEY", "  ")]).unwrap();
        assert_eq!(cfg.generation.backend, LlmBackend::Ollama);
        assert!(cfg.generation.api_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("LEDGER_CSV_PATH", "/tmp/ledger.csv"),
            ("LEDGER_CHECK_DUPLICATES", "no"),
            ("LLM_TIMEOUT_SECS", "3"),
            ("API_PORT", "9000"),
        ])
        .unwrap();
        assert_eq!(cfg.store.csv_path, PathBuf::from("/tmp/ledger.csv"));
        assert!(!cfg.store.check_duplicates);
        assert_eq!(cfg.generation.timeout, Duration::from_secs(3));
        assert_eq!(cfg.port, 9000);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(config(&[("PORT", "eighty")]), Err(LedgerError::ConfigError(_))));
        assert!(matches!(config(&[("LEDGER_CHECK_DUPLICATES", "maybe")]), Err(LedgerError::ConfigError(_))));
        assert!(matches!(config(&[("LLM_BACKEND", "mystery")]), Err(LedgerError::ConfigError(_))));
    }
}
