//! Error types for the voice ledger

use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Why a statement could not be turned into a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionFailureKind {
    NoAmountFound,
}

/// Extraction failure surfaced to the caller, echoing the statement back.
/// No partial record is ever produced alongside it.
#[derive(Error, Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[error("I couldn't find an amount in that statement: \"{text}\"")]
pub struct ExtractionFailure {
    pub kind: ExtractionFailureKind,
    pub text: String,
}

impl ExtractionFailure {
    pub fn no_amount(text: &str) -> Self {
        Self {
            kind: ExtractionFailureKind::NoAmountFound,
            text: text.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {

    // =============================
    // Core Errors
    // =============================

    #[error(transparent)]
    Extraction(#[from] ExtractionFailure),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Record store error: {0}")]
    StoreError(String),

    // Only raised and recovered inside the renderer
    #[error("Generation unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Generation ungrounded: {0}")]
    GenerationUngrounded(String),

    #[error("Transcription error: {0}")]
    TranscriptionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
