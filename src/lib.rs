//! Voice Ledger
//!
//! A voice-to-data bookkeeping assistant that:
//! - Turns spoken or typed statements into profit/loss records
//! - Parses amounts, dates and transaction type deterministically
//! - Stores records in a flat CSV file
//! - Answers questions with exact decimal reports
//! - Only lets an LLM phrase answers it can ground in the report
//!
//! STATEMENT: TRANSCRIBE → EXTRACT → APPEND
//! QUESTION:  INTENT → REPORT → RENDER → GROUNDING CHECK → (TEMPLATE FALLBACK)

pub mod api;
pub mod assistant;
pub mod classifier;
pub mod config;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod models;
pub mod parsing;
pub mod query;
pub mod render;
pub mod store;
pub mod transcription;

pub use error::{ExtractionFailure, LedgerError, Result};

// Re-export common types
pub use assistant::{ProcessedStatement, VoiceLedger};
pub use classifier::TypeClassifier;
pub use extractor::{extract, RecordExtractor};
pub use models::*;
pub use query::{answer_query, QueryAnswer, QueryIntentParser, ReportEngine, StructuredReport};
pub use render::{RenderSource, ResponseRenderer};
