//! Voice ledger facade
//!
//! STATEMENT → EXTRACT → APPEND
//! QUESTION → SNAPSHOT → INTENT → REPORT → RENDER

use crate::config::AppConfig;
use crate::error::LedgerError;
use crate::extractor::RecordExtractor;
use crate::generation::build_generator;
use crate::models::{FinancialRecord, RecordType};
use crate::query::{answer_query, QueryAnswer};
use crate::render::ResponseRenderer;
use crate::store::{AppendOutcome, CsvRecordStore, RecordStore};
use crate::transcription::{HuggingFaceTranscriber, Transcriber};
use crate::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Source of "today" for relative dates
pub type Clock = fn() -> NaiveDate;

fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// A statement turned into a stored (or deduplicated) record
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProcessedStatement {
    pub transcript: String,
    pub record: FinancialRecord,
    pub outcome: AppendOutcome,
}

pub struct VoiceLedger {
    store: Arc<dyn RecordStore>,
    renderer: ResponseRenderer,
    transcriber: Option<Arc<dyn Transcriber>>,
    clock: Clock,
}

impl VoiceLedger {
    pub fn new(store: Arc<dyn RecordStore>, renderer: ResponseRenderer) -> Self {
        Self {
            store,
            renderer,
            transcriber: None,
            clock: local_today,
        }
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// CSV store, configured generator and, if keyed, the transcriber
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store = Arc::new(CsvRecordStore::new(
            config.store.csv_path.clone(),
            config.store.check_duplicates,
        ));

        let renderer = match build_generator(&config.generation)? {
            Some(generator) => ResponseRenderer::with_generator(generator, config.generation.timeout),
            None => ResponseRenderer::template_only(),
        };

        let mut ledger = Self::new(store, renderer);
        if let Some(transcriber) = HuggingFaceTranscriber::from_config(&config.transcription)? {
            ledger = ledger.with_transcriber(Arc::new(transcriber));
        }

        info!(
            csv_path = %config.store.csv_path.display(),
            backend = ?config.generation.backend,
            transcription = ledger.transcriber.is_some(),
            "Voice ledger initialized"
        );
        Ok(ledger)
    }

    pub fn can_transcribe(&self) -> bool {
        self.transcriber.is_some()
    }

    /// Extract a record from a transcribed statement and store it
    pub async fn process_transcription(&self, text: &str) -> Result<ProcessedStatement> {
        let transcript = text.trim();
        let record = RecordExtractor::extract(transcript, (self.clock)())?;
        let outcome = self.store.append(&record).await?;

        info!(
            record_type = ?record.record_type(),
            amount = %record.amount(),
            date = %record.date(),
            ?outcome,
            "Statement processed"
        );

        Ok(ProcessedStatement {
            transcript: transcript.to_string(),
            record,
            outcome,
        })
    }

    pub async fn process_audio(&self, audio: Vec<u8>, content_type: &str) -> Result<ProcessedStatement> {
        let transcriber = self.transcriber.as_ref().ok_or_else(|| {
            LedgerError::TranscriptionError("no transcription backend configured".to_string())
        })?;

        let text = transcriber.transcribe(audio, content_type).await?;
        info!(transcript = %text, "Audio transcribed");
        self.process_transcription(&text).await
    }

    /// Answer over a fresh snapshot of the store
    pub async fn answer_query(&self, question: &str) -> Result<QueryAnswer> {
        let snapshot = self.store.read_all().await?;
        if !snapshot.skipped.is_empty() {
            warn!(skipped = snapshot.skipped.len(), "Some stored records could not be read");
        }

        Ok(answer_query(question, &snapshot.records, &self.renderer).await)
    }

    pub async fn records(&self) -> Result<Vec<FinancialRecord>> {
        Ok(self.store.read_all().await?.records)
    }

    pub async fn records_of_type(&self, record_type: RecordType) -> Result<Vec<FinancialRecord>> {
        Ok(self
            .records()
            .await?
            .into_iter()
            .filter(|r| r.record_type() == record_type)
            .collect())
    }
}
