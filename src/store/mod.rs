//! Record persistence layer
//!
//! The core never holds a live handle: every question works on a snapshot
//! returned by `read_all`.

pub mod csv;

pub use self::csv::CsvRecordStore;

use crate::models::FinancialRecord;
use crate::Result;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppendOutcome {
    Saved,
    /// Identical record already stored; nothing written
    Duplicate,
}

/// A stored row that could not be read back
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SkippedRow {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    /// Append order
    pub records: Vec<FinancialRecord>,
    pub skipped: Vec<SkippedRow>,
}

/// Trait for record persistence
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn append(&self, record: &FinancialRecord) -> Result<AppendOutcome>;
    async fn read_all(&self) -> Result<StoreSnapshot>;
}

/// In-memory record store for development and tests
pub struct InMemoryRecordStore {
    records: Arc<RwLock<Vec<FinancialRecord>>>,
    check_duplicates: bool,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
            check_duplicates: false,
        }
    }

    pub fn with_duplicate_check(mut self, enabled: bool) -> Self {
        self.check_duplicates = enabled;
        self
    }

    pub fn seeded(records: Vec<FinancialRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
            check_duplicates: false,
        }
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn append(&self, record: &FinancialRecord) -> Result<AppendOutcome> {
        let mut records = self.records.write().await;

        if self.check_duplicates {
            let key = record.storage_fields();
            if records.iter().any(|r| r.storage_fields() == key) {
                return Ok(AppendOutcome::Duplicate);
            }
        }

        records.push(record.clone());
        Ok(AppendOutcome::Saved)
    }

    async fn read_all(&self) -> Result<StoreSnapshot> {
        let records = self.records.read().await;
        Ok(StoreSnapshot {
            records: records.clone(),
            skipped: Vec::new(),
        })
    }
}
