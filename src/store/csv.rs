//! Flat-file record store
//!
//! Schema `type,amount,date,details`; amounts written with two decimals,
//! dates as `YYYY-MM-DD`. Unreadable rows are reported, never fatal.

use super::{AppendOutcome, RecordStore, SkippedRow, StoreSnapshot};
use crate::error::LedgerError;
use crate::models::{FinancialRecord, RecordType};
use crate::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const HEADER: [&str; 4] = ["type", "amount", "date", "details"];

pub struct CsvRecordStore {
    path: PathBuf,
    check_duplicates: bool,
    // Serializes file access within this process
    lock: Arc<Mutex<()>>,
}

impl CsvRecordStore {
    pub fn new(path: impl Into<PathBuf>, check_duplicates: bool) -> Self {
        Self {
            path: path.into(),
            check_duplicates,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn blocking<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(PathBuf) -> Result<T> + Send + 'static,
    {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || job(path))
            .await
            .map_err(|e| LedgerError::StoreError(format!("store task failed: {}", e)))?
    }
}

#[async_trait::async_trait]
impl RecordStore for CsvRecordStore {
    async fn append(&self, record: &FinancialRecord) -> Result<AppendOutcome> {
        let record = record.clone();
        let check_duplicates = self.check_duplicates;
        let outcome = self
            .blocking(move |path| append_row(&path, &record, check_duplicates))
            .await?;

        info!(path = %self.path.display(), ?outcome, "Record append finished");
        Ok(outcome)
    }

    async fn read_all(&self) -> Result<StoreSnapshot> {
        self.blocking(|path| read_rows(&path)).await
    }
}

fn append_row(path: &Path, record: &FinancialRecord, check_duplicates: bool) -> Result<AppendOutcome> {
    ensure_header(path)?;

    let fields = record.storage_fields();
    if check_duplicates {
        let existing = read_rows(path)?;
        if existing.records.iter().any(|r| r.storage_fields() == fields) {
            debug!(?fields, "Duplicate record not written");
            return Ok(AppendOutcome::Duplicate);
        }
    }

    let file = OpenOptions::new().append(true).open(path)?;
    let mut writer = ::csv::WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record(&fields)?;
    writer.flush()?;

    Ok(AppendOutcome::Saved)
}

/// Create the file with a header, or repair one whose first row is not
/// the header. Also makes sure the file ends in a newline before appending.
fn ensure_header(path: &Path) -> Result<()> {
    let header_line = format!("{}\n", HEADER.join(","));

    let existing = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    if existing.trim().is_empty() {
        fs::write(path, &header_line)?;
        info!(path = %path.display(), "Created record file");
        return Ok(());
    }

    let first_line = existing.lines().next().unwrap_or_default();
    if !is_header(first_line) {
        warn!(path = %path.display(), "Header missing, re-inserting it");
        let mut repaired = header_line;
        repaired.push_str(&existing);
        if !repaired.ends_with('\n') {
            repaired.push('\n');
        }
        fs::write(path, repaired)?;
        return Ok(());
    }

    if !existing.ends_with('\n') {
        let mut file = OpenOptions::new().append(true).open(path)?;
        file.write_all(b"\n")?;
    }
    Ok(())
}

fn is_header(line: &str) -> bool {
    let cells: Vec<String> = line.split(',').map(|c| c.trim().to_lowercase()).collect();
    cells.len() >= 3 && cells.iter().zip(HEADER.iter()).all(|(c, h)| c == h)
}

fn read_rows(path: &Path) -> Result<StoreSnapshot> {
    let mut content = String::new();
    match fs::File::open(path) {
        Ok(mut file) => {
            file.read_to_string(&mut content)?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StoreSnapshot::default()),
        Err(e) => return Err(e.into()),
    }

    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut snapshot = StoreSnapshot::default();
    let mut first = true;

    for (index, row) in reader.records().enumerate() {
        let line = row
            .as_ref()
            .ok()
            .and_then(|r| r.position())
            .map_or(index + 1, |p| p.line() as usize);

        let parsed = row
            .map_err(|e| e.to_string())
            .and_then(|row| {
                let is_first = std::mem::replace(&mut first, false);
                if is_first && is_header(&row.iter().collect::<Vec<_>>().join(",")) {
                    return Ok(None);
                }
                parse_row(&row).map(Some)
            });

        match parsed {
            Ok(Some(record)) => snapshot.records.push(record),
            Ok(None) => {}
            Err(reason) => {
                warn!(path = %path.display(), line, %reason, "Skipping malformed stored record");
                snapshot.skipped.push(SkippedRow { line, reason });
            }
        }
    }

    debug!(
        path = %path.display(),
        records = snapshot.records.len(),
        skipped = snapshot.skipped.len(),
        "Read record file"
    );
    Ok(snapshot)
}

fn parse_row(row: &::csv::StringRecord) -> std::result::Result<FinancialRecord, String> {
    if row.len() < 3 {
        return Err(format!("expected at least 3 fields, found {}", row.len()));
    }

    let record_type = RecordType::from_str(&row[0]).map_err(|e| e.to_string())?;
    let amount = Decimal::from_str(row[1].trim())
        .map_err(|_| format!("invalid amount '{}'", &row[1]))?;
    let date = NaiveDate::parse_from_str(row[2].trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}'", &row[2]))?;
    let details = row.get(3).unwrap_or_default().to_string();

    FinancialRecord::new(record_type, amount, date, details).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn record(kind: RecordType, amount: Decimal, details: &str) -> FinancialRecord {
        FinancialRecord::new(kind, amount, NaiveDate::from_ymd_opt(2024, 12, 15).unwrap(), details).unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_through_flat_schema() {
        let dir = tempdir().unwrap();
        let store = CsvRecordStore::new(dir.path().join("records.csv"), false);

        store.append(&record(RecordType::Loss, dec!(75), "for office supplies")).await.unwrap();
        store.append(&record(RecordType::Profit, dec!(3.14159), "bonus, paid early")).await.unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            content,
            "type,amount,date,details\n\
             loss,75.00,2024-12-15,for office supplies\n\
             profit,3.14,2024-12-15,\"bonus, paid early\"\n"
        );

        let snapshot = store.read_all().await.unwrap();
        assert_eq!(snapshot.records.len(), 2);
        assert_eq!(snapshot.records[0].amount(), dec!(75.00));
        assert_eq!(snapshot.records[1].amount(), dec!(3.14));
        assert_eq!(snapshot.records[1].details(), "bonus, paid early");
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = CsvRecordStore::new(dir.path().join("absent.csv"), true);
        assert_eq!(store.read_all().await.unwrap(), StoreSnapshot::default());
    }

    #[tokio::test]
    async fn test_malformed_rows_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.csv");
        fs::write(
            &path,
            "type,amount,date,details\n\
             profit,10.00,2024-01-01,ok\n\
             bonus,5.00,2024-01-02,bad type\n\
             loss,abc,2024-01-03,bad amount\n\
             loss,5.00,2024-02-30,bad date\n\
             loss,-5.00,2024-01-04,negative\n\
             loss,7.50,2024-01-05\n",
        )
        .unwrap();

        let snapshot = CsvRecordStore::new(&path, false).read_all().await.unwrap();
        assert_eq!(snapshot.records.len(), 2);
        assert_eq!(snapshot.records[1].details(), "");
        let lines: Vec<usize> = snapshot.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![3, 4, 5, 6]);
        assert!(snapshot.skipped[0].reason.contains("bonus"));
    }

    #[tokio::test]
    async fn test_header_repaired() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.csv");
        fs::write(&path, "profit,10.00,2024-01-01,first").unwrap();

        let store = CsvRecordStore::new(&path, false);
        // headerless rows are still readable
        assert_eq!(store.read_all().await.unwrap().records.len(), 1);

        store.append(&record(RecordType::Loss, dec!(1), "second")).await.unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("type,amount,date,details\nprofit,10.00,2024-01-01,first\n"));
        assert_eq!(store.read_all().await.unwrap().records.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicates_suppressed_when_enabled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.csv");
        let fuel = record(RecordType::Loss, dec!(40), "fuel");

        let store = CsvRecordStore::new(&path, true);
        assert_eq!(store.append(&fuel).await.unwrap(), AppendOutcome::Saved);
        assert_eq!(store.append(&fuel).await.unwrap(), AppendOutcome::Duplicate);
        // same two-decimal amount counts as the same row
        let fuel_precise = record(RecordType::Loss, dec!(40.001), "fuel");
        assert_eq!(store.append(&fuel_precise).await.unwrap(), AppendOutcome::Duplicate);
        assert_eq!(store.read_all().await.unwrap().records.len(), 1);

        let store = CsvRecordStore::new(&path, false);
        assert_eq!(store.append(&fuel).await.unwrap(), AppendOutcome::Saved);
        assert_eq!(store.read_all().await.unwrap().records.len(), 2);
    }
}
