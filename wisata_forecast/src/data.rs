//! Dataset store for monthly visitor counts
//!
//! The store owns the canonical series of `(period, value)` records. Records
//! are kept strictly increasing by period with no duplicates, and every
//! mutation is validated and then persisted as a whole snapshot.
//!
//! Persistence goes through [`SeriesRepository`]. [`CsvRepository`] writes a
//! `Date,Jumlah` file by replacing it atomically, and [`MemoryRepository`]
//! keeps the snapshot in memory.

use crate::error::{ForecastError, Result};
use crate::period::YearMonth;
use crate::utils::parse_count;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// One observed month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Month the count belongs to (unique key)
    #[serde(rename = "Date")]
    pub period: YearMonth,
    /// Visitor count for the month
    #[serde(rename = "Jumlah")]
    pub value: u64,
}

impl Record {
    pub fn new(period: YearMonth, value: u64) -> Self {
        Self { period, value }
    }
}

/// Records sorted strictly ascending by period
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Series {
    records: Vec<Record>,
}

impl Series {
    /// An empty series
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from records in any order.
    ///
    /// Fails with a conflict if two records share a period.
    pub fn from_records(mut records: Vec<Record>) -> Result<Self> {
        records.sort_by_key(|r| r.period);
        if let Some(pair) = records.windows(2).find(|w| w[0].period == w[1].period) {
            return Err(ForecastError::Conflict {
                period: pair[0].period.to_string(),
            });
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Counts as floating point observations, in period order
    pub fn values(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.value as f64).collect()
    }

    pub fn periods(&self) -> Vec<YearMonth> {
        self.records.iter().map(|r| r.period).collect()
    }

    pub fn first_period(&self) -> Option<YearMonth> {
        self.records.first().map(|r| r.period)
    }

    pub fn last_period(&self) -> Option<YearMonth> {
        self.records.last().map(|r| r.period)
    }

    pub fn get(&self, period: YearMonth) -> Option<&Record> {
        self.records
            .binary_search_by_key(&period, |r| r.period)
            .ok()
            .map(|i| &self.records[i])
    }

    /// 1-based position of `period`, as used by [`DatasetStore::delete_at`]
    pub fn ordinal_of(&self, period: YearMonth) -> Option<usize> {
        self.records
            .binary_search_by_key(&period, |r| r.period)
            .ok()
            .map(|i| i + 1)
    }

    /// Insert a record at its chronological position
    pub fn insert(&mut self, record: Record) -> Result<()> {
        match self.records.binary_search_by_key(&record.period, |r| r.period) {
            Ok(_) => Err(ForecastError::Conflict {
                period: record.period.to_string(),
            }),
            Err(index) => {
                self.records.insert(index, record);
                Ok(())
            }
        }
    }

    /// Remove the record at a 1-based position
    pub fn remove_ordinal(&mut self, position: i64) -> Result<Record> {
        let len = self.records.len();
        if position < 1 || position as u64 > len as u64 {
            return Err(ForecastError::Range { position, len });
        }
        Ok(self.records.remove(position as usize - 1))
    }

    /// Confirm periods are strictly increasing
    pub fn check_invariant(&self) -> Result<()> {
        match self
            .records
            .windows(2)
            .find(|w| w[0].period >= w[1].period)
        {
            Some(pair) => Err(ForecastError::Invariant(format!(
                "period {} is followed by {}",
                pair[0].period, pair[1].period
            ))),
            None => Ok(()),
        }
    }
}

/// Storage backend for a series snapshot
pub trait SeriesRepository: Send + Sync {
    /// Read the current snapshot, or `None` if nothing was ever stored
    fn read(&self) -> Result<Option<Series>>;

    /// Replace the snapshot. Must leave the previous snapshot intact on failure.
    fn write(&self, series: &Series) -> Result<()>;

    /// Human-readable location for log messages
    fn describe(&self) -> String;
}

/// Series persisted as a `Date,Jumlah` CSV file
#[derive(Debug, Clone)]
pub struct CsvRepository {
    path: PathBuf,
}

impl CsvRepository {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SeriesRepository for CsvRepository {
    fn read(&self) -> Result<Option<Series>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let file = File::open(&self.path)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut records = Vec::new();
        for (i, row) in reader.deserialize::<Record>().enumerate() {
            let record = row.map_err(|e| {
                ForecastError::Validation(format!(
                    "Invalid row at line {} of {}: {}",
                    i + 2,
                    self.path.display(),
                    e
                ))
            })?;
            records.push(record);
        }

        Series::from_records(records).map(Some)
    }

    fn write(&self, series: &Series) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        // Write next to the target so the final rename stays on one filesystem
        let mut tmp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut tmp);
            writer
                .write_record(["Date", "Jumlah"])
                .map_err(write_failure)?;
            for record in series.records() {
                writer.serialize(record).map_err(write_failure)?;
            }
            writer.flush()?;
        }
        tmp.as_file_mut().flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| ForecastError::Io(e.error))?;

        debug!(path = %self.path.display(), records = series.len(), "dataset written");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A failed dataset write is a storage failure, never bad input
fn write_failure(err: csv::Error) -> ForecastError {
    match ForecastError::from(err) {
        ForecastError::Csv(msg) => ForecastError::Io(io::Error::new(io::ErrorKind::Other, msg)),
        other => other,
    }
}

/// Series held in memory; readers see whole snapshots only
#[derive(Debug, Default)]
pub struct MemoryRepository {
    snapshot: RwLock<Option<Series>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(series: Series) -> Self {
        Self {
            snapshot: RwLock::new(Some(series)),
        }
    }
}

impl SeriesRepository for MemoryRepository {
    fn read(&self) -> Result<Option<Series>> {
        let guard = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone())
    }

    fn write(&self, series: &Series) -> Result<()> {
        let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(series.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Owner of the canonical series
///
/// Mutations run read-modify-persist under a single writer lock. Reads do
/// not take the lock; they observe whichever snapshot the repository holds.
#[derive(Debug)]
pub struct DatasetStore<R = CsvRepository> {
    repository: R,
    write_lock: Mutex<()>,
}

impl DatasetStore<CsvRepository> {
    /// Store backed by a CSV file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::new(CsvRepository::new(path))
    }
}

impl<R: SeriesRepository> DatasetStore<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            write_lock: Mutex::new(()),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Current series; empty if nothing has been stored yet
    pub fn load(&self) -> Result<Series> {
        Ok(self.repository.read()?.unwrap_or_default())
    }

    /// Current series for operations that need existing data
    pub fn load_required(&self) -> Result<Series> {
        self.repository.read()?.ok_or_else(|| {
            ForecastError::NotFound(format!(
                "No dataset at {}",
                self.repository.describe()
            ))
        })
    }

    /// Add a record parsed from user input.
    ///
    /// `period` must be `YYYY-MM`; `raw_value` may contain `.` or `,`
    /// grouping separators.
    pub fn add(&self, period: &str, raw_value: &str) -> Result<Series> {
        let (period, raw_value) = (period.trim(), raw_value.trim());
        if period.is_empty() || raw_value.is_empty() {
            return Err(ForecastError::Validation(
                "Both period and value must be filled".to_string(),
            ));
        }
        let record = Record::new(YearMonth::parse(period)?, parse_count(raw_value)?);
        self.insert(record)
    }

    /// Add an already validated record
    pub fn insert(&self, record: Record) -> Result<Series> {
        let series = self.mutate(|series| series.insert(record))?;
        info!(period = %record.period, value = record.value, "record added");
        Ok(series)
    }

    /// Delete by 1-based position given as user input
    pub fn delete_at(&self, position: &str) -> Result<Series> {
        let position = position.trim().parse::<i64>().map_err(|_| {
            ForecastError::Validation(format!(
                "Position '{}' must be a whole number",
                position.trim()
            ))
        })?;
        self.delete_ordinal(position)
    }

    /// Delete by 1-based position into the current period-sorted series
    pub fn delete_ordinal(&self, position: i64) -> Result<Series> {
        let mut removed = None;
        let series = self.mutate(|series| {
            removed = Some(series.remove_ordinal(position)?);
            Ok(())
        })?;
        if let Some(record) = removed {
            info!(position, period = %record.period, "record deleted");
        }
        Ok(series)
    }

    fn mutate<F>(&self, change: F) -> Result<Series>
    where
        F: FnOnce(&mut Series) -> Result<()>,
    {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut series = self.load()?;
        change(&mut series)?;
        series.check_invariant()?;
        self.repository.write(&series)?;
        Ok(series)
    }
}
