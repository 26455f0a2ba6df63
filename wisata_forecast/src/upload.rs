//! Column extraction for uploaded tables

use crate::error::{ForecastError, Result};
use crate::period::YearMonth;
use crate::utils::is_allowed_file;
use polars::prelude::{CsvReader, DataFrame, DataType, SerReader};
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;

/// Name of the required count column
pub const VALUE_COLUMN: &str = "Jumlah";
/// Name of the optional month column
pub const DATE_COLUMN: &str = "Date";

/// Counts taken from an uploaded table
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedTable {
    values: Vec<f64>,
    /// Last month of the `Date` column, when every cell is a valid `YYYY-MM`
    last_period: Option<YearMonth>,
}

impl UploadedTable {
    /// Load a `.csv` upload from disk
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if !is_allowed_file(name) {
            return Err(ForecastError::Validation(format!(
                "File '{}' is not a CSV upload",
                path.display()
            )));
        }
        Self::parse(fs::read(path)?)
    }

    /// Parse CSV content already in memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::parse(bytes.to_vec())
    }

    /// Parse CSV content with a header row
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;
        Self::parse(content)
    }

    fn parse(content: Vec<u8>) -> Result<Self> {
        let df = CsvReader::new(Cursor::new(content))
            .infer_schema(None)
            .has_header(true)
            .finish()?;
        Self::from_dataframe(&df)
    }

    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let names = df.get_column_names();
        if !names.iter().any(|n| *n == VALUE_COLUMN) {
            return Err(ForecastError::MissingColumn(format!(
                "Uploaded table has no '{}' column (found: {})",
                VALUE_COLUMN,
                names.join(", ")
            )));
        }

        let counts = df.column(VALUE_COLUMN)?.cast(&DataType::Float64)?;
        let values = counts
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                Some(v) if v.is_finite() => Ok(v),
                _ => Err(ForecastError::Validation(format!(
                    "Column '{}' has a missing or non-numeric value in data row {}",
                    VALUE_COLUMN,
                    row + 1
                ))),
            })
            .collect::<Result<Vec<f64>>>()?;

        let last_period = if names.iter().any(|n| *n == DATE_COLUMN) {
            Self::last_month(df)?
        } else {
            None
        };

        debug!(rows = values.len(), dated = last_period.is_some(), "upload parsed");
        Ok(Self {
            values,
            last_period,
        })
    }

    /// Last month of the `Date` column, or `None` if any cell is not `YYYY-MM`
    fn last_month(df: &DataFrame) -> Result<Option<YearMonth>> {
        let dates = df.column(DATE_COLUMN)?.cast(&DataType::Utf8)?;
        let parsed: Option<Vec<YearMonth>> = dates
            .utf8()?
            .into_iter()
            .map(|cell| cell.and_then(|raw| raw.trim().parse().ok()))
            .collect();
        Ok(parsed.and_then(|months| months.last().copied()))
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn last_period(&self) -> Option<YearMonth> {
        self.last_period
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_counts_and_last_month() {
        let table =
            UploadedTable::from_bytes(b"Date,Jumlah\n2023-01,100\n2023-02,110\n2023-03,105\n")
                .unwrap();
        assert_eq!(table.values(), &[100.0, 110.0, 105.0]);
        assert_eq!(table.last_period(), Some(YearMonth::new(2023, 3).unwrap()));
    }

    #[test]
    fn missing_count_column_is_reported() {
        let err = UploadedTable::from_bytes(b"Date,Visitors\n2023-01,100\n").unwrap_err();
        assert!(matches!(err, ForecastError::MissingColumn(_)));
    }

    #[test]
    fn undated_table_is_positional() {
        let table = UploadedTable::from_bytes(b"Jumlah\n5\n6\n7\n").unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.last_period(), None);
    }

    #[test]
    fn unparseable_dates_drop_anchoring() {
        let table =
            UploadedTable::from_bytes(b"Date,Jumlah\n2023-01,1\nJanuary,2\n2023-03,3\n").unwrap();
        assert_eq!(table.last_period(), None);
    }
}
