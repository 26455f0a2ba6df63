//! Error types for the wisata_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;
use wisata_math::MathError;

/// Custom error types for the wisata_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Malformed input: period format, numeric parsing, non-positive horizon
    #[error("Validation error: {0}")]
    Validation(String),

    /// A record for this period already exists
    #[error("Conflict: a record for {period} already exists")]
    Conflict { period: String },

    /// Delete position outside `1..=len`
    #[error("Position {position} is out of range (dataset has {len} records)")]
    Range { position: i64, len: usize },

    /// Required dataset is missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Too few observations for the requested order or metric window
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The estimator failed to produce a usable model
    #[error("Fit error: {0}")]
    Fit(String),

    /// Uploaded table lacks a required column
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// MAPE over actual values that are zero
    #[error("Division by zero: {0}")]
    DivisionByZero(String),

    /// Numerical failure outside fitting
    #[error("Math error: {0}")]
    Math(String),

    /// Stored series broke its ordering invariant
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from CSV reading or writing
    #[error("CSV error: {0}")]
    Csv(String),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    Polars(String),

    /// Error from JSON (de)serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Coarse classification callers use to pick a message and status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Range,
    NotFound,
    InsufficientData,
    Fit,
    MissingColumn,
    DivisionByZero,
    Io,
    Internal,
}

impl ErrorKind {
    /// Process exit code used by the command line front end
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Internal => 1,
            ErrorKind::Validation => 2,
            ErrorKind::Conflict => 3,
            ErrorKind::Range => 4,
            ErrorKind::NotFound => 5,
            ErrorKind::InsufficientData => 6,
            ErrorKind::Fit => 7,
            ErrorKind::MissingColumn => 8,
            ErrorKind::DivisionByZero => 9,
            ErrorKind::Io => 10,
        }
    }

    /// HTTP status a web layer would answer with
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::Validation
            | ErrorKind::Conflict
            | ErrorKind::Range
            | ErrorKind::InsufficientData
            | ErrorKind::MissingColumn => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Fit | ErrorKind::DivisionByZero | ErrorKind::Io | ErrorKind::Internal => 500,
        }
    }
}

impl ForecastError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForecastError::Validation(_) => ErrorKind::Validation,
            ForecastError::Conflict { .. } => ErrorKind::Conflict,
            ForecastError::Range { .. } => ErrorKind::Range,
            ForecastError::NotFound(_) => ErrorKind::NotFound,
            ForecastError::InsufficientData(_) => ErrorKind::InsufficientData,
            ForecastError::Fit(_) => ErrorKind::Fit,
            ForecastError::MissingColumn(_) => ErrorKind::MissingColumn,
            ForecastError::DivisionByZero(_) => ErrorKind::DivisionByZero,
            ForecastError::Io(_) => ErrorKind::Io,
            ForecastError::Csv(_) | ForecastError::Polars(_) | ForecastError::Json(_) => {
                ErrorKind::Validation
            }
            ForecastError::Math(_) | ForecastError::Invariant(_) => ErrorKind::Internal,
        }
    }
}

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::Polars(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(io) => ForecastError::Io(io),
            _ => ForecastError::Csv(message),
        }
    }
}

impl From<MathError> for ForecastError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::InsufficientData(msg) => ForecastError::InsufficientData(msg),
            MathError::InvalidInput(msg) => ForecastError::Validation(msg),
            MathError::CalculationError(msg) => ForecastError::Math(msg),
        }
    }
}
