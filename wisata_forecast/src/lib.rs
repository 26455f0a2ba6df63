//! # Wisata Forecast
//!
//! Forecasting engine for a monthly visitor-count series (`Jumlah`).
//!
//! ## Features
//!
//! - Ordered, unique-keyed dataset store persisted as a `Date,Jumlah` CSV
//! - ARIMA(p,d,q) fitting by conditional sum of squares
//! - Point forecasts with monthly periods and normal prediction intervals
//! - Accuracy metrics (MAPE, MAE, MSE, RMSE) with an explicit zero-actual policy
//! - SVG diagnostics: forecast overlay, residual ACF and PACF
//!
//! ## Quick Start
//!
//! ```no_run
//! use wisata_forecast::data::DatasetStore;
//! use wisata_forecast::forecast::forecast;
//! use wisata_forecast::models::{arima, ModelOrder};
//!
//! let store = DatasetStore::open("uploads/wisatawan.csv");
//! store.add("2023-04", "1.200")?;
//!
//! let series = store.load_required()?;
//! let model = arima::fit_series(&series, ModelOrder::new(1, 1, 2))?;
//! let next = forecast(&model, 6)?;
//! for point in next.points() {
//!     println!("{:?}: {:.0}", point.period, point.value);
//! }
//! # Ok::<(), wisata_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod forecast;
pub mod metrics;
pub mod models;
pub mod period;
pub mod pipeline;
pub mod plots;
pub mod upload;
pub mod utils;

// Re-export commonly used types
pub use crate::config::EngineConfig;
pub use crate::data::{CsvRepository, DatasetStore, MemoryRepository, Record, Series, SeriesRepository};
pub use crate::error::{ErrorKind, ForecastError};
pub use crate::forecast::{forecast_with_intervals, Forecast, ForecastPoint, Interval};
pub use crate::metrics::{evaluate, evaluate_with_policy, Metrics, ZeroActualPolicy};
pub use crate::models::arima::{ArimaModel, FittedArima};
pub use crate::models::{FittedModel, ForecastModel, ModelOrder};
pub use crate::period::YearMonth;
pub use crate::pipeline::{ForecastPipeline, ForecastReport};
pub use crate::plots::{
    render_autocorrelation, render_forecast_plot, render_partial_autocorrelation, ImageArtifact,
};
pub use crate::upload::UploadedTable;
pub use wisata_math::PacfMethod;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
