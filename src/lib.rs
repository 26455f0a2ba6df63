//! # Wisata
//!
//! Facade over the workspace crates:
//!
//! - [`math`]: differencing, correlograms, simplex minimisation
//! - [`forecast`]: dataset store, ARIMA fitting, forecasts, metrics and plots
//!
//! ```
//! use wisata_workspace::forecast::{evaluate, YearMonth};
//!
//! let month = YearMonth::parse("2023-04").unwrap();
//! assert_eq!(month.succ().to_string(), "2023-05");
//!
//! let metrics = evaluate(&[100.0, 110.0], &[100.0, 110.0]).unwrap();
//! assert_eq!(metrics.mae, 0.0);
//! ```

pub use wisata_forecast as forecast;
pub use wisata_math as math;
