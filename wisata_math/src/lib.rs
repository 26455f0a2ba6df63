//! # Wisata Math
//!
//! Numerical building blocks for fitting ARIMA models and diagnosing their
//! residuals. This crate holds no domain types; it works on plain `f64`
//! slices and is used by `wisata_forecast`.

use thiserror::Error;

// Kernel modules
pub mod correlation;
pub mod differencing;
pub mod optimize;
pub mod transform;

pub use correlation::{Correlogram, PacfMethod};
pub use optimize::{NelderMeadConfig, NelderMeadResult};

/// Errors that can occur in numerical calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numerical operations
pub type Result<T> = std::result::Result<T, MathError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_context() {
        let err = MathError::InsufficientData("need 3 points".to_string());
        assert_eq!(
            err.to_string(),
            "Insufficient data for calculation: need 3 points"
        );
    }
}
