//! Utility functions for the wisata_forecast crate

use crate::error::{ForecastError, Result};
use std::path::Path;

/// File extensions accepted for uploaded tables
pub const ALLOWED_EXTENSIONS: &[&str] = &["csv"];

/// Parse a visitor count typed by a person, e.g. `1.200` or `12,500`.
///
/// Dots and commas are treated as grouping separators and removed before
/// parsing, so `1.200` is one thousand two hundred.
pub fn parse_count(raw: &str) -> Result<u64> {
    let digits: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '.' && *c != ',')
        .collect();

    digits.parse::<u64>().map_err(|_| {
        ForecastError::Validation(format!(
            "Visitor count '{}' must be a valid whole number",
            raw.trim()
        ))
    })
}

/// Whether an uploaded file name has an accepted extension
pub fn is_allowed_file(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Population mean and variance of a slice
pub fn mean_variance(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance))
}

/// Reject NaN and infinite values with a message naming `what`
pub fn ensure_finite(values: &[f64], what: &str) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(ForecastError::Validation(format!(
            "{} contains a non-finite value at index {}",
            what, i
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.200", 1200)]
    #[case("12,500", 12500)]
    #[case(" 1.234.567 ", 1234567)]
    #[case("42", 42)]
    #[case("0", 0)]
    fn parses_grouped_counts(#[case] raw: &str, #[case] expected: u64) {
        assert_eq!(parse_count(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("-5")]
    #[case("1.2e3")]
    #[case(".,")]
    fn rejects_non_integer_counts(#[case] raw: &str) {
        assert!(matches!(parse_count(raw), Err(ForecastError::Validation(_))));
    }

    #[test]
    fn only_csv_uploads_are_allowed() {
        assert!(is_allowed_file("wisatawan.csv"));
        assert!(is_allowed_file("DATA.CSV"));
        assert!(!is_allowed_file("data.xlsx"));
        assert!(!is_allowed_file("csv"));
    }

    #[test]
    fn mean_variance_of_constant_is_zero() {
        let (mean, var) = mean_variance(&[5.0, 5.0, 5.0]).unwrap();
        assert_eq!(mean, 5.0);
        assert_eq!(var, 0.0);
        assert!(mean_variance(&[]).is_none());
    }

    #[test]
    fn ensure_finite_names_offending_index() {
        let err = ensure_finite(&[1.0, f64::NAN], "history").unwrap_err();
        assert!(err.to_string().contains("index 1"));
    }
}
