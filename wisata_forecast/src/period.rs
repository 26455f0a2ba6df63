//! Calendar month keys for monthly series

use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A calendar month, written `YYYY-MM`
///
/// Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Create a month, validating that `month` is in `1..=12`
    pub fn new(year: i32, month: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self::from_date)
            .ok_or_else(|| {
                ForecastError::Validation(format!("Invalid month {}-{:02}", year, month))
            })
    }

    /// Month containing `date`
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parse a strict `YYYY-MM` string
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || {
            ForecastError::Validation(format!(
                "Invalid period '{}'. Use the format YYYY-MM",
                input
            ))
        };

        let bytes = input.as_bytes();
        let shape_ok = bytes.len() == 7
            && bytes[4] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 4 || b.is_ascii_digit());
        if !shape_ok {
            return Err(invalid());
        }

        let date = NaiveDate::parse_from_str(&format!("{}-01", input), "%Y-%m-%d")
            .map_err(|_| invalid())?;
        Ok(Self::from_date(date))
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// The month `n` months later
    pub fn add_months(&self, n: u32) -> Self {
        let zero_based = self.year as i64 * 12 + (self.month as i64 - 1) + n as i64;
        Self {
            year: zero_based.div_euclid(12) as i32,
            month: zero_based.rem_euclid(12) as u32 + 1,
        }
    }

    /// The following month
    pub fn succ(&self) -> Self {
        self.add_months(1)
    }

    /// `count` consecutive months starting right after `self`
    pub fn following(&self, count: u32) -> Vec<Self> {
        (1..=count).map(|i| self.add_months(i)).collect()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s.trim())
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
