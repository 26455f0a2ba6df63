//! Engine configuration

use crate::error::{ForecastError, Result};
use crate::metrics::ZeroActualPolicy;
use crate::models::ModelOrder;
use crate::plots::PlotConfig;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use wisata_math::NelderMeadConfig;

/// Environment variable overriding [`EngineConfig::dataset_path`]
pub const DATASET_ENV: &str = "WISATA_DATASET";
/// Environment variable overriding [`EngineConfig::zero_actual_policy`]
pub const ZERO_POLICY_ENV: &str = "WISATA_ZERO_POLICY";

/// Settings shared by the store, the fitter and the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Location of the `Date,Jumlah` dataset
    pub dataset_path: PathBuf,
    /// Order used for uploaded tables
    pub default_order: ModelOrder,
    /// MAPE behaviour for zero actuals
    pub zero_actual_policy: ZeroActualPolicy,
    /// Coverage of forecast intervals
    pub confidence_level: f64,
    /// Simplex settings for CSS estimation
    pub solver: NelderMeadConfig,
    pub plot: PlotConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("uploads/wisatawan.csv"),
            default_order: ModelOrder::default(),
            zero_actual_policy: ZeroActualPolicy::default(),
            confidence_level: 0.95,
            solver: NelderMeadConfig::default(),
            plot: PlotConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `WISATA_DATASET` and `WISATA_ZERO_POLICY` from the process environment
    pub fn with_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(DATASET_ENV).filter(|v| !v.trim().is_empty()) {
            self.dataset_path = PathBuf::from(path.trim());
        }
        if let Some(policy) = lookup(ZERO_POLICY_ENV) {
            self.zero_actual_policy = policy.parse()?;
        }
        Ok(self)
    }

    /// Reject settings no run could succeed with
    pub fn validate(&self) -> Result<()> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ForecastError::Validation(format!(
                "confidence_level must be between 0 and 1, got {}",
                self.confidence_level
            )));
        }
        if self.solver.max_iterations == 0 {
            return Err(ForecastError::Validation(
                "solver.max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.solver.tolerance >= 0.0) {
            return Err(ForecastError::Validation(
                "solver.tolerance must be a non-negative number".to_string(),
            ));
        }
        if self.plot.width == 0 || self.plot.height == 0 {
            return Err(ForecastError::Validation(format!(
                "plot size {}x{} must be non-zero",
                self.plot.width, self.plot.height
            )));
        }
        Ok(())
    }
}
