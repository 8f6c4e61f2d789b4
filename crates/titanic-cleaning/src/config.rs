//! Configuration types for the cleaning pipeline.
//!
//! This module provides configuration options using the builder pattern.
//! Defaults reproduce the original cleaning run: seed 0, ten imputation
//! rounds, a 100-tree forest, and no automatic numeric fallback.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default name of the bundled sample dataset.
pub const DEFAULT_DATASET: &str = "titanic";

/// Default path of the cleaned CSV.
pub const DEFAULT_OUTPUT_PATH: &str = "titanic_cleaned.csv";

/// What to do with numeric nulls when iterative imputation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NumericFallback {
    /// Log the failure and recommendation, leave the nulls in place
    #[default]
    None,
    /// Fill each numeric column with the median of its observed values
    Median,
    /// Fill each numeric column with the mean of its observed values
    Mean,
}

/// Configuration for the cleaning pipeline.
///
/// Use [`CleaningConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use titanic_cleaning::config::{CleaningConfig, NumericFallback};
///
/// let config = CleaningConfig::builder()
///     .random_seed(7)
///     .numeric_fallback(NumericFallback::Median)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Name of the sample dataset to load.
    /// Default: "titanic"
    pub dataset: String,

    /// Directory where named datasets are looked up and cached.
    /// Default: "data"
    pub data_home: PathBuf,

    /// Where the cleaned CSV is written (overwritten on each run).
    /// Default: "titanic_cleaned.csv"
    pub output_path: PathBuf,

    /// Seed for the forest's bootstrap sampling.
    /// Default: 0
    pub random_seed: u64,

    /// Maximum number of imputation rounds.
    /// Default: 10
    pub max_iter: usize,

    /// Convergence tolerance on the scaled change between rounds.
    /// Default: 1e-3
    pub tolerance: f64,

    /// Number of trees in each forest.
    /// Default: 100
    pub n_estimators: usize,

    /// Maximum tree depth, unbounded when None.
    /// Default: None
    pub max_depth: Option<usize>,

    /// Minimum number of samples in a leaf.
    /// Default: 1
    pub min_samples_leaf: usize,

    /// Substitution applied when iterative imputation fails.
    /// Default: None
    pub numeric_fallback: NumericFallback,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            dataset: DEFAULT_DATASET.to_string(),
            data_home: PathBuf::from("data"),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            random_seed: 0,
            max_iter: 10,
            tolerance: 1e-3,
            n_estimators: 100,
            max_depth: None,
            min_samples_leaf: 1,
            numeric_fallback: NumericFallback::default(),
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.max_iter == 0 {
            return Err(ConfigValidationError::ZeroValue("max_iter"));
        }

        if self.n_estimators == 0 {
            return Err(ConfigValidationError::ZeroValue("n_estimators"));
        }

        if self.min_samples_leaf == 0 {
            return Err(ConfigValidationError::ZeroValue("min_samples_leaf"));
        }

        if self.max_depth == Some(0) {
            return Err(ConfigValidationError::ZeroValue("max_depth"));
        }

        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ConfigValidationError::InvalidTolerance(self.tolerance));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{0}': must be at least 1")]
    ZeroValue(&'static str),

    #[error("Invalid tolerance: {0} (must be a finite, non-negative number)")]
    InvalidTolerance(f64),
}

impl From<ConfigValidationError> for crate::error::CleaningError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::CleaningError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    dataset: Option<String>,
    data_home: Option<PathBuf>,
    output_path: Option<PathBuf>,
    random_seed: Option<u64>,
    max_iter: Option<usize>,
    tolerance: Option<f64>,
    n_estimators: Option<usize>,
    max_depth: Option<usize>,
    min_samples_leaf: Option<usize>,
    numeric_fallback: Option<NumericFallback>,
}

impl CleaningConfigBuilder {
    /// Set the name of the sample dataset.
    pub fn dataset(mut self, name: impl Into<String>) -> Self {
        self.dataset = Some(name.into());
        self
    }

    /// Set the directory where named datasets are looked up.
    pub fn data_home(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_home = Some(path.into());
        self
    }

    /// Set the path of the cleaned CSV.
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Set the random seed.
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Set the maximum number of imputation rounds.
    pub fn max_iter(mut self, rounds: usize) -> Self {
        self.max_iter = Some(rounds);
        self
    }

    /// Set the convergence tolerance.
    pub fn tolerance(mut self, tol: f64) -> Self {
        self.tolerance = Some(tol);
        self
    }

    /// Set the number of trees per forest.
    pub fn n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = Some(n);
        self
    }

    /// Bound the depth of every tree.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set the minimum leaf size.
    pub fn min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = Some(n);
        self
    }

    /// Set the substitution applied when iterative imputation fails.
    pub fn numeric_fallback(mut self, fallback: NumericFallback) -> Self {
        self.numeric_fallback = Some(fallback);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleaningConfig` or an error if validation fails.
    pub fn build(self) -> Result<CleaningConfig, ConfigValidationError> {
        let defaults = CleaningConfig::default();
        let config = CleaningConfig {
            dataset: self.dataset.unwrap_or(defaults.dataset),
            data_home: self.data_home.unwrap_or(defaults.data_home),
            output_path: self.output_path.unwrap_or(defaults.output_path),
            random_seed: self.random_seed.unwrap_or(defaults.random_seed),
            max_iter: self.max_iter.unwrap_or(defaults.max_iter),
            tolerance: self.tolerance.unwrap_or(defaults.tolerance),
            n_estimators: self.n_estimators.unwrap_or(defaults.n_estimators),
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf.unwrap_or(defaults.min_samples_leaf),
            numeric_fallback: self.numeric_fallback.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}
