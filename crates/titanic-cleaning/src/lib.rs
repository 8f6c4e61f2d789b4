//! Titanic Cleaning Library
//!
//! Missing-value cleaning and exploratory reporting for the seaborn Titanic
//! passenger table, built on Polars.
//!
//! # Overview
//!
//! - **Loading**: the named `titanic` dataset (cached under a data home,
//!   downloaded on first use with the `remote` feature) or any CSV file
//! - **Structural Cleaning**: columns with no observed value are dropped
//! - **Numeric Imputation**: iterative imputation with a random-forest
//!   regressor per column, seeded for reproducibility
//! - **Categorical Imputation**: mode substitution with a deterministic
//!   smallest-value tie-break
//! - **Reporting**: describe-style summaries, IQR outliers, correlations and
//!   survival breakdowns of the cleaned table
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use titanic_cleaning::{CleaningConfig, NumericFallback, Pipeline};
//!
//! // Load the named dataset, clean it and write titanic_cleaned.csv
//! let result = Pipeline::builder().build()?.run()?;
//! println!("{:?}", result.report.numeric_outcome);
//!
//! // Clean an in-memory table, filling numeric gaps with the median if
//! // the iterative imputer fails
//! let config = CleaningConfig::builder()
//!     .numeric_fallback(NumericFallback::Median)
//!     .random_seed(42)
//!     .build()?;
//!
//! let result = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process(df)?;
//! ```
//!
//! # Failure Policy
//!
//! A failing iterative imputation does not abort the run. The pipeline
//! logs the error, applies [`NumericFallback`] and records the result in
//! [`ImputationOutcome`]. Load, write and undefined-mode errors are fatal.

pub mod cleaner;
pub mod config;
pub mod error;
pub mod imputers;
pub mod io;
pub mod pipeline;
pub mod reporting;
pub mod schema;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::DataCleaner;
pub use config::{CleaningConfig, CleaningConfigBuilder, ConfigValidationError, NumericFallback};
pub use error::{CleaningError, ResultExt};
pub use imputers::{
    ForestParams, IterativeImputation, IterativeImputer, RandomForestRegressor,
    StatisticalImputer,
};
pub use io::{DatasetSource, load_dataset, write_cleaned_csv};
pub use pipeline::{
    CleaningStage, ClosureProgressReporter, Pipeline, PipelineBuilder, ProgressReporter,
    ProgressUpdate,
};
pub use reporting::{EdaReport, ReportGenerator};
pub use schema::{ColumnSpec, TableSchema};
pub use types::{
    CleaningReport, CleaningResult, ColumnKind, ColumnPartition, ImputationOutcome, ModeFill,
};
pub use utils::{DtypeCategory, get_dtype_category, is_numeric_dtype};
