//! Exploratory report over a cleaned dataset.
//!
//! [`ReportGenerator::build_eda_report`] computes the numbers behind the
//! usual Titanic EDA charts: missing values, numeric summaries, IQR
//! outliers, category counts, correlations and survival rates by
//! category, age group and sex/class.
//!
//! # Example
//!
//! ```rust,ignore
//! use titanic_cleaning::reporting::ReportGenerator;
//!
//! let report = ReportGenerator::build_eda_report(&cleaned_df)?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//!
//! let generator = ReportGenerator::new(PathBuf::from("output"));
//! generator.write_report_to_file(&report, "titanic_cleaned")?;
//! ```

mod generator;

pub use generator::{
    AGE_BINS, CategoryCounts, ColumnOverview, CorrelationMatrix, EdaReport, GroupSurvival,
    NumericSummary, OutlierCount, ReportGenerator, SurvivalBreakdown, ValueCount, age_group,
};
