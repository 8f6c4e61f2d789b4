//! Structural cleaning applied before imputation.
//!
//! Columns where every value is missing carry nothing for the imputers to
//! learn from, so they are removed up front and never reach the output.

use crate::error::Result;
use polars::prelude::*;
use tracing::{debug, info};

/// Data cleaner for structural cleaning operations.
#[derive(Debug)]
pub struct DataCleaner;

impl DataCleaner {
    /// Remove every column whose values are all missing.
    ///
    /// Returns the remaining table (column order preserved) and the names
    /// of the dropped columns. On a table with no rows every column counts
    /// as fully missing.
    pub fn drop_empty_columns(&self, df: DataFrame) -> Result<(DataFrame, Vec<String>)> {
        let height = df.height();
        let empty_cols: Vec<String> = df
            .get_columns()
            .iter()
            .filter(|col| col.null_count() == height)
            .map(|col| col.name().to_string())
            .collect();

        if empty_cols.is_empty() {
            debug!("No fully-empty columns found");
            return Ok((df, empty_cols));
        }

        let cols_ref: Vec<PlSmallStr> = empty_cols.iter().map(|s| s.as_str().into()).collect();
        let df = df.drop_many(cols_ref);

        info!(
            "Removed {} fully-empty columns: {:?}",
            empty_cols.len(),
            empty_cols
        );

        Ok((df, empty_cols))
    }
}
