//! Statistical imputation methods.
//!
//! Provides mode substitution for categorical columns and the per-column
//! median/mean substitution used as the numeric fallback.

use crate::config::NumericFallback;
use crate::error::{CleaningError, Result, ResultExt};
use crate::types::ModeFill;
use crate::utils::{
    bool_mode, fill_bool_nulls, fill_numeric_nulls, fill_string_nulls, mean, median,
    observed_f64_values, string_mode,
};
use polars::prelude::*;
use tracing::debug;

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill the nulls of one categorical column with its mode.
    ///
    /// The mode is the most frequent observed value; ties go to the
    /// smallest value (lexicographic on the text form, `false` before
    /// `true` for booleans). The column keeps its dtype. Returns None when
    /// the column had nothing to fill.
    ///
    /// # Errors
    ///
    /// [`CleaningError::UndefinedMode`] when the column has no observed value.
    pub fn apply_mode_imputation(df: &mut DataFrame, col_name: &str) -> Result<Option<ModeFill>> {
        let series = df
            .column(col_name)
            .context(format!("Categorical column '{}'", col_name))?
            .as_materialized_series()
            .clone();
        let null_count = series.null_count();

        if !series.is_empty() && null_count == series.len() {
            return Err(CleaningError::UndefinedMode(col_name.to_string()));
        }
        if null_count == 0 {
            return Ok(None);
        }

        let (filled, mode_text) = match series.dtype() {
            DataType::Boolean => {
                let mode = bool_mode(&series)?
                    .ok_or_else(|| CleaningError::UndefinedMode(col_name.to_string()))?;
                (fill_bool_nulls(&series, mode)?, mode.to_string())
            }
            DataType::String => {
                let mode = string_mode(&series)
                    .ok_or_else(|| CleaningError::UndefinedMode(col_name.to_string()))?;
                (fill_string_nulls(&series, &mode)?, mode)
            }
            other => {
                let mode = string_mode(&series)
                    .ok_or_else(|| CleaningError::UndefinedMode(col_name.to_string()))?;
                let filled = fill_string_nulls(&series, &mode)?.cast(other)?;
                (filled, mode)
            }
        };

        df.replace(col_name, filled)?;
        debug!(
            "Filled {} missing values in '{}' with mode '{}'",
            null_count, col_name, mode_text
        );

        Ok(Some(ModeFill {
            column: col_name.to_string(),
            value: mode_text,
            filled: null_count,
        }))
    }

    /// Fill every listed categorical column with its mode.
    pub fn impute_categorical(df: &mut DataFrame, columns: &[String]) -> Result<Vec<ModeFill>> {
        let mut fills = Vec::new();
        for col_name in columns {
            if let Some(fill) = Self::apply_mode_imputation(df, col_name)? {
                fills.push(fill);
            }
        }
        Ok(fills)
    }

    /// Apply median imputation for a numeric column.
    pub fn apply_numeric_median(df: &mut DataFrame, col_name: &str) -> Result<Option<f64>> {
        Self::apply_numeric_statistic(df, col_name, median)
    }

    /// Apply mean imputation for a numeric column.
    pub fn apply_numeric_mean(df: &mut DataFrame, col_name: &str) -> Result<Option<f64>> {
        Self::apply_numeric_statistic(df, col_name, mean)
    }

    /// Apply the configured numeric fallback to every listed column.
    ///
    /// The statistic is taken over finite observed values only. Returns the
    /// columns that were filled; a column without any finite observed value
    /// keeps its nulls. `NumericFallback::None` fills nothing.
    pub fn apply_numeric_fallback(
        df: &mut DataFrame,
        columns: &[String],
        strategy: NumericFallback,
    ) -> Result<Vec<String>> {
        let mut filled = Vec::new();
        for col_name in columns {
            let value = match strategy {
                NumericFallback::None => return Ok(filled),
                NumericFallback::Median => Self::apply_numeric_median(df, col_name)?,
                NumericFallback::Mean => Self::apply_numeric_mean(df, col_name)?,
            };
            if value.is_some() {
                filled.push(col_name.clone());
            }
        }
        Ok(filled)
    }

    fn apply_numeric_statistic(
        df: &mut DataFrame,
        col_name: &str,
        statistic: fn(&[f64]) -> Option<f64>,
    ) -> Result<Option<f64>> {
        let series = df
            .column(col_name)
            .context(format!("Numeric column '{}'", col_name))?
            .as_materialized_series()
            .clone();
        if series.null_count() == 0 {
            return Ok(None);
        }

        let observed: Vec<f64> = observed_f64_values(&series)?
            .into_iter()
            .filter(|v| v.is_finite())
            .collect();
        let Some(fill_value) = statistic(&observed) else {
            debug!("No finite observed value in '{}', leaving it unfilled", col_name);
            return Ok(None);
        };

        let filled = fill_numeric_nulls(&series, fill_value)?;
        df.replace(col_name, filled)?;
        debug!("Filled '{}' with {:.2}", col_name, fill_value);

        Ok(Some(fill_value))
    }
}
