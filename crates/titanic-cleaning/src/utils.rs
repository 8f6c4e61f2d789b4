//! Shared utilities for the cleaning pipeline and the report.
//!
//! This module contains common helper functions used across multiple modules
//! to reduce code duplication and ensure consistency.

use polars::prelude::*;
use std::collections::BTreeMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// Boolean type
    Boolean,
    /// String or categorical type
    String,
    /// Other/unknown types
    Other,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is boolean.
#[inline]
pub fn is_boolean_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Boolean)
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if is_boolean_dtype(dtype) {
        DtypeCategory::Boolean
    } else if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
        DtypeCategory::String
    } else {
        DtypeCategory::Other
    }
}

/// Total number of null cells in a DataFrame.
pub fn total_nulls(df: &DataFrame) -> usize {
    df.get_columns().iter().map(|col| col.null_count()).sum()
}

// =============================================================================
// Series Statistics Utilities
// =============================================================================

/// Read a Series as optional f64 values, failing on values that do not cast.
pub fn strict_f64_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let float_series = series.strict_cast(&DataType::Float64)?;
    Ok(float_series.f64()?.into_iter().collect())
}

/// Observed (non-null) values of a numeric Series as f64.
pub fn observed_f64_values(series: &Series) -> PolarsResult<Vec<f64>> {
    let float_series = series.cast(&DataType::Float64)?;
    Ok(float_series.f64()?.into_iter().flatten().collect())
}

/// Arithmetic mean of a slice, None when empty.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Quantile of an ascending-sorted slice with linear interpolation.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Median of an unsorted slice.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, 0.5)
}

/// Most frequent value of a Series, returned in its text form.
///
/// Ties resolve to the smallest value: numeric Series compare by value,
/// everything else lexicographically on the text form. Returns None when
/// the Series has no observed values.
pub fn string_mode(series: &Series) -> Option<String> {
    let non_null = series.drop_nulls();
    if non_null.is_empty() {
        return None;
    }
    if is_numeric_dtype(non_null.dtype()) {
        return numeric_mode(&non_null);
    }

    let str_series = non_null.cast(&DataType::String).ok()?;
    let str_chunked = str_series.str().ok()?;

    let mut value_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for val in str_chunked.into_iter().flatten() {
        *value_counts.entry(val).or_insert(0) += 1;
    }

    pick_mode(value_counts).map(str::to_string)
}

/// Mode of a null-free numeric Series; ties go to the smaller number.
fn numeric_mode(series: &Series) -> Option<String> {
    let values = series.cast(&DataType::Float64).ok()?;
    let texts = series.cast(&DataType::String).ok()?;

    let mut value_counts: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for (value, text) in values.f64().ok()?.into_iter().zip(texts.str().ok()?) {
        if let (Some(value), Some(text)) = (value, text) {
            value_counts.entry(text).or_insert((value, 0)).1 += 1;
        }
    }

    value_counts
        .into_iter()
        .reduce(|best, candidate| {
            let (_, (best_value, best_count)) = best;
            let (_, (value, count)) = candidate;
            if count > best_count || (count == best_count && value.total_cmp(&best_value).is_lt()) {
                candidate
            } else {
                best
            }
        })
        .map(|(text, _)| text.to_string())
}

/// Most frequent value of a boolean Series; ties resolve to `false`.
pub fn bool_mode(series: &Series) -> PolarsResult<Option<bool>> {
    let bools = series.bool()?;
    let mut value_counts: BTreeMap<bool, usize> = BTreeMap::new();
    for val in bools.into_iter().flatten() {
        *value_counts.entry(val).or_insert(0) += 1;
    }
    Ok(pick_mode(value_counts))
}

/// Highest count wins; on equal counts the first key in map order is kept.
fn pick_mode<K>(value_counts: BTreeMap<K, usize>) -> Option<K> {
    let mut best: Option<(K, usize)> = None;
    for (value, count) in value_counts {
        if best.as_ref().is_none_or(|(_, best_count)| count > *best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null values in a numeric Series with a specific value.
///
/// The result is Float64 and keeps the Series name.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let float_series = series.cast(&DataType::Float64)?;
    let filled: Float64Chunked = float_series
        .f64()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(filled.into_series().with_name(series.name().clone()))
}

/// Fill null values in a string Series with a specific value.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let str_series = series.cast(&DataType::String)?;
    let filled: StringChunked = str_series
        .str()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(filled.into_series().with_name(series.name().clone()))
}

/// Fill null values in a boolean Series with a specific value.
pub fn fill_bool_nulls(series: &Series, fill_value: bool) -> PolarsResult<Series> {
    let filled: BooleanChunked = series
        .bool()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(filled.into_series().with_name(series.name().clone()))
}

// =============================================================================
// Tests
// =============================================================================
