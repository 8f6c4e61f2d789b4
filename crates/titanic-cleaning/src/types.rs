use crate::config::NumericFallback;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Declared kind of a column, deciding which imputer handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Integer or floating point values, imputed by the iterative imputer
    Numeric,
    /// Strings, booleans and categories, imputed with the mode
    Categorical,
}

/// Non-overlapping split of a table's columns by kind, in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPartition {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl ColumnPartition {
    /// Total number of partitioned columns.
    pub fn len(&self) -> usize {
        self.numeric.len() + self.categorical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kind assigned to `column`, if it was partitioned.
    pub fn kind_of(&self, column: &str) -> Option<ColumnKind> {
        if self.numeric.iter().any(|c| c == column) {
            Some(ColumnKind::Numeric)
        } else if self.categorical.iter().any(|c| c == column) {
            Some(ColumnKind::Categorical)
        } else {
            None
        }
    }
}

/// How the numeric stage ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImputationOutcome {
    /// Iterative imputation succeeded; no numeric nulls remain.
    FullyImputed,
    /// Iterative imputation failed and the configured fallback filled the gaps.
    FallbackImputed {
        strategy: NumericFallback,
        reason: String,
    },
    /// Iterative imputation failed and numeric nulls were left in place.
    PartiallyImputed {
        columns_still_missing: Vec<String>,
        reason: String,
    },
}

impl ImputationOutcome {
    /// Whether every numeric cell is filled.
    pub fn is_complete(&self) -> bool {
        !matches!(self, Self::PartiallyImputed { .. })
    }

    /// Failure message of the iterative imputer, if it failed.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::FullyImputed => None,
            Self::FallbackImputed { reason, .. } | Self::PartiallyImputed { reason, .. } => {
                Some(reason)
            }
        }
    }
}

/// Record of one categorical column filled with its mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeFill {
    pub column: String,
    pub value: String,
    pub filled: usize,
}

/// Structured account of what a pipeline run did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Shape of the raw table (rows, columns).
    pub shape_before: (usize, usize),
    /// Shape of the cleaned table (rows, columns).
    pub shape_after: (usize, usize),
    /// Columns removed because every value was missing.
    pub dropped_columns: Vec<String>,
    /// Kind assigned to each retained column.
    pub partition: ColumnPartition,
    /// Numeric columns that had at least one missing value.
    pub numeric_columns_with_missing: Vec<String>,
    /// Number of imputation rounds the iterative imputer ran.
    pub rounds: usize,
    /// Outcome of the numeric stage.
    pub numeric_outcome: ImputationOutcome,
    /// Mode fills applied to categorical columns.
    pub mode_fills: Vec<ModeFill>,
    /// Missing cells left anywhere in the cleaned table.
    pub remaining_missing: usize,
    /// Total execution time in milliseconds.
    pub duration_ms: u64,
}

impl CleaningReport {
    /// Whether the cleaned table has no missing cell.
    pub fn is_complete(&self) -> bool {
        self.remaining_missing == 0
    }
}

/// Cleaned table plus the report describing how it was produced.
#[derive(Debug, Clone)]
pub struct CleaningResult {
    pub data: DataFrame,
    pub report: CleaningReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_kind_of() {
        let partition = ColumnPartition {
            numeric: vec!["age".to_string(), "fare".to_string()],
            categorical: vec!["sex".to_string()],
        };
        assert_eq!(partition.len(), 3);
        assert_eq!(partition.kind_of("fare"), Some(ColumnKind::Numeric));
        assert_eq!(partition.kind_of("sex"), Some(ColumnKind::Categorical));
        assert_eq!(partition.kind_of("deck"), None);
    }

    #[test]
    fn test_outcome_completeness() {
        assert!(ImputationOutcome::FullyImputed.is_complete());
        assert!(
            ImputationOutcome::FallbackImputed {
                strategy: NumericFallback::Median,
                reason: "boom".to_string(),
            }
            .is_complete()
        );

        let partial = ImputationOutcome::PartiallyImputed {
            columns_still_missing: vec!["age".to_string()],
            reason: "boom".to_string(),
        };
        assert!(!partial.is_complete());
        assert_eq!(partial.failure_reason(), Some("boom"));
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = ImputationOutcome::PartiallyImputed {
            columns_still_missing: vec!["age".to_string()],
            reason: "cast failed".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "partially_imputed");
        assert_eq!(json["columns_still_missing"][0], "age");
    }
}
