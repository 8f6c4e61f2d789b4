use crate::utils::{DtypeCategory, get_dtype_category, mean, observed_f64_values, quantile_sorted};
use anyhow::Result;
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

/// Right-closed age bins `(lower, upper]` and their labels.
pub const AGE_BINS: [(f64, f64, &str); 5] = [
    (0.0, 12.0, "Child"),
    (12.0, 18.0, "Teen"),
    (18.0, 40.0, "Adult"),
    (40.0, 60.0, "Middle-Aged"),
    (60.0, 100.0, "Senior"),
];

const TARGET_COLUMN: &str = "survived";

// ============================================================================
// Report Types
// ============================================================================

/// Descriptive statistics of a cleaned table.
///
/// Used for console output, `--json` and the file written by
/// `--emit-report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdaReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// (rows, columns)
    pub shape: (usize, usize),
    /// Per-column dtype and missing counts, in table order
    pub columns: Vec<ColumnOverview>,
    pub numeric_summaries: Vec<NumericSummary>,
    pub outliers: Vec<OutlierCount>,
    pub category_counts: Vec<CategoryCounts>,
    pub correlation: CorrelationMatrix,
    /// Survival per category of every categorical column; empty without a
    /// `survived` column
    pub survival_by_category: Vec<SurvivalBreakdown>,
    /// Passenger counts per age bin; None without an `age` column
    pub age_groups: Option<Vec<GroupSurvival>>,
    /// Survival per (sex, pclass) pair; empty unless all three columns exist
    pub survival_by_sex_and_class: Vec<GroupSurvival>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnOverview {
    pub name: String,
    pub dtype: String,
    pub missing: usize,
    pub missing_percent: f64,
}

/// The `describe()` statistics of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1)
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Values outside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierCount {
    pub column: String,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Value counts of one categorical column, most frequent first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub column: String,
    pub counts: Vec<ValueCount>,
}

/// Pearson correlation over the numeric columns.
///
/// `values[i][j]` is None when either column has zero variance over the
/// rows both observe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// Correlation between two named columns.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

/// Passenger and survivor counts for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSurvival {
    pub group: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survived: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survival_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalBreakdown {
    pub column: String,
    pub groups: Vec<GroupSurvival>,
}

// ============================================================================
// Generator
// ============================================================================

pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./outputs"),
        }
    }
}

impl ReportGenerator {
    /// Create a new ReportGenerator writing into `output_dir`.
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    /// Compute the descriptive statistics of `df`.
    ///
    /// Columns with an integer or float dtype are numeric; every other
    /// column (strings, booleans) is categorical.
    pub fn build_eda_report(df: &DataFrame) -> Result<EdaReport> {
        let height = df.height();
        let mut numeric_cols: Vec<String> = Vec::new();
        let mut categorical_cols: Vec<String> = Vec::new();

        let columns: Vec<ColumnOverview> = df
            .get_columns()
            .iter()
            .map(|col| {
                let name = col.name().to_string();
                match get_dtype_category(col.dtype()) {
                    DtypeCategory::Numeric => numeric_cols.push(name.clone()),
                    _ => categorical_cols.push(name.clone()),
                }
                let missing = col.null_count();
                ColumnOverview {
                    name,
                    dtype: col.dtype().to_string(),
                    missing,
                    missing_percent: percent(missing, height),
                }
            })
            .collect();

        let mut numeric_values: Vec<Vec<Option<f64>>> = Vec::with_capacity(numeric_cols.len());
        let mut numeric_summaries = Vec::with_capacity(numeric_cols.len());
        let mut outliers = Vec::new();
        for name in &numeric_cols {
            let series = df.column(name)?.as_materialized_series();
            let observed = observed_f64_values(series)?;
            numeric_summaries.push(numeric_summary(name, &observed));
            if let Some(outlier) = iqr_outliers(name, &observed) {
                outliers.push(outlier);
            }
            numeric_values.push(optional_f64_values(series)?);
        }
        debug!("Summarized {} numeric columns", numeric_cols.len());

        let correlation = CorrelationMatrix {
            values: numeric_values
                .iter()
                .map(|a| numeric_values.iter().map(|b| pearson(a, b)).collect())
                .collect(),
            columns: numeric_cols,
        };

        let mut category_counts = Vec::with_capacity(categorical_cols.len());
        for name in &categorical_cols {
            category_counts.push(CategoryCounts {
                column: name.clone(),
                counts: value_counts(&text_values(df, name)?),
            });
        }

        let survived = match df.column(TARGET_COLUMN) {
            Ok(col) => Some(optional_f64_values(col.as_materialized_series())?),
            Err(_) => None,
        };

        let mut survival_by_category = Vec::new();
        if let Some(survived) = &survived {
            for name in categorical_cols.iter().filter(|c| *c != TARGET_COLUMN) {
                let groups = text_values(df, name)?;
                let mut breakdown = group_survival(&groups, Some(survived.as_slice()));
                sort_by_count(&mut breakdown);
                survival_by_category.push(SurvivalBreakdown {
                    column: name.clone(),
                    groups: breakdown,
                });
            }
        }

        let age_groups = match df.column("age") {
            Ok(col) => {
                let ages = optional_f64_values(col.as_materialized_series())?;
                let labels: Vec<Option<String>> = ages
                    .iter()
                    .map(|age| age.and_then(age_group).map(str::to_string))
                    .collect();
                let mut groups = group_survival(&labels, survived.as_deref());
                groups.sort_by_key(|g| AGE_BINS.iter().position(|(_, _, label)| *label == g.group));
                Some(groups)
            }
            Err(_) => None,
        };

        let mut survival_by_sex_and_class = Vec::new();
        if let (Some(survived), Ok(_), Ok(_)) = (&survived, df.column("sex"), df.column("pclass")) {
            let sex = text_values(df, "sex")?;
            let pclass = text_values(df, "pclass")?;
            let pairs: Vec<Option<String>> = sex
                .iter()
                .zip(&pclass)
                .map(|(s, p)| match (s, p) {
                    (Some(s), Some(p)) => Some(format!("{} / class {}", s, p)),
                    _ => None,
                })
                .collect();
            survival_by_sex_and_class = group_survival(&pairs, Some(survived.as_slice()));
        }

        Ok(EdaReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            shape: df.shape(),
            columns,
            numeric_summaries,
            outliers,
            category_counts,
            correlation,
            survival_by_category,
            age_groups,
            survival_by_sex_and_class,
        })
    }

    /// Write a report to `<output_dir>/<report_base_name>_report.json`.
    pub fn write_report_to_file(&self, report: &EdaReport, report_base_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self.output_dir.join(format!("{}_report.json", report_base_name));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());

        Ok(report_path)
    }
}

/// Label of the bin containing `age`, if any.
pub fn age_group(age: f64) -> Option<&'static str> {
    AGE_BINS
        .iter()
        .find(|(lower, upper, _)| age > *lower && age <= *upper)
        .map(|(_, _, label)| *label)
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn optional_f64_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let float_series = series.cast(&DataType::Float64)?;
    Ok(float_series.f64()?.into_iter().collect())
}

fn text_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let series = df.column(name)?.as_materialized_series().cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

fn numeric_summary(column: &str, observed: &[f64]) -> NumericSummary {
    let mut sorted = observed.to_vec();
    sorted.sort_by(f64::total_cmp);

    NumericSummary {
        column: column.to_string(),
        count: sorted.len(),
        mean: mean(&sorted),
        std: sample_std(&sorted),
        min: sorted.first().copied(),
        q25: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        q75: quantile_sorted(&sorted, 0.75),
        max: sorted.last().copied(),
    }
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

fn iqr_outliers(column: &str, observed: &[f64]) -> Option<OutlierCount> {
    let mut sorted = observed.to_vec();
    sorted.sort_by(f64::total_cmp);
    let q1 = quantile_sorted(&sorted, 0.25)?;
    let q3 = quantile_sorted(&sorted, 0.75)?;
    let iqr = q3 - q1;
    let lower_bound = q1 - 1.5 * iqr;
    let upper_bound = q3 + 1.5 * iqr;

    Some(OutlierCount {
        column: column.to_string(),
        lower_bound,
        upper_bound,
        count: sorted
            .iter()
            .filter(|&&v| v < lower_bound || v > upper_bound)
            .count(),
    })
}

/// Pearson correlation over the rows where both values are present.
fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    Some((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

fn value_counts(values: &[Option<String>]) -> Vec<ValueCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.iter().flatten() {
        *counts.entry(value.as_str()).or_insert(0) += 1;
    }

    let mut result: Vec<ValueCount> = counts
        .into_iter()
        .map(|(value, count)| ValueCount {
            value: value.to_string(),
            count,
        })
        .collect();
    // BTreeMap order is ascending, so a stable sort keeps it among equal counts
    result.sort_by(|a, b| b.count.cmp(&a.count));
    result
}

/// Count rows and survivors per group, skipping rows with no group.
///
/// Groups come back in ascending order of their label.
fn group_survival(groups: &[Option<String>], survived: Option<&[Option<f64>]>) -> Vec<GroupSurvival> {
    // group -> (rows, rows with known outcome, survivors)
    let mut tally: BTreeMap<&str, (usize, usize, usize)> = BTreeMap::new();
    for (row, group) in groups.iter().enumerate() {
        let Some(group) = group else { continue };
        let entry = tally.entry(group.as_str()).or_insert((0, 0, 0));
        entry.0 += 1;
        if let Some(outcome) = survived.and_then(|s| s.get(row).copied().flatten()) {
            entry.1 += 1;
            if outcome > 0.5 {
                entry.2 += 1;
            }
        }
    }

    tally
        .into_iter()
        .map(|(group, (count, known, survivors))| GroupSurvival {
            group: group.to_string(),
            count,
            survived: survived.map(|_| survivors),
            survival_rate: survived
                .filter(|_| known > 0)
                .map(|_| survivors as f64 / known as f64),
        })
        .collect()
}

fn sort_by_count(groups: &mut [GroupSurvival]) {
    groups.sort_by(|a, b| match b.count.cmp(&a.count) {
        Ordering::Equal => a.group.cmp(&b.group),
        other => other,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cleaned_df() -> DataFrame {
        df![
            "survived" => [0i64, 1, 1, 1, 0, 0, 1, 0],
            "pclass" => [3i64, 1, 3, 1, 3, 3, 2, 1],
            "sex" => ["male", "female", "female", "female", "male", "male", "female", "male"],
            "age" => [22.0, 38.0, 26.0, 35.0, 35.0, 8.0, 14.0, 70.0],
            "fare" => [7.25, 71.28, 7.92, 53.1, 8.05, 8.46, 30.07, 500.0],
            "alone" => [false, false, true, false, true, true, false, true],
        ]
        .unwrap()
    }

    #[test]
    fn test_age_group_bins_are_right_closed() {
        assert_eq!(age_group(12.0), Some("Child"));
        assert_eq!(age_group(12.5), Some("Teen"));
        assert_eq!(age_group(18.0), Some("Teen"));
        assert_eq!(age_group(40.0), Some("Adult"));
        assert_eq!(age_group(60.0), Some("Middle-Aged"));
        assert_eq!(age_group(100.0), Some("Senior"));
        assert_eq!(age_group(0.0), None);
        assert_eq!(age_group(100.5), None);
    }

    #[test]
    fn test_numeric_summary_matches_describe() {
        let summary = numeric_summary("x", &[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean, Some(2.5));
        assert_eq!(summary.min, Some(1.0));
        assert_eq!(summary.q25, Some(1.75));
        assert_eq!(summary.median, Some(2.5));
        assert_eq!(summary.q75, Some(3.25));
        assert_eq!(summary.max, Some(4.0));
        let std = summary.std.unwrap();
        assert!((std - 1.290_994_448_7).abs() < 1e-9);
    }

    #[test]
    fn test_iqr_outlier_bounds_are_exclusive() {
        // Q1 = 2, Q3 = 4, IQR = 2 -> bounds [-1, 7]
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 7.0, -1.0, 2.0, 4.0, 8.0, 3.0];
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let q1 = quantile_sorted(&sorted, 0.25).unwrap();
        let q3 = quantile_sorted(&sorted, 0.75).unwrap();

        let outliers = iqr_outliers("x", &values).unwrap();
        assert_eq!(outliers.lower_bound, q1 - 1.5 * (q3 - q1));
        let expected = values
            .iter()
            .filter(|&&v| v < outliers.lower_bound || v > outliers.upper_bound)
            .count();
        assert_eq!(outliers.count, expected);

        let flat = iqr_outliers("y", &[5.0, 5.0, 5.0]).unwrap();
        assert_eq!(flat.count, 0);
    }

    #[test]
    fn test_pearson_correlation() {
        let a = [Some(1.0), Some(2.0), Some(3.0)];
        let b = [Some(2.0), Some(4.0), Some(6.0)];
        let c = [Some(3.0), Some(2.0), Some(1.0)];
        let flat = [Some(1.0), Some(1.0), Some(1.0)];

        assert!((pearson(&a, &b).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&a, &c).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&a, &flat), None);
    }

    #[test]
    fn test_value_counts_order() {
        let values: Vec<Option<String>> = ["S", "C", "S", "Q", "C", "Q", "S"]
            .iter()
            .map(|v| Some(v.to_string()))
            .chain(std::iter::once(None))
            .collect();

        let counts = value_counts(&values);
        let order: Vec<(&str, usize)> = counts.iter().map(|c| (c.value.as_str(), c.count)).collect();
        assert_eq!(order, vec![("S", 3), ("C", 2), ("Q", 2)]);
    }

    #[test]
    fn test_build_eda_report() {
        let report = ReportGenerator::build_eda_report(&cleaned_df()).unwrap();

        assert_eq!(report.shape, (8, 6));
        assert_eq!(report.columns.len(), 6);
        assert!(report.columns.iter().all(|c| c.missing == 0));

        let numeric: Vec<&str> = report
            .numeric_summaries
            .iter()
            .map(|s| s.column.as_str())
            .collect();
        assert_eq!(numeric, vec!["survived", "pclass", "age", "fare"]);
        assert_eq!(report.category_counts.len(), 2);

        let fare_outliers = report.outliers.iter().find(|o| o.column == "fare").unwrap();
        assert_eq!(fare_outliers.count, 1);

        assert!((report.correlation.get("age", "age").unwrap() - 1.0).abs() < 1e-12);
        assert!(report.correlation.get("fare", "pclass").unwrap() < 0.0);

        let sex = report
            .survival_by_category
            .iter()
            .find(|b| b.column == "sex")
            .unwrap();
        let female = sex.groups.iter().find(|g| g.group == "female").unwrap();
        assert_eq!(female.count, 4);
        assert_eq!(female.survival_rate, Some(1.0));

        let ages = report.age_groups.unwrap();
        let labels: Vec<&str> = ages.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(labels, vec!["Child", "Teen", "Adult", "Senior"]);

        assert_eq!(report.survival_by_sex_and_class.len(), 5);
        let male_third = report
            .survival_by_sex_and_class
            .iter()
            .find(|g| g.group == "male / class 3")
            .unwrap();
        assert_eq!(male_third.count, 3);
        assert_eq!(male_third.survived, Some(0));
    }

    #[test]
    fn test_build_eda_report_without_survived() {
        let df = df![
            "age" => [Some(5.0), None, Some(45.0)],
            "embarked" => ["S", "C", "S"],
        ]
        .unwrap();

        let report = ReportGenerator::build_eda_report(&df).unwrap();

        assert!(report.survival_by_category.is_empty());
        assert!(report.survival_by_sex_and_class.is_empty());
        let ages = report.age_groups.unwrap();
        assert_eq!(ages.len(), 2);
        assert!(ages.iter().all(|g| g.survival_rate.is_none()));
        let age = &report.columns[0];
        assert_eq!(age.missing, 1);
        assert!((age.missing_percent - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_write_report_to_file() {
        let dir = TempDir::new().unwrap();
        let generator = ReportGenerator::new(dir.path().join("reports"));
        let report = ReportGenerator::build_eda_report(&cleaned_df()).unwrap();

        let path = generator.write_report_to_file(&report, "titanic_cleaned").unwrap();

        assert!(path.ends_with("titanic_cleaned_report.json"));
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["shape"][0], 8);
    }
}
