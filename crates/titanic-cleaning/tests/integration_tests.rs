//! Integration tests for the Titanic cleaning pipeline.
//!
//! These tests run the pipeline end to end over the fixture CSVs.

use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use titanic_cleaning::io::load_csv_with_fallbacks;
use titanic_cleaning::{
    CleaningConfig, CleaningError, CleaningResult, ColumnKind, DatasetSource, ImputationOutcome,
    NumericFallback, Pipeline, ReportGenerator, StatisticalImputer, TableSchema,
};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_fixture(filename: &str) -> DataFrame {
    load_csv_with_fallbacks(&fixtures_path().join(filename)).expect("Failed to read fixture")
}

fn test_config() -> CleaningConfig {
    CleaningConfig::builder()
        .n_estimators(20)
        .random_seed(0)
        .build()
        .expect("valid config")
}

fn clean_fixture(filename: &str) -> CleaningResult {
    Pipeline::builder()
        .config(test_config())
        .build()
        .expect("pipeline")
        .process(load_fixture(filename))
        .expect("pipeline should succeed")
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

fn f64_values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}

fn string_values(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::String)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

// ============================================================================
// Titanic Scenario
// ============================================================================

#[test]
fn test_titanic_subset_scenario() {
    let raw = load_fixture("titanic_subset.csv");
    assert_eq!(raw.column("age").unwrap().null_count(), 4);
    assert_eq!(raw.column("embarked").unwrap().null_count(), 2);
    assert_eq!(raw.column("deck").unwrap().null_count(), raw.height());

    let result = clean_fixture("titanic_subset.csv");
    let data = &result.data;

    // deck is gone
    assert!(data.column("deck").is_err());
    assert_eq!(result.report.dropped_columns, vec!["deck".to_string()]);

    // embarked filled with its mode
    let embarked = string_values(data, "embarked");
    assert!(embarked.iter().all(Option::is_some));
    assert_eq!(embarked[3].as_deref(), Some("S"));
    assert_eq!(embarked[15].as_deref(), Some("S"));

    // age filled with finite values inside the observed range
    let raw_age = f64_values(&raw, "age");
    let observed: Vec<f64> = raw_age.iter().flatten().copied().collect();
    let min = observed.iter().copied().fold(f64::INFINITY, f64::min);
    let max = observed.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let age = f64_values(data, "age");
    for (row, (before, after)) in raw_age.iter().zip(&age).enumerate() {
        let after = after.expect("age should be filled");
        assert!(after.is_finite());
        match before {
            Some(v) => assert_eq!(*v, after, "observed age changed at row {}", row),
            None => assert!(
                (min..=max).contains(&after),
                "imputed age {} outside [{}, {}]",
                after,
                min,
                max
            ),
        }
    }

    assert_eq!(result.report.numeric_outcome, ImputationOutcome::FullyImputed);
    assert_eq!(result.report.remaining_missing, 0);
    assert!(result.report.is_complete());
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_no_fully_empty_column_survives() {
    let result = clean_fixture("titanic_subset.csv");

    for column in result.data.get_columns() {
        assert!(
            column.null_count() < result.data.height(),
            "column '{}' is fully empty",
            column.name()
        );
    }
}

#[test]
fn test_categorical_columns_are_complete() {
    let result = clean_fixture("titanic_subset.csv");

    for name in &result.report.partition.categorical {
        assert_eq!(
            result.data.column(name).unwrap().null_count(),
            0,
            "categorical column '{}' has missing values",
            name
        );
    }
    let filled: Vec<&str> = result
        .report
        .mode_fills
        .iter()
        .map(|f| f.column.as_str())
        .collect();
    assert_eq!(filled, vec!["embarked", "embark_town"]);
}

#[test]
fn test_mode_tie_breaks_to_smallest_value() {
    let mut df = df![
        "category" => [Some("A"), Some("A"), Some("B"), Some("B"), Some("C"), None],
    ]
    .unwrap();

    let fill = StatisticalImputer::apply_mode_imputation(&mut df, "category")
        .unwrap()
        .unwrap();

    assert_eq!(fill.value, "A");
    assert_eq!(string_values(&df, "category")[5].as_deref(), Some("A"));
}

#[test]
fn test_numeric_imputation_with_correlated_predictor() {
    let df = df![
        "predictor" => [1.0, 2.0, 3.0, 4.0, 5.0],
        "target" => [Some(1.0), None, Some(3.0), None, Some(5.0)],
    ]
    .unwrap();

    let result = Pipeline::builder()
        .config(test_config())
        .schema(TableSchema::inferred())
        .build()
        .unwrap()
        .process(df)
        .unwrap();

    assert_eq!(result.report.numeric_outcome, ImputationOutcome::FullyImputed);
    let target = f64_values(&result.data, "target");
    assert!(target.iter().all(|v| v.is_some_and(f64::is_finite)));
    assert_eq!(target[0], Some(1.0));
    assert_eq!(target[2], Some(3.0));
    assert_eq!(target[4], Some(5.0));
}

#[test]
fn test_schema_preserved_minus_empty_columns() {
    let raw = load_fixture("titanic_subset.csv");
    let result = clean_fixture("titanic_subset.csv");

    let expected: Vec<String> = column_names(&raw)
        .into_iter()
        .filter(|name| name != "deck")
        .collect();
    assert_eq!(column_names(&result.data), expected);
    assert_eq!(result.data.height(), raw.height());
}

#[test]
fn test_categorical_fill_is_idempotent() {
    let result = clean_fixture("titanic_subset.csv");
    let mut data = result.data.clone();

    let fills =
        StatisticalImputer::impute_categorical(&mut data, &result.report.partition.categorical)
            .unwrap();

    assert!(fills.is_empty());
    assert!(data.equals(&result.data));
}

#[test]
fn test_load_failure_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("titanic_cleaned.csv");
    fs::write(&output, "previous run\n").unwrap();

    let config = CleaningConfig::builder()
        .output_path(&output)
        .data_home(dir.path())
        .build()
        .unwrap();
    let pipeline = Pipeline::builder()
        .config(config)
        .source(DatasetSource::File(dir.path().join("missing.csv")))
        .build()
        .unwrap();

    let err = pipeline.run().unwrap_err();

    assert!(matches!(err, CleaningError::Load { .. }));
    assert!(err.is_fatal());
    assert_eq!(fs::read_to_string(&output).unwrap(), "previous run\n");
    assert!(!dir.path().join("missing.csv").exists());
}

// ============================================================================
// Failure Policy Tests
// ============================================================================

#[test]
fn test_unparseable_numeric_column_leaves_gaps_by_default() {
    let result = clean_fixture("titanic_bad_age.csv");

    match &result.report.numeric_outcome {
        ImputationOutcome::PartiallyImputed {
            columns_still_missing,
            reason,
        } => {
            assert_eq!(columns_still_missing, &vec!["age".to_string()]);
            assert!(reason.contains("age"));
        }
        other => panic!("expected partial imputation, got {:?}", other),
    }
    // the categorical stage still ran
    assert_eq!(result.data.column("embarked").unwrap().null_count(), 0);
    assert_eq!(result.report.remaining_missing, 2);
}

#[test]
fn test_unparseable_numeric_column_with_median_fallback() {
    let config = CleaningConfig::builder()
        .n_estimators(20)
        .numeric_fallback(NumericFallback::Median)
        .build()
        .unwrap();

    let result = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .process(load_fixture("titanic_bad_age.csv"))
        .unwrap();

    assert!(matches!(
        result.report.numeric_outcome,
        ImputationOutcome::FallbackImputed {
            strategy: NumericFallback::Median,
            ..
        }
    ));
    assert_eq!(result.report.remaining_missing, 0);
    assert_eq!(f64_values(&result.data, "age")[3], Some(26.0));
}

#[test]
fn test_declared_kind_controls_imputer() {
    let schema = TableSchema::titanic().with_column("pclass", ColumnKind::Categorical);
    let result = Pipeline::builder()
        .config(test_config())
        .schema(schema)
        .build()
        .unwrap()
        .process(load_fixture("titanic_subset.csv"))
        .unwrap();

    assert!(!result.report.partition.numeric.contains(&"pclass".to_string()));
    assert!(result.report.partition.categorical.contains(&"pclass".to_string()));
}

// ============================================================================
// End-to-End Tests
// ============================================================================

#[test]
fn test_run_writes_cleaned_csv() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out").join("titanic_cleaned.csv");
    let config = CleaningConfig::builder()
        .n_estimators(20)
        .output_path(&output)
        .build()
        .unwrap();

    let result = Pipeline::builder()
        .config(config)
        .source(DatasetSource::File(fixtures_path().join("titanic_subset.csv")))
        .build()
        .unwrap()
        .run()
        .unwrap();

    let content = fs::read_to_string(&output).unwrap();
    let header = content.lines().next().unwrap();
    assert_eq!(
        header,
        "survived,pclass,sex,age,sibsp,parch,fare,embarked,class,who,adult_male,embark_town,alive,alone"
    );

    let reloaded = load_csv_with_fallbacks(&output).unwrap();
    assert_eq!(reloaded.shape(), result.data.shape());
    let nulls: usize = reloaded.get_columns().iter().map(|c| c.null_count()).sum();
    assert_eq!(nulls, 0);
}

#[test]
fn test_same_seed_gives_same_output() {
    let first = clean_fixture("titanic_subset.csv");
    let second = clean_fixture("titanic_subset.csv");

    assert_eq!(f64_values(&first.data, "age"), f64_values(&second.data, "age"));
    assert_eq!(first.report.rounds, second.report.rounds);
}

#[test]
fn test_report_over_cleaned_data() {
    let result = clean_fixture("titanic_subset.csv");
    let report = ReportGenerator::build_eda_report(&result.data).unwrap();

    assert_eq!(report.shape, (20, 14));
    assert!(report.columns.iter().all(|c| c.missing == 0));

    let sex = report
        .survival_by_category
        .iter()
        .find(|b| b.column == "sex")
        .expect("sex breakdown");
    let female = sex.groups.iter().find(|g| g.group == "female").unwrap();
    let male = sex.groups.iter().find(|g| g.group == "male").unwrap();
    assert!(female.survival_rate.unwrap() > male.survival_rate.unwrap());

    let age_total: usize = report
        .age_groups
        .as_ref()
        .unwrap()
        .iter()
        .map(|g| g.count)
        .sum();
    assert_eq!(age_total, 20);
}
