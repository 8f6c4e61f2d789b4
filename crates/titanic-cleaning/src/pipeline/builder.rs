//! Main cleaning pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating the cleaning workflow.

use crate::cleaner::DataCleaner;
use crate::config::{CleaningConfig, NumericFallback};
use crate::error::Result;
use crate::imputers::{IterativeImputer, StatisticalImputer};
use crate::io::{DatasetSource, load_dataset, write_cleaned_csv};
use crate::pipeline::progress::{
    ClosureProgressReporter, CleaningStage, ProgressReporter, ProgressUpdate,
};
use crate::schema::TableSchema;
use crate::types::{CleaningReport, CleaningResult, ImputationOutcome};
use crate::utils::total_nulls;
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// The cleaning pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use titanic_cleaning::{CleaningConfig, NumericFallback, Pipeline};
///
/// // Clean an in-memory table
/// let result = Pipeline::builder()
///     .config(CleaningConfig::builder().numeric_fallback(NumericFallback::Median).build()?)
///     .build()?
///     .process(dataframe)?;
///
/// // Load, clean and write titanic_cleaned.csv
/// Pipeline::builder().build()?.run()?;
/// ```
pub struct Pipeline {
    config: CleaningConfig,
    schema: TableSchema,
    source: Option<DatasetSource>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cleaner: DataCleaner,
}

static_assertions::assert_impl_all!(Pipeline: Send);

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("schema", &self.schema)
            .field("source", &self.source)
            .field("progress_reporter", &self.progress_reporter.is_some())
            .field("cleaner", &self.cleaner)
            .finish()
    }
}

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Source `run` reads from: the explicit source, else the configured
    /// named dataset.
    pub fn source(&self) -> DatasetSource {
        self.source
            .clone()
            .unwrap_or_else(|| DatasetSource::Named(self.config.dataset.clone()))
    }

    /// Clean an already-loaded table.
    ///
    /// Performs no file I/O. A failing iterative imputation is logged and
    /// handled by the configured fallback; every other error is returned.
    pub fn process(&self, df: DataFrame) -> Result<CleaningResult> {
        let result = self.process_internal(df);
        self.finish(result)
    }

    /// Load the source, clean it and write the cleaned CSV to
    /// `config.output_path`.
    ///
    /// Nothing is written when loading or cleaning fails.
    pub fn run(&self) -> Result<CleaningResult> {
        let result = self.run_internal();
        self.finish(result)
    }

    fn run_internal(&self) -> Result<CleaningResult> {
        let source = self.source();
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Loading,
            0.0,
            format!("Loading dataset '{}'...", source.display_name()),
        ));
        info!("Step 1: Loading dataset '{}'...", source.display_name());
        let df = load_dataset(&source, &self.config.data_home)?;

        let result = self.process_internal(df)?;

        self.report_progress(ProgressUpdate::new(
            CleaningStage::Writing,
            0.0,
            "Writing cleaned dataset...",
        ));
        info!("Step 6: Writing cleaned dataset...");
        write_cleaned_csv(&result.data, &self.config.output_path)?;

        Ok(result)
    }

    /// Report the terminal progress state and log fatal errors.
    fn finish(&self, result: Result<CleaningResult>) -> Result<CleaningResult> {
        match result {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn process_internal(&self, df: DataFrame) -> Result<CleaningResult> {
        let start_time = Instant::now();
        let shape_before = df.shape();

        info!("Starting cleaning pipeline...");

        // Step 2: Drop fully-empty columns
        self.report_progress(ProgressUpdate::new(
            CleaningStage::DroppingEmptyColumns,
            0.0,
            "Dropping fully-empty columns...",
        ));
        info!("Step 2: Dropping fully-empty columns...");
        let (df, dropped_columns) = self.cleaner.drop_empty_columns(df)?;

        // Step 3: Partition columns
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Partitioning,
            0.0,
            "Partitioning columns...",
        ));
        info!("Step 3: Partitioning columns...");
        let partition = self.schema.partition(&df);
        info!("Numeric columns: {:?}", partition.numeric);
        info!("Categorical columns: {:?}", partition.categorical);

        let numeric_columns_with_missing: Vec<String> = partition
            .numeric
            .iter()
            .filter(|name| df.column(name).is_ok_and(|c| c.null_count() > 0))
            .cloned()
            .collect();

        // Step 4: Iterative imputation of numeric columns
        self.report_progress(ProgressUpdate::new(
            CleaningStage::NumericImputation,
            0.0,
            format!(
                "Imputing {} numeric columns with missing values...",
                numeric_columns_with_missing.len()
            ),
        ));
        info!("Step 4: Imputing numeric columns...");
        let imputer = IterativeImputer::from_config(&self.config);
        let (mut df, rounds, numeric_outcome) = match imputer.fit_transform(&df, &partition.numeric)
        {
            Ok(imputation) => {
                info!(
                    "Iterative imputation completed for {:?} ({} rounds)",
                    imputation.imputed_columns, imputation.rounds
                );
                (imputation.data, imputation.rounds, ImputationOutcome::FullyImputed)
            }
            Err(e) if !e.is_fatal() => {
                warn!("Iterative imputation failed: {}", e);
                warn!("Consider falling back to mean or median imputation for numeric columns");
                let mut df = df;
                let outcome = self.apply_numeric_fallback(&mut df, &partition.numeric, e.to_string())?;
                (df, 0, outcome)
            }
            Err(e) => return Err(e),
        };

        // Step 5: Mode imputation of categorical columns
        info!("Step 5: Imputing categorical columns...");
        let total = partition.categorical.len();
        let mut mode_fills = Vec::new();
        for (idx, col_name) in partition.categorical.iter().enumerate() {
            self.report_progress(ProgressUpdate::with_items(
                CleaningStage::CategoricalImputation,
                format!("Column: {}", col_name),
                idx,
                total,
                format!("Filling '{}' with its mode", col_name),
            ));
            if let Some(fill) = StatisticalImputer::apply_mode_imputation(&mut df, col_name)? {
                info!(
                    "Filled {} missing values in '{}' with mode '{}'",
                    fill.filled, fill.column, fill.value
                );
                mode_fills.push(fill);
            }
        }

        // Summarize
        let remaining_missing = total_nulls(&df);
        if remaining_missing > 0 {
            warn!("{} missing values remain after cleaning", remaining_missing);
        }

        let report = CleaningReport {
            shape_before,
            shape_after: df.shape(),
            dropped_columns,
            partition,
            numeric_columns_with_missing,
            rounds,
            numeric_outcome,
            mode_fills,
            remaining_missing,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            "Cleaning finished in {} ms: {:?} -> {:?}",
            report.duration_ms, report.shape_before, report.shape_after
        );

        Ok(CleaningResult { data: df, report })
    }

    fn apply_numeric_fallback(
        &self,
        df: &mut DataFrame,
        numeric: &[String],
        reason: String,
    ) -> Result<ImputationOutcome> {
        let strategy = self.config.numeric_fallback;
        if strategy != NumericFallback::None {
            let filled = StatisticalImputer::apply_numeric_fallback(df, numeric, strategy)?;
            info!(
                "Applied {:?} fallback to numeric columns {:?}",
                strategy, filled
            );
        }

        let columns_still_missing: Vec<String> = numeric
            .iter()
            .filter(|name| df.column(name).is_ok_and(|c| c.null_count() > 0))
            .cloned()
            .collect();
        if columns_still_missing.is_empty() {
            return Ok(ImputationOutcome::FallbackImputed { strategy, reason });
        }

        warn!(
            "Numeric columns left with missing values: {:?}",
            columns_still_missing
        );
        let reason = if strategy == NumericFallback::None {
            reason
        } else {
            format!("{}; {:?} fallback found no finite observed value", reason, strategy)
        };
        Ok(ImputationOutcome::PartiallyImputed {
            columns_still_missing,
            reason,
        })
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<CleaningConfig>,
    schema: Option<TableSchema>,
    source: Option<DatasetSource>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: CleaningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the declared column kinds. Defaults to [`TableSchema::titanic`].
    pub fn schema(mut self, schema: TableSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Read from `source` in [`Pipeline::run`] instead of the configured
    /// named dataset.
    pub fn source(mut self, source: DatasetSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// This is a convenience method for simple progress handling.
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<Pipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            schema: self.schema.unwrap_or_else(TableSchema::titanic),
            source: self.source,
            progress_reporter: self.progress_reporter,
            cleaner: DataCleaner,
        })
    }
}
