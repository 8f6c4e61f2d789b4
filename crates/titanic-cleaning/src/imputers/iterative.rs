//! Iterative, regression-based imputation of numeric columns.
//!
//! Missing cells start at their column mean. Each round then visits the
//! incomplete columns, fewest missing first, fits a random forest on the
//! rows where the column was observed (all other numeric columns are the
//! features), and overwrites the originally missing cells with the forest's
//! predictions. Rounds stop at `max_iter` or once the largest change
//! between rounds drops below `tolerance` times the largest observed
//! magnitude.

use crate::config::CleaningConfig;
use crate::error::{CleaningError, Result};
use crate::imputers::forest::{ForestParams, RandomForestRegressor};
use crate::utils::strict_f64_values;
use polars::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

/// Output of a successful iterative imputation.
#[derive(Debug, Clone)]
pub struct IterativeImputation {
    /// Input table with the imputed columns replaced (as Float64).
    pub data: DataFrame,
    /// Columns whose missing cells were filled.
    pub imputed_columns: Vec<String>,
    /// Number of rounds run; 0 when only the initial mean fill applied.
    pub rounds: usize,
    /// Whether the tolerance was reached before `max_iter`.
    pub converged: bool,
}

pub struct IterativeImputer {
    max_iter: usize,
    tolerance: f64,
    random_seed: u64,
    forest: ForestParams,
}

impl IterativeImputer {
    pub fn new(max_iter: usize, tolerance: f64, random_seed: u64, forest: ForestParams) -> Self {
        Self {
            max_iter: max_iter.max(1),
            tolerance,
            random_seed,
            forest,
        }
    }

    pub fn from_config(config: &CleaningConfig) -> Self {
        Self::new(
            config.max_iter,
            config.tolerance,
            config.random_seed,
            ForestParams {
                n_estimators: config.n_estimators,
                max_depth: config.max_depth,
                min_samples_leaf: config.min_samples_leaf,
            },
        )
    }

    /// Impute the missing cells of `columns` in `df`.
    ///
    /// Columns without missing values are used as predictors and returned
    /// untouched. Observed cells are never modified.
    pub fn fit_transform(&self, df: &DataFrame, columns: &[String]) -> Result<IterativeImputation> {
        let mut matrix: Vec<Vec<f64>> = Vec::with_capacity(columns.len());
        let mut missing: Vec<Vec<usize>> = Vec::with_capacity(columns.len());
        let mut max_observed: f64 = 0.0;

        for name in columns {
            let series = df.column(name)?.as_materialized_series();
            let values = strict_f64_values(series).map_err(|e| {
                CleaningError::imputation(name, format!("cannot read as numeric: {}", e))
            })?;

            let observed: Vec<f64> = values.iter().flatten().copied().collect();
            if observed.iter().any(|v| !v.is_finite()) {
                return Err(CleaningError::imputation(
                    name,
                    "column contains non-finite values",
                ));
            }

            let missing_rows: Vec<usize> = values
                .iter()
                .enumerate()
                .filter_map(|(row, v)| v.is_none().then_some(row))
                .collect();

            if !missing_rows.is_empty() && observed.is_empty() {
                return Err(CleaningError::imputation(
                    name,
                    "column has no observed values",
                ));
            }

            let initial = if observed.is_empty() {
                0.0
            } else {
                observed.iter().sum::<f64>() / observed.len() as f64
            };
            max_observed = observed.iter().fold(max_observed, |acc, v| acc.max(v.abs()));

            matrix.push(values.into_iter().map(|v| v.unwrap_or(initial)).collect());
            missing.push(missing_rows);
        }

        let mut order: Vec<usize> = (0..columns.len())
            .filter(|&j| !missing[j].is_empty())
            .collect();
        order.sort_by_key(|&j| missing[j].len());

        if order.is_empty() {
            debug!("No numeric column has missing values, nothing to impute");
            return Ok(IterativeImputation {
                data: df.clone(),
                imputed_columns: Vec::new(),
                rounds: 0,
                converged: true,
            });
        }

        let imputed_columns: Vec<String> = order.iter().map(|&j| columns[j].clone()).collect();
        debug!("Iterative imputation order: {:?}", imputed_columns);

        let mut rounds = 0;
        let mut converged = false;

        if columns.len() == 1 {
            warn!(
                "Only one numeric column ('{}'), using its mean without regression",
                columns[0]
            );
            converged = true;
        } else {
            let normalized_tol = self.tolerance * max_observed;
            let mut rng = StdRng::seed_from_u64(self.random_seed);

            for round in 1..=self.max_iter {
                let previous = matrix.clone();

                for &target in &order {
                    self.impute_column(&mut matrix, &missing[target], target, &mut rng)
                        .map_err(|e| CleaningError::imputation(&columns[target], e))?;
                }

                rounds = round;
                let change = matrix
                    .iter()
                    .zip(&previous)
                    .flat_map(|(cur, prev)| cur.iter().zip(prev).map(|(a, b)| (a - b).abs()))
                    .fold(0.0_f64, f64::max);
                debug!("Imputation round {}: max change {:.6}", round, change);

                if change < normalized_tol {
                    converged = true;
                    info!("Iterative imputation converged after {} rounds", round);
                    break;
                }
            }

            if !converged {
                warn!(
                    "Iterative imputation reached max_iter={} without converging",
                    self.max_iter
                );
            }
        }

        let mut data = df.clone();
        for &j in &order {
            let series = Series::new(columns[j].as_str().into(), matrix[j].clone());
            data.replace(&columns[j], series)?;
        }

        Ok(IterativeImputation {
            data,
            imputed_columns,
            rounds,
            converged,
        })
    }

    /// Refit the forest for one column and overwrite its missing cells.
    fn impute_column(
        &self,
        matrix: &mut [Vec<f64>],
        missing_rows: &[usize],
        target: usize,
        rng: &mut StdRng,
    ) -> anyhow::Result<()> {
        let n_rows = matrix[target].len();
        let features = |row: usize| -> Vec<f64> {
            matrix
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != target)
                .map(|(_, col)| col[row])
                .collect()
        };

        let mut is_missing = vec![false; n_rows];
        for &row in missing_rows {
            is_missing[row] = true;
        }

        let train_rows: Vec<usize> = (0..n_rows).filter(|&row| !is_missing[row]).collect();
        let x_train: Vec<Vec<f64>> = train_rows.iter().map(|&row| features(row)).collect();
        let y_train: Vec<f64> = train_rows.iter().map(|&row| matrix[target][row]).collect();

        let mut forest = RandomForestRegressor::new(self.forest);
        forest.fit(&x_train, &y_train, rng)?;

        let predictions: Vec<(usize, f64)> = missing_rows
            .iter()
            .map(|&row| {
                let prediction = forest
                    .predict(&features(row))
                    .ok_or_else(|| anyhow::anyhow!("forest produced no prediction"))?;
                Ok((row, prediction))
            })
            .collect::<anyhow::Result<_>>()?;

        for (row, value) in predictions {
            matrix[target][row] = value;
        }

        Ok(())
    }
}
