//! Imputation module for handling missing values.
//!
//! This module provides:
//! - Iterative imputation backed by a random forest regressor (numeric columns)
//! - Statistical imputation: mode for categorical columns, median/mean as the
//!   numeric fallback

pub mod forest;
mod iterative;
mod statistical;

pub use forest::{ForestParams, RandomForestRegressor};
pub use iterative::{IterativeImputation, IterativeImputer};
pub use statistical::StatisticalImputer;
