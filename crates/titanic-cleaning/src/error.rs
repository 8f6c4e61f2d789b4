//! Error types for the cleaning pipeline.
//!
//! Every failure the pipeline can surface is a [`CleaningError`] variant with
//! a stable error code, so callers can tell a fatal load or write failure
//! apart from the recoverable numeric-imputation failure.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the cleaning pipeline.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// The source dataset could not be obtained or parsed.
    #[error("Failed to load dataset '{source_name}': {reason}")]
    Load { source_name: String, reason: String },

    /// Iterative numeric imputation failed.
    #[error("Failed to impute numeric column '{column}': {reason}")]
    Imputation { column: String, reason: String },

    /// A categorical column has no observed value to take a mode from.
    #[error("Cannot impute categorical column '{0}': no observed values, mode is undefined")]
    UndefinedMode(String),

    /// The cleaned table could not be written.
    #[error("Failed to write cleaned data to '{}': {reason}", .path.display())]
    Write { path: PathBuf, reason: String },

    /// Invalid configuration handed to the pipeline builder.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CleaningError>,
    },
}

impl CleaningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleaningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a load failure.
    pub fn load(source_name: impl Into<String>, reason: impl ToString) -> Self {
        CleaningError::Load {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for a numeric imputation failure.
    pub fn imputation(column: impl Into<String>, reason: impl ToString) -> Self {
        CleaningError::Imputation {
            column: column.into(),
            reason: reason.to_string(),
        }
    }

    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Load { .. } => "LOAD_FAILED",
            Self::Imputation { .. } => "IMPUTATION_FAILED",
            Self::UndefinedMode(_) => "UNDEFINED_MODE",
            Self::Write { .. } => "WRITE_FAILED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether this error aborts the pipeline.
    ///
    /// Only numeric imputation failures are contained; the pipeline logs
    /// them and keeps going.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Imputation { .. } => false,
            Self::WithContext { source, .. } => source.is_fatal(),
            _ => true,
        }
    }
}

/// Errors are serialized as `{ code, message }`.
impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CleaningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Polars(e).with_context(context))
    }
}
