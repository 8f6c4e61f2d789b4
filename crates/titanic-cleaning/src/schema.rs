//! Declared column metadata and the numeric/categorical partition.
//!
//! The partition is driven by declared kinds rather than by whatever dtype
//! the CSV reader happened to infer, so a column keeps its role even when a
//! stray value makes the reader load it as text.

use crate::types::{ColumnKind, ColumnPartition};
use crate::utils::{DtypeCategory, get_dtype_category};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Declared kind of a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Per-column kind declarations for a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<ColumnSpec>,
}

impl TableSchema {
    /// Schema with no declarations; every column is classified by dtype.
    pub fn inferred() -> Self {
        Self::default()
    }

    /// Declared kinds of the seaborn Titanic table.
    pub fn titanic() -> Self {
        use ColumnKind::{Categorical, Numeric};

        let columns = [
            ("survived", Numeric),
            ("pclass", Numeric),
            ("sex", Categorical),
            ("age", Numeric),
            ("sibsp", Numeric),
            ("parch", Numeric),
            ("fare", Numeric),
            ("embarked", Categorical),
            ("class", Categorical),
            ("who", Categorical),
            ("adult_male", Categorical),
            ("deck", Categorical),
            ("embark_town", Categorical),
            ("alive", Categorical),
            ("alone", Categorical),
        ]
        .into_iter()
        .map(|(name, kind)| ColumnSpec::new(name, kind))
        .collect();

        Self { columns }
    }

    /// Add or replace the declaration for one column.
    pub fn with_column(mut self, name: impl Into<String>, kind: ColumnKind) -> Self {
        let name = name.into();
        self.columns.retain(|spec| spec.name != name);
        self.columns.push(ColumnSpec::new(name, kind));
        self
    }

    /// Declared kind of `column`, if any.
    pub fn declared_kind(&self, column: &str) -> Option<ColumnKind> {
        self.columns
            .iter()
            .find(|spec| spec.name == column)
            .map(|spec| spec.kind)
    }

    /// Split the columns of `df` into numeric and categorical, in table order.
    ///
    /// A declared kind always wins. Undeclared columns are numeric when
    /// their dtype is an integer or float and categorical otherwise.
    pub fn partition(&self, df: &DataFrame) -> ColumnPartition {
        let mut partition = ColumnPartition::default();

        for column in df.get_columns() {
            let name = column.name().to_string();
            let kind = match self.declared_kind(&name) {
                Some(kind) => kind,
                None => {
                    let inferred = match get_dtype_category(column.dtype()) {
                        DtypeCategory::Numeric => ColumnKind::Numeric,
                        _ => ColumnKind::Categorical,
                    };
                    debug!(
                        "Column '{}' has no declared kind, inferred {:?} from {}",
                        name,
                        inferred,
                        column.dtype()
                    );
                    inferred
                }
            };

            match kind {
                ColumnKind::Numeric => partition.numeric.push(name),
                ColumnKind::Categorical => partition.categorical.push(name),
            }
        }

        partition
    }
}
