use thiserror::Error;

use crate::data::model::{ColumnType, EntityKind};

/// Structural problems in a loaded table.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("{entity} data table must contain two header rows (column names, column types).")]
    MissingHeaderRows { entity: &'static str },

    #[error("{entity} data table must contain at least one row of data.")]
    NoDataRows { entity: &'static str },

    #[error("header rows disagree: {names} column names but {types} column types")]
    HeaderMismatch { names: usize, types: usize },

    #[error("unknown column type '{0}'")]
    UnknownColumnType(String),

    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),
}

/// A filter value that cannot be applied to its column.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("column '{column}' has type {expected}, filter value has type {found}")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        found: ColumnType,
    },

    #[error("column '{column}' is not a column of the {table} table")]
    UnknownColumn { column: String, table: EntityKind },
}

/// A background computation that did not produce a result.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("background computation '{task}' failed: {message}")]
pub struct WorkerError {
    pub task: String,
    pub message: String,
}
