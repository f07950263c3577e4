//! Error types for masterlist-core
//!
//! Covers:
//! - Table errors propagated from masterlist-io (missing columns, stacking)
//! - Flag columns of the wrong type
//! - Column name collisions between merged catalogues
//! - Invalid configuration

use masterlist_io::{Catalogue, ColumnType, IoError};
use thiserror::Error;

/// Main error type for deduplication and merge operations
#[derive(Error, Debug)]
pub enum MasterlistError {
    /// Table lookup or assembly failed
    #[error("Table error: {0}")]
    Table(#[from] IoError),

    /// A column exists but holds the wrong type
    #[error("Type mismatch for column '{column}': expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    /// Both catalogues of a merge carry a non-position column of this name
    #[error("Column '{column}' would collide in the merged catalogue")]
    ColumnCollision { column: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MasterlistError {
    /// Whether this error reports a missing column
    pub fn is_missing_column(&self) -> bool {
        matches!(self, MasterlistError::Table(IoError::ColumnNotFound(_)))
    }
}

/// Result type alias for masterlist operations
pub type MasterlistResult<T> = Result<T, MasterlistError>;

/// Validation utilities
pub mod validation {
    use super::*;

    /// Validate that a column exists
    pub fn validate_column_exists(catalogue: &Catalogue, column: &str) -> MasterlistResult<()> {
        catalogue.column(column)?;
        Ok(())
    }

    /// Validate that a column, if present, is boolean
    ///
    /// Returns whether the column exists.
    pub fn validate_optional_bool(catalogue: &Catalogue, column: &str) -> MasterlistResult<bool> {
        match catalogue.column(column) {
            Ok(c) if c.dtype() == ColumnType::Bool => Ok(true),
            Ok(c) => Err(MasterlistError::TypeMismatch {
                column: column.to_string(),
                expected: ColumnType::Bool.to_string(),
                actual: c.dtype().to_string(),
            }),
            Err(_) => Ok(false),
        }
    }

    /// Validate that the columns of `second` other than `excluded` are not
    /// already used by `first` or by `reserved`
    pub fn validate_disjoint_columns(
        first: &Catalogue,
        second: &Catalogue,
        excluded: &[&str],
        reserved: &[&str],
    ) -> MasterlistResult<()> {
        let clash = second
            .column_names()
            .into_iter()
            .filter(|name| !excluded.contains(name))
            .find(|name| first.has_column(name) || reserved.contains(name));

        match clash {
            Some(column) => Err(MasterlistError::ColumnCollision {
                column: column.to_string(),
            }),
            None => Ok(()),
        }
    }
}
