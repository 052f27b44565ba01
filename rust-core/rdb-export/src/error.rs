// SPDX-License-Identifier: PMPL-1.0-or-later
//
// RDB Export - Error types

use rdb_codec::RdbError;
use thiserror::Error;

use crate::search::SearchOperator;

/// Errors raised while exporting or searching records.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The underlying record could not be accessed.
    #[error(transparent)]
    Codec(#[from] RdbError),

    /// No data cell with this name exists.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// A SQL statement was requested but the structure names no table.
    #[error("No table name configured for structure `{0}`")]
    MissingTable(String),

    /// A cell that should be exported holds no value.
    #[error("Column `{column}` has no value")]
    UnsetValue {
        /// The empty cell.
        column: String,
    },

    /// A search operand cannot be compared with the column's values.
    #[error("`{operand}` is not a valid {expected} for column `{column}`")]
    InvalidOperand {
        /// Column being searched.
        column: String,
        /// The operand as given.
        operand: String,
        /// What the column's values look like.
        expected: &'static str,
    },

    /// The operator was given the wrong number of operands.
    #[error("{operator} expects {expected} operand(s), got {found}")]
    OperandCount {
        /// The search operator.
        operator: SearchOperator,
        /// Required operand count, in words.
        expected: &'static str,
        /// Number of operands supplied.
        found: usize,
    },

    /// A JSON document could not be produced.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for export results.
pub type ExportResult<T> = Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_count_display() {
        let error = ExportError::OperandCount {
            operator: SearchOperator::Between,
            expected: "exactly 2",
            found: 3,
        };
        assert_eq!(error.to_string(), "between expects exactly 2 operand(s), got 3");
    }

    #[test]
    fn test_codec_errors_pass_through() {
        let error = ExportError::from(RdbError::UnknownCell("Id".into()));
        assert_eq!(error.to_string(), "Unknown cell: Id");
    }
}
