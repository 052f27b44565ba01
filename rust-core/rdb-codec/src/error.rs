// SPDX-License-Identifier: PMPL-1.0-or-later
//
// RDB Codec - Error types
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Every failure aborts the current read or write outright. Errors carry the
// cell name, byte offset and (for data rows) the row index so that the
// offending field can be located in the file.

use std::fmt;

use thiserror::Error;

/// Where in a record an error was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Name of the cell being decoded or encoded.
    pub cell: String,
    /// Byte offset of the cursor when the error was raised.
    pub offset: usize,
    /// Index of the data row, or `None` for the header / a standalone row.
    pub row: Option<usize>,
}

impl Location {
    /// Build a location for a cell at the given cursor offset.
    pub fn new(cell: impl Into<String>, offset: usize) -> Self {
        Self {
            cell: cell.into(),
            offset,
            row: None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell `{}` at offset {}", self.cell, self.offset)?;
        if let Some(row) = self.row {
            write!(f, " (row {row})")?;
        }
        Ok(())
    }
}

/// Coarse classification of [`RdbError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid schema: unknown or misordered dependency, bad length, duplicate name.
    Schema,
    /// The buffer does not hold what the schema describes.
    Format,
    /// A value does not fit its on-disk representation.
    Encoding,
    /// A value of the wrong primitive type was supplied for a cell.
    TypeMismatch,
    /// A named cell does not exist in the row.
    Lookup,
    /// Filesystem or manifest parsing failure.
    Io,
}

/// Errors that can occur while building schemas or reading/writing records.
#[derive(Debug, Error)]
pub enum RdbError {
    /// A cell descriptor is invalid or references a dependency that cannot
    /// be resolved at the point it is needed.
    #[error("Schema error at cell `{cell}`: {reason}")]
    Schema {
        /// The offending cell.
        cell: String,
        /// Human readable description of the violation.
        reason: String,
    },

    /// The input buffer is truncated or contains data the cell cannot decode.
    #[error("Format error at {location}: {reason}")]
    Format {
        /// Where the malformed data was found.
        location: Location,
        /// What was wrong with it.
        reason: String,
    },

    /// A value cannot be represented in its cell's on-disk width.
    #[error("Encoding error at {location}: {reason}")]
    Encoding {
        /// The cell being written.
        location: Location,
        /// What did not fit.
        reason: String,
    },

    /// The value held for a cell does not match the cell's wire type.
    #[error("Type mismatch at {location}: expected {expected}, found {found}")]
    TypeMismatch {
        /// The cell being written or resolved.
        location: Location,
        /// The value kind the wire type requires.
        expected: &'static str,
        /// The value kind that was actually present.
        found: &'static str,
    },

    /// No cell with this name exists in the row layout.
    #[error("Unknown cell: {0}")]
    UnknownCell(String),

    /// An I/O error occurred while loading or saving a record file.
    #[error("RDB I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The schema manifest could not be parsed.
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl RdbError {
    /// Shorthand for a schema violation on `cell`.
    pub fn schema(cell: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            cell: cell.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for malformed input at `location`.
    pub fn format(location: Location, reason: impl Into<String>) -> Self {
        Self::Format {
            location,
            reason: reason.into(),
        }
    }

    /// Shorthand for an unrepresentable value at `location`.
    pub fn encoding(location: Location, reason: impl Into<String>) -> Self {
        Self::Encoding {
            location,
            reason: reason.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Schema { .. } => ErrorKind::Schema,
            Self::Format { .. } => ErrorKind::Format,
            Self::Encoding { .. } => ErrorKind::Encoding,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::UnknownCell(_) => ErrorKind::Lookup,
            Self::Io(_) | Self::Manifest(_) => ErrorKind::Io,
        }
    }

    /// The location this error refers to, if it has one.
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::Format { location, .. }
            | Self::Encoding { location, .. }
            | Self::TypeMismatch { location, .. } => Some(location),
            _ => None,
        }
    }

    /// Attach a data row index to the error's location. An index that is
    /// already present is kept.
    pub fn with_row(mut self, row: usize) -> Self {
        if let Self::Format { location, .. }
        | Self::Encoding { location, .. }
        | Self::TypeMismatch { location, .. } = &mut self
        {
            location.row.get_or_insert(row);
        }
        self
    }
}

/// Convenience type alias for codec results.
pub type RdbResult<T> = Result<T, RdbError>;
