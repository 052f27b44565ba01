// SPDX-License-Identifier: PMPL-1.0-or-later
//
// RDB Export crate
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Turns decoded records into text: CSV documents, SQL statements for
// mirroring rows into a database table, and JSON. Also provides a linear
// search over one column of a loaded record.
//
// Everything here works from the read-only views `rdb-codec` exposes
// (visible cells, the column iterator, wire type classes); nothing in this
// crate touches the binary format.

pub mod csv;
pub mod error;
pub mod json;
pub mod search;
pub mod sql;

pub use error::{ExportError, ExportResult};
pub use search::{search, SearchOperator, SearchResult, SearchReturn};
