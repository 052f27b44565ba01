// SPDX-License-Identifier: PMPL-1.0-or-later
//
// RDB Codec crate
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reads and writes RDB files: fixed-layout binary record files made of one
// header row followed by data rows. The layout of both row kinds is
// described by a schema (built in code or loaded from a JSON manifest); the
// codec turns bytes into typed, named values and back without changing a
// single byte of the on-disk format.
//
// # Architecture
//
//   scramble / sequence   wire-level primitives (bit permutation, ids)
//   value                 closed set of decoded value kinds
//   cell                  per-wire-type decode/encode contracts
//   descriptor            cell metadata and validated row layouts
//   row                   ordered traversal with dependency resolution
//   record                header + data rows, default and grouped layouts
//   manifest              JSON schema documents
//
// ## On-disk layout (all integers little-endian)
//
// ```text
// [header row]            default: 8 bytes yyyyMMdd + 120 bytes signature
//                                  + 4 bytes int32 row count
// [data rows]             RowCount rows back to back, or, in the grouped
//                         layout, RowCount groups of [i32 n][n rows]
// ```
//
// ## Usage
//
// ```no_run
// use std::sync::Arc;
// use rdb_codec::{CellDescriptor, Record, RecordSchema, SequenceGenerator, WireType};
//
// let schema = Arc::new(RecordSchema::new(vec![
//     CellDescriptor::new("Id", WireType::Int),
//     CellDescriptor::fixed_string("Name", 32),
// ]).unwrap());
//
// let mut sequence = SequenceGenerator::new();
// let mut record = Record::load(Arc::clone(&schema), "items.rdb", &mut sequence).unwrap();
// for row in record.rows_mut() {
//     row.set("Name", "renamed").unwrap();
// }
// record.save("items.rdb").unwrap();
// ```

pub mod cell;
pub mod cursor;
pub mod descriptor;
pub mod error;
pub mod manifest;
pub mod record;
pub mod row;
pub mod scramble;
pub mod sequence;
pub mod value;

// Re-export the primary public API for ergonomic imports.
pub use cell::{ValueClass, WireType};
pub use cursor::{ByteReader, ByteWriter};
pub use descriptor::{ByteLength, CellDescriptor, CellFlags, RowLayout};
pub use error::{ErrorKind, Location, RdbError, RdbResult};
pub use manifest::{CellFlag, CellManifest, SchemaManifest};
pub use record::{
    Direction, Record, RecordSchema, RecordSchemaBuilder, RowProcessor, SpecialCase,
    StructureInfo,
};
pub use row::{ReadContext, Row, WriteContext};
pub use scramble::{restore, scramble};
pub use sequence::SequenceGenerator;
pub use value::{Decimal, TextEncoding, Value};
