// SPDX-License-Identifier: PMPL-1.0-or-later
//
// RDB Export - JSON documents

use rdb_codec::{Record, Row};
use serde_json::{Map, Value as JsonValue};

use crate::error::ExportResult;

/// One JSON object per data row, keyed by visible cell name. Unset cells
/// become `null`.
pub fn to_json(record: &Record) -> ExportResult<JsonValue> {
    record
        .rows()
        .iter()
        .map(row_to_json)
        .collect::<ExportResult<Vec<_>>>()
        .map(JsonValue::Array)
}

/// The visible cells of one row as a JSON object.
pub fn row_to_json(row: &Row) -> ExportResult<JsonValue> {
    let mut object = Map::new();
    for (cell, value) in row.visible_cells() {
        object.insert(cell.name().to_string(), serde_json::to_value(value)?);
    }
    Ok(JsonValue::Object(object))
}
