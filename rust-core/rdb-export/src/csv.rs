// SPDX-License-Identifier: PMPL-1.0-or-later
//
// RDB Export - CSV documents
//
// One header line of visible cell names, then one line per data row. Fields
// are separated by ", ". Fields that contain a comma, a quote or a line
// break are wrapped in double quotes with embedded quotes doubled.

use rdb_codec::{Record, Row};

const SEPARATOR: &str = ", ";

/// Render every data row of `record`.
pub fn to_csv(record: &Record) -> String {
    let mut out = String::new();
    let names: Vec<String> = record.visible_names().into_iter().map(escape).collect();
    out.push_str(&names.join(SEPARATOR));
    out.push('\n');
    for row in record.rows() {
        out.push_str(&row_to_csv(row));
        out.push('\n');
    }
    out
}

/// Render the visible cells of one row. Unset cells are left empty.
pub fn row_to_csv(row: &Row) -> String {
    row.visible_cells()
        .map(|(_, value)| value.map(|v| escape(&v.to_string())).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
