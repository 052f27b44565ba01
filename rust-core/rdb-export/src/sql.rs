// SPDX-License-Identifier: PMPL-1.0-or-later
//
// RDB Export - SQL statements
//
// Builds T-SQL statements for mirroring rows into a table. Cells flagged
// `sql_ignore` never appear in a statement. Column names are bracketed,
// text is single-quoted with embedded quotes doubled, and timestamps use
// the `yyyy-MM-dd HH:mm:ss.fff` literal form.

use rdb_codec::{CellDescriptor, CellFlags, RecordSchema, Row, RowLayout, Value};

use crate::error::{ExportError, ExportResult};

/// Render a single value as a SQL literal.
pub fn sql_literal(value: &Value) -> String {
    match value {
        Value::Text(text) => format!("'{}'", text.replace('\'', "''")),
        Value::Timestamp(ts) => format!("'{}'", ts.format("%Y-%m-%d %H:%M:%S%.3f")),
        Value::Date(date) => format!("'{}'", date.format("%Y-%m-%d")),
        Value::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
        other => other.to_string(),
    }
}

fn sql_cells(row: &Row) -> impl Iterator<Item = (&CellDescriptor, Option<&Value>)> {
    row.cells()
        .filter(|(cell, _)| !cell.has_flag(CellFlags::SQL_IGNORE))
}

fn literal_for(cell: &CellDescriptor, value: Option<&Value>) -> ExportResult<String> {
    value.map(sql_literal).ok_or_else(|| ExportError::UnsetValue {
        column: cell.name().to_string(),
    })
}

/// `INSERT INTO table ([a],[b]) values (1,'x')`
pub fn insert_statement(row: &Row, table: &str) -> ExportResult<String> {
    let mut columns = Vec::new();
    let mut values = Vec::new();
    for (cell, value) in sql_cells(row) {
        columns.push(format!("[{}]", cell.name()));
        values.push(literal_for(cell, value)?);
    }
    Ok(format!(
        "INSERT INTO {table} ({}) values ({})",
        columns.join(","),
        values.join(",")
    ))
}

/// `UPDATE table SET [a] = 1, [b] = 'x' where [key] = 5`
pub fn update_statement(row: &Row, table: &str, where_column: &str) -> ExportResult<String> {
    let key = row
        .layout()
        .descriptor(where_column)
        .ok_or_else(|| ExportError::UnknownColumn(where_column.to_string()))?;
    let key_value = literal_for(key, row.get_at(key.position()))?;

    let assignments = sql_cells(row)
        .map(|(cell, value)| -> ExportResult<String> {
            Ok(format!("[{}] = {}", cell.name(), literal_for(cell, value)?))
        })
        .collect::<ExportResult<Vec<_>>>()?;
    Ok(format!(
        "UPDATE {table} SET {} where [{where_column}] = {key_value}",
        assignments.join(", ")
    ))
}

/// `SELECT [a],[b] FROM dbo.table with (NOLOCK)`
pub fn select_statement(layout: &RowLayout, table: &str) -> String {
    let columns: Vec<String> = layout
        .descriptors()
        .iter()
        .filter(|cell| !cell.has_flag(CellFlags::SQL_IGNORE))
        .map(|cell| format!("[{}]", cell.name()))
        .collect();
    format!("SELECT {} FROM dbo.{table} with (NOLOCK)", columns.join(","))
}

/// The structure's own SELECT statement, or one generated from its table.
pub fn schema_select(schema: &RecordSchema) -> ExportResult<String> {
    let info = schema.info();
    if let Some(statement) = &info.select_statement {
        return Ok(statement.clone());
    }
    let table = table_name(schema)?;
    Ok(select_statement(schema.data_layout(), table))
}

/// The structure's table name.
pub fn table_name(schema: &RecordSchema) -> ExportResult<&str> {
    schema
        .info()
        .table_name
        .as_deref()
        .ok_or_else(|| ExportError::MissingTable(schema.info().name.clone()))
}
