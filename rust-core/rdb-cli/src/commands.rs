// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! Command execution. Each command returns the text to print so the
//! handlers can be exercised without capturing stdout.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rdb_codec::{restore, scramble, Record, RecordSchema, SchemaManifest, SequenceGenerator};
use rdb_export::{csv, json, search, sql, SearchResult, SearchReturn};
use tracing::info;

use crate::formatter::{self, OutputFormat};
use crate::Command;

/// Dispatch a parsed command.
pub fn run(command: Command) -> Result<String> {
    match command {
        Command::Info { schema } => {
            let schema = load_schema(&schema)?;
            Ok(formatter::schema_summary(&schema))
        }
        Command::Dump { schema, file, format } => {
            let record = load_record(&schema, &file)?;
            dump(&record, format)
        }
        Command::Sql {
            schema,
            file,
            table,
            update,
            select,
        } => {
            let record = load_record(&schema, &file)?;
            if select {
                return select_statement(&record, table.as_deref());
            }
            sql_statements(&record, table.as_deref(), update.as_deref())
        }
        Command::Search {
            schema,
            file,
            column,
            op,
            indices,
            values,
        } => {
            let record = load_record(&schema, &file)?;
            let operands: Vec<&str> = values.iter().map(String::as_str).collect();
            let returns = if indices {
                SearchReturn::Indices
            } else {
                SearchReturn::Values
            };
            let result = search(&record, &column, &operands, op, returns)
                .with_context(|| format!("search on column `{column}` failed"))?;
            Ok(render_search(&result))
        }
        Command::Rewrite {
            schema,
            input,
            output,
            sync_row_count,
        } => rewrite(&schema, &input, &output, sync_row_count),
        Command::Scramble { value } => Ok(format!("{0} (0x{0:08x})", scramble(value))),
        Command::Restore { value } => Ok(format!("{0} (0x{0:08x})", restore(value))),
    }
}

fn load_schema(path: &Path) -> Result<Arc<RecordSchema>> {
    let schema = SchemaManifest::from_path(path)
        .with_context(|| format!("failed to read schema manifest {}", path.display()))?
        .into_schema()
        .with_context(|| format!("invalid schema in {}", path.display()))?;
    Ok(Arc::new(schema))
}

fn load_record(schema: &Path, file: &Path) -> Result<Record> {
    let schema = load_schema(schema)?;
    let mut sequence = SequenceGenerator::new();
    let record = Record::load(schema, file, &mut sequence)
        .with_context(|| format!("failed to decode {}", file.display()))?;
    info!(file = %file.display(), rows = record.rows().len(), "Record loaded");
    Ok(record)
}

fn dump(record: &Record, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(formatter::record_table(record)),
        OutputFormat::Csv => Ok(csv::to_csv(record)),
        OutputFormat::Json => {
            let document = json::to_json(record)?;
            Ok(serde_json::to_string_pretty(&document)?)
        }
    }
}

fn sql_statements(record: &Record, table: Option<&str>, update: Option<&str>) -> Result<String> {
    let table = match table {
        Some(table) => table,
        None => sql::table_name(record.schema())?,
    };
    let statements = record
        .rows()
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let statement = match update {
                Some(column) => sql::update_statement(row, table, column),
                None => sql::insert_statement(row, table),
            };
            statement.with_context(|| format!("row {index}"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(statements.join("\n"))
}

fn select_statement(record: &Record, table: Option<&str>) -> Result<String> {
    match table {
        Some(table) => Ok(sql::select_statement(record.schema().data_layout(), table)),
        None => Ok(sql::schema_select(record.schema())?),
    }
}

fn render_search(result: &SearchResult<'_>) -> String {
    match result {
        SearchResult::Values(values) => values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"),
        SearchResult::Indices(indices) => indices
            .iter()
            .map(|(row, cell)| format!("row {row}, cell {cell}"))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn rewrite(schema: &Path, input: &Path, output: &Path, sync_row_count: bool) -> Result<String> {
    let mut record = load_record(schema, input)?;
    if sync_row_count {
        record.sync_row_count()?;
    }
    record
        .save(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    Ok(format!(
        "Wrote {} rows to {}",
        record.rows().len(),
        output.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdb_export::SearchOperator;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"{
        "name": "ItemList",
        "table_name": "ItemData",
        "cells": [
            { "name": "Id", "type": "int" },
            { "name": "Name", "type": "string", "length": 8 }
        ]
    }"#;

    fn name_bytes(name: &str) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        bytes
    }

    /// Write a manifest plus a 2-row record and return their paths.
    fn fixture() -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let schema = dir.path().join("items.json");
        std::fs::write(&schema, MANIFEST).unwrap();

        let mut bytes = b"20240102".to_vec();
        bytes.extend_from_slice(&[0u8; 120]);
        bytes.extend_from_slice(&2i32.to_le_bytes());
        for (id, name) in [(7i32, "apple"), (9, "pear")] {
            bytes.extend_from_slice(&id.to_le_bytes());
            bytes.extend_from_slice(&name_bytes(name));
        }
        let file = dir.path().join("items.rdb");
        std::fs::write(&file, bytes).unwrap();
        (dir, schema, file)
    }

    #[test]
    fn test_info_lists_cells() {
        let (_dir, schema, _) = fixture();
        let out = run(Command::Info { schema }).unwrap();
        assert!(out.contains("ItemList"));
        assert!(out.contains("Name"));
        assert!(out.contains("RowCount"));
    }

    #[test]
    fn test_dump_csv() {
        let (_dir, schema, file) = fixture();
        let out = run(Command::Dump {
            schema,
            file,
            format: OutputFormat::Csv,
        })
        .unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec!["Id, Name", "7, apple", "9, pear"]);
    }

    #[test]
    fn test_dump_json() {
        let (_dir, schema, file) = fixture();
        let out = run(Command::Dump {
            schema,
            file,
            format: OutputFormat::Json,
        })
        .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[1]["Name"], "pear");
    }

    #[test]
    fn test_sql_uses_manifest_table() {
        let (_dir, schema, file) = fixture();
        let out = run(Command::Sql {
            schema,
            file,
            table: None,
            update: None,
            select: false,
        })
        .unwrap();
        assert_eq!(out.lines().count(), 2);
        assert!(out.lines().all(|line| line.contains("ItemData")));
    }

    #[test]
    fn test_sql_select() {
        let (_dir, schema, file) = fixture();
        let out = run(Command::Sql {
            schema,
            file,
            table: Some("Items".to_string()),
            update: None,
            select: true,
        })
        .unwrap();
        assert_eq!(out, "SELECT [Id],[Name] FROM dbo.Items with (NOLOCK)");
    }

    #[test]
    fn test_search_indices() {
        let (_dir, schema, file) = fixture();
        let out = run(Command::Search {
            schema,
            file,
            column: "Name".to_string(),
            op: SearchOperator::Like,
            indices: true,
            values: vec!["ear".to_string()],
        })
        .unwrap();
        assert_eq!(out, "row 1, cell 1");
    }

    #[test]
    fn test_rewrite_is_byte_identical() {
        let (dir, schema, file) = fixture();
        let output = dir.path().join("copy.rdb");
        run(Command::Rewrite {
            schema,
            input: file.clone(),
            output: output.clone(),
            sync_row_count: true,
        })
        .unwrap();
        let source = std::fs::read(&file).unwrap();
        let copy = std::fs::read(&output).unwrap();
        assert_eq!(source.len(), copy.len());
        // Only the signature is rewritten.
        assert_eq!(source[..8], copy[..8]);
        assert_eq!(source[128..], copy[128..]);
    }

    #[test]
    fn test_missing_schema_reports_path() {
        let error = run(Command::Info {
            schema: "/nonexistent/items.json".into(),
        })
        .unwrap_err();
        assert!(format!("{error:#}").contains("/nonexistent/items.json"));
    }

    #[test]
    fn test_scramble_restore() {
        let scrambled = run(Command::Scramble { value: 1 }).unwrap();
        let value: u32 = scrambled.split(' ').next().unwrap().parse().unwrap();
        let restored = run(Command::Restore { value }).unwrap();
        assert!(restored.starts_with("1 "));
    }
}
