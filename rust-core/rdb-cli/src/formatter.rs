// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! Output formatters for records and schemas.
//!
//! - **Table**: human-readable columns using `comfy-table`.
//! - **CSV**: the export crate's CSV document.
//! - **JSON**: pretty-printed array of row objects.

use std::fmt;

use comfy_table::{ContentArrangement, Table};
use rdb_codec::{ByteLength, Record, RecordSchema, WireType};

/// Available output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "Unknown format '{other}'. Valid formats: table, csv, json"
            )),
        }
    }
}

fn new_table(headers: Vec<String>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers);
    table
}

/// Visible cells of every data row as a table.
pub fn record_table(record: &Record) -> String {
    let headers = record
        .visible_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut table = new_table(headers);
    for row in record.rows() {
        let cells: Vec<String> = row
            .visible_cells()
            .map(|(_, value)| value.map(ToString::to_string).unwrap_or_default())
            .collect();
        table.add_row(cells);
    }
    table.to_string()
}

/// Structure metadata followed by one line per header and data cell.
pub fn schema_summary(schema: &RecordSchema) -> String {
    let info = schema.info();
    let mut out = String::new();
    let optional = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    out.push_str(&format!("Structure:    {}\n", display_or_dash(&info.name)));
    out.push_str(&format!("Author:       {}\n", display_or_dash(&info.author)));
    out.push_str(&format!("Version:      {}\n", display_or_dash(&info.version)));
    out.push_str(&format!("File:         {}\n", display_or_dash(&info.file_name)));
    out.push_str(&format!("Table:        {}\n", optional(&info.table_name)));
    out.push_str(&format!("Layout:       {:?}\n", schema.special_case()));
    out.push_str(&format!("Encoding:     {:?}\n", schema.encoding()));
    let width = |width: Option<usize>| width.map_or_else(|| "variable".to_string(), |w| format!("{w} bytes"));
    out.push_str(&format!(
        "Header width: {}\nRow width:    {}\n\n",
        width(schema.header_layout().fixed_width()),
        width(schema.data_layout().fixed_width())
    ));

    let mut table = new_table(
        ["Row", "#", "Name", "Type", "Length", "Dependency", "Bit", "Flags"]
            .into_iter()
            .map(str::to_string)
            .collect(),
    );
    for (kind, layout) in [("header", schema.header_layout()), ("data", schema.data_layout())] {
        for cell in layout.descriptors() {
            let length = match cell.length() {
                ByteLength::Fixed(n) => n.to_string(),
                ByteLength::Variable => "*".to_string(),
            };
            table.add_row(vec![
                kind.to_string(),
                cell.position().to_string(),
                cell.name().to_string(),
                format!("{:?}", cell.wire_type()),
                length,
                cell.dependency().unwrap_or("").to_string(),
                if cell.wire_type() == WireType::BitFromVector {
                    cell.bit_offset().to_string()
                } else {
                    String::new()
                },
                cell.flags().names().collect::<Vec<_>>().join(","),
            ]);
        }
    }
    out.push_str(&table.to_string());
    out
}

fn display_or_dash(text: &str) -> &str {
    if text.is_empty() {
        "-"
    } else {
        text
    }
}
