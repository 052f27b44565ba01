// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! rdb: inspect, export and rewrite RDB record files.
//!
//! Every command that touches a record takes a JSON schema manifest that
//! describes the file's layout. Logging goes to stderr and is controlled by
//! `RUST_LOG` (default `info`).

mod commands;
mod formatter;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rdb_export::SearchOperator;

use formatter::OutputFormat;

/// Version string, pulled from Cargo.toml at compile time.
const VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

/// rdb: schema-driven RDB record tool.
#[derive(Parser, Debug)]
#[command(name = "rdb", version = VERSION, about = "Inspect, export and rewrite RDB record files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Describe the structure defined by a schema manifest.
    Info {
        /// Schema manifest (JSON).
        schema: PathBuf,
    },

    /// Print the rows of a record file.
    Dump {
        /// Schema manifest (JSON).
        schema: PathBuf,
        /// Record file.
        file: PathBuf,
        /// Output format: table, csv or json.
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },

    /// Generate SQL statements for every row.
    Sql {
        /// Schema manifest (JSON).
        schema: PathBuf,
        /// Record file.
        file: PathBuf,
        /// Target table; defaults to the structure's table name.
        #[arg(long)]
        table: Option<String>,
        /// Emit UPDATE statements keyed on this column instead of INSERTs.
        #[arg(long, value_name = "COLUMN", conflicts_with = "select")]
        update: Option<String>,
        /// Print the SELECT statement for the structure instead.
        #[arg(long)]
        select: bool,
    },

    /// Find rows whose column matches the given operands.
    Search {
        /// Schema manifest (JSON).
        schema: PathBuf,
        /// Record file.
        file: PathBuf,
        /// Column to search.
        #[arg(long)]
        column: String,
        /// equal, not_equal, like, not_like, above, below or between.
        #[arg(long, default_value = "equal")]
        op: SearchOperator,
        /// Print row indices instead of values.
        #[arg(long)]
        indices: bool,
        /// Operands to compare against.
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Read a record and write it back out.
    Rewrite {
        /// Schema manifest (JSON).
        schema: PathBuf,
        /// Record file to read.
        input: PathBuf,
        /// Destination file.
        output: PathBuf,
        /// Store the current row (or group) count in the header first.
        #[arg(long)]
        sync_row_count: bool,
    },

    /// Scramble an integer the way encoded-int cells are stored.
    Scramble {
        /// Decimal, negative or 0x-prefixed hexadecimal value.
        #[arg(value_parser = parse_u32, allow_hyphen_values = true)]
        value: u32,
    },

    /// Undo `scramble`.
    Restore {
        /// Decimal, negative or 0x-prefixed hexadecimal value.
        #[arg(value_parser = parse_u32, allow_hyphen_values = true)]
        value: u32,
    },
}

/// Accept `123`, `-5` (as its 32-bit pattern) or `0x7b`.
fn parse_u32(text: &str) -> Result<u32, String> {
    let invalid = || format!("`{text}` is not a 32-bit integer");
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).map_err(|_| invalid());
    }
    if text.starts_with('-') {
        return text.parse::<i32>().map(|v| v as u32).map_err(|_| invalid());
    }
    text.parse::<u32>().map_err(|_| invalid())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let output = commands::run(cli.command)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Command {
        Cli::try_parse_from(args).unwrap().command
    }

    #[test]
    fn test_parse_dump_defaults_to_table() {
        match parse(&["rdb", "dump", "items.json", "items.rdb"]) {
            Command::Dump { format, .. } => assert_eq!(format, OutputFormat::Table),
            other => panic!("unexpected {other:?}"),
        }
        match parse(&["rdb", "dump", "s.json", "f.rdb", "--format", "json"]) {
            Command::Dump { format, .. } => assert_eq!(format, OutputFormat::Json),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_search() {
        match parse(&[
            "rdb", "search", "s.json", "f.rdb", "--column", "Id", "--op", "between", "1", "9",
        ]) {
            Command::Search {
                column, op, values, indices, ..
            } => {
                assert_eq!(column, "Id");
                assert_eq!(op, SearchOperator::Between);
                assert_eq!(values, vec!["1", "9"]);
                assert!(!indices);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_sql_select_conflicts_with_update() {
        assert!(Cli::try_parse_from([
            "rdb", "sql", "s.json", "f.rdb", "--select", "--update", "Id"
        ])
        .is_err());
        match parse(&["rdb", "sql", "s.json", "f.rdb", "--select"]) {
            Command::Sql { select, table, .. } => {
                assert!(select);
                assert!(table.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_search_requires_values() {
        assert!(Cli::try_parse_from(["rdb", "search", "s.json", "f.rdb", "--column", "Id"]).is_err());
    }

    #[test]
    fn test_parse_rewrite_flags() {
        match parse(&["rdb", "rewrite", "s.json", "in.rdb", "out.rdb", "--sync-row-count"]) {
            Command::Rewrite { sync_row_count, output, .. } => {
                assert!(sync_row_count);
                assert_eq!(output, PathBuf::from("out.rdb"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_scramble_values() {
        match parse(&["rdb", "scramble", "0x10"]) {
            Command::Scramble { value } => assert_eq!(value, 16),
            other => panic!("unexpected {other:?}"),
        }
        match parse(&["rdb", "restore", "-1"]) {
            Command::Restore { value } => assert_eq!(value, u32::MAX),
            other => panic!("unexpected {other:?}"),
        }
        assert!(Cli::try_parse_from(["rdb", "scramble", "nope"]).is_err());
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let result = Cli::try_parse_from([
            "rdb", "search", "s.json", "f.rdb", "--column", "Id", "--op", "sideways", "1",
        ]);
        assert!(result.is_err());
    }
}
