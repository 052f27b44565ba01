// SPDX-License-Identifier: PMPL-1.0-or-later
//
// RDB Export - Column search
//
// Linear scan over one data column. Operands arrive as text and are parsed
// according to the column's value class before comparison; `like` and
// `not_like` match substrings of the values' textual form instead.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rdb_codec::{Record, Value, ValueClass};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::error::{ExportError, ExportResult};

/// Comparison applied to each value of the searched column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOperator {
    /// Equal to any operand.
    Equal,
    /// Different from every operand.
    NotEqual,
    /// Textual form contains any operand.
    Like,
    /// Textual form contains no operand.
    NotLike,
    /// Greater than any operand.
    Above,
    /// Less than any operand.
    Below,
    /// Within the inclusive range of exactly two operands.
    Between,
}

impl fmt::Display for SearchOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Equal => "equal",
            Self::NotEqual => "not_equal",
            Self::Like => "like",
            Self::NotLike => "not_like",
            Self::Above => "above",
            Self::Below => "below",
            Self::Between => "between",
        };
        f.write_str(name)
    }
}

/// An unrecognised operator name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown search operator `{0}`; expected equal, not_equal, like, not_like, above, below or between")]
pub struct ParseOperatorError(String);

impl FromStr for SearchOperator {
    type Err = ParseOperatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "equal" | "eq" | "=" | "==" => Ok(Self::Equal),
            "not_equal" | "ne" | "!=" | "<>" => Ok(Self::NotEqual),
            "like" => Ok(Self::Like),
            "not_like" => Ok(Self::NotLike),
            "above" | "gt" | ">" => Ok(Self::Above),
            "below" | "lt" | "<" => Ok(Self::Below),
            "between" => Ok(Self::Between),
            _ => Err(ParseOperatorError(s.to_string())),
        }
    }
}

/// What a search hands back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchReturn {
    /// The matching values.
    #[default]
    Values,
    /// `(row index, cell position)` of each match.
    Indices,
}

/// Result of [`search`].
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResult<'a> {
    Values(Vec<&'a Value>),
    Indices(Vec<(usize, usize)>),
}

impl SearchResult<'_> {
    pub fn len(&self) -> usize {
        match self {
            Self::Values(values) => values.len(),
            Self::Indices(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A parsed operand, typed like the column it is compared against.
#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Integer(i64),
    Real(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Bytes(Vec<u8>),
}

impl Operand {
    fn parse(raw: &str, class: ValueClass, column: &str) -> ExportResult<Self> {
        let invalid = |expected: &'static str| ExportError::InvalidOperand {
            column: column.to_string(),
            operand: raw.to_string(),
            expected,
        };
        let trimmed = raw.trim();
        match class {
            ValueClass::Integer => trimmed
                .parse()
                .map(Self::Integer)
                .map_err(|_| invalid("integer")),
            ValueClass::Real => trimmed
                .parse()
                .map(Self::Real)
                .map_err(|_| invalid("number")),
            ValueClass::Text => Ok(Self::Text(raw.to_string())),
            ValueClass::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y%m%d"))
                .map(Self::Date)
                .map_err(|_| invalid("date (yyyy-MM-dd)")),
            ValueClass::Timestamp => NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
                .map(|naive| naive.and_utc())
                .ok()
                .or_else(|| {
                    trimmed
                        .parse::<i64>()
                        .ok()
                        .and_then(|secs| DateTime::from_timestamp(secs, 0))
                })
                .map(Self::Timestamp)
                .ok_or_else(|| invalid("timestamp (yyyy-MM-dd HH:mm:ss)")),
            ValueClass::Binary => decode_hex(trimmed)
                .map(Self::Bytes)
                .ok_or_else(|| invalid("hex string")),
        }
    }

    /// Order `value` relative to this operand, if they are comparable.
    fn compare(&self, value: &Value) -> Option<Ordering> {
        match (self, value) {
            (Self::Integer(operand), _) => value.as_i64().map(|v| v.cmp(operand)),
            (Self::Real(operand), _) => value.as_f64().and_then(|v| v.partial_cmp(operand)),
            (Self::Text(operand), Value::Text(text)) => Some(text.as_str().cmp(operand)),
            (Self::Date(operand), Value::Date(date)) => Some(date.cmp(operand)),
            (Self::Timestamp(operand), Value::Timestamp(ts)) => Some(ts.cmp(operand)),
            (Self::Bytes(operand), Value::Bytes(bytes)) => Some(bytes.as_slice().cmp(operand)),
            _ => None,
        }
    }
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    hex::decode(text.strip_prefix("0x").unwrap_or(text)).ok()
}

/// Scan the data column `column` of `record` for values matching
/// `operator` against `operands`.
pub fn search<'a>(
    record: &'a Record,
    column: &str,
    operands: &[&str],
    operator: SearchOperator,
    returns: SearchReturn,
) -> ExportResult<SearchResult<'a>> {
    let cell = record
        .schema()
        .data_layout()
        .descriptor(column)
        .ok_or_else(|| ExportError::UnknownColumn(column.to_string()))?;

    match operator {
        SearchOperator::Between if operands.len() != 2 => {
            return Err(ExportError::OperandCount {
                operator,
                expected: "exactly 2",
                found: operands.len(),
            });
        }
        _ if operands.is_empty() => {
            return Err(ExportError::OperandCount {
                operator,
                expected: "at least 1",
                found: 0,
            });
        }
        _ => {}
    }

    let parsed = match operator {
        SearchOperator::Like | SearchOperator::NotLike => Vec::new(),
        _ => operands
            .iter()
            .map(|raw| Operand::parse(raw, cell.wire_type().class(), column))
            .collect::<ExportResult<Vec<_>>>()?,
    };

    let is_match = |value: &Value| -> bool {
        match operator {
            SearchOperator::Equal => parsed.iter().any(|op| op.compare(value) == Some(Ordering::Equal)),
            SearchOperator::NotEqual => parsed.iter().all(|op| op.compare(value) != Some(Ordering::Equal)),
            SearchOperator::Like => {
                let text = value.to_string();
                operands.iter().any(|needle| text.contains(needle))
            }
            SearchOperator::NotLike => {
                let text = value.to_string();
                !operands.iter().any(|needle| text.contains(needle))
            }
            SearchOperator::Above => parsed.iter().any(|op| op.compare(value) == Some(Ordering::Greater)),
            SearchOperator::Below => parsed.iter().any(|op| op.compare(value) == Some(Ordering::Less)),
            SearchOperator::Between => match (parsed.first(), parsed.get(1)) {
                (Some(min), Some(max)) => {
                    matches!(min.compare(value), Some(Ordering::Greater | Ordering::Equal))
                        && matches!(max.compare(value), Some(Ordering::Less | Ordering::Equal))
                }
                _ => false,
            },
        }
    };

    let position = cell.position();
    let hits = record.column(column)?.filter(|(_, value)| is_match(*value));
    let result = match returns {
        SearchReturn::Values => SearchResult::Values(hits.map(|(_, value)| value).collect()),
        SearchReturn::Indices => {
            SearchResult::Indices(hits.map(|(row, _)| (row, position)).collect())
        }
    };
    debug!(column, %operator, matches = result.len(), "Search complete");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rdb_codec::{CellDescriptor, Decimal, RecordSchema, WireType};

    use super::*;

    fn record() -> Record {
        let schema = RecordSchema::new(vec![
            CellDescriptor::new("Id", WireType::Int),
            CellDescriptor::fixed_string("Name", 16),
            CellDescriptor::new("Price", WireType::Decimal),
            CellDescriptor::new("Added", WireType::DateString),
        ])
        .unwrap();
        let mut record = Record::new(Arc::new(schema));
        let items = [
            (1, "Iron Sword", 1000, (2020, 1, 5)),
            (2, "Wooden Shield", 250, (2021, 6, 1)),
            (3, "Iron Helm", 400, (2022, 3, 9)),
        ];
        for (id, name, cents, (y, m, d)) in items {
            let mut row = record.new_row();
            row.set("Id", id).unwrap();
            row.set("Name", name).unwrap();
            row.set("Price", Decimal::from_hundredths(cents)).unwrap();
            row.set("Added", Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap()))
                .unwrap();
            record.push_row(row).unwrap();
        }
        record
    }

    fn ids(result: SearchResult<'_>) -> Vec<usize> {
        match result {
            SearchResult::Indices(indices) => indices.into_iter().map(|(row, _)| row).collect(),
            SearchResult::Values(_) => panic!("expected indices"),
        }
    }

    #[test]
    fn test_equal_returns_values() {
        let record = record();
        let result = search(&record, "Id", &["2", "3"], SearchOperator::Equal, SearchReturn::Values).unwrap();
        assert_eq!(result, SearchResult::Values(vec![&Value::Int(2), &Value::Int(3)]));
    }

    #[test]
    fn test_not_equal_excludes_every_operand() {
        let record = record();
        let result = search(&record, "Id", &["1", "3"], SearchOperator::NotEqual, SearchReturn::Indices).unwrap();
        assert_eq!(ids(result), vec![1]);
    }

    #[test]
    fn test_like_and_not_like() {
        let record = record();
        let like = search(&record, "Name", &["Iron"], SearchOperator::Like, SearchReturn::Indices).unwrap();
        assert_eq!(ids(like), vec![0, 2]);
        let not_like = search(&record, "Name", &["Iron"], SearchOperator::NotLike, SearchReturn::Indices).unwrap();
        assert_eq!(ids(not_like), vec![1]);
    }

    #[test]
    fn test_ordering_operators() {
        let record = record();
        let above = search(&record, "Price", &["3.00"], SearchOperator::Above, SearchReturn::Indices).unwrap();
        assert_eq!(ids(above), vec![0, 2]);
        let below = search(&record, "Added", &["2021-01-01"], SearchOperator::Below, SearchReturn::Indices).unwrap();
        assert_eq!(ids(below), vec![0]);
    }

    #[test]
    fn test_between_is_inclusive() {
        let record = record();
        let result = search(&record, "Id", &["2", "3"], SearchOperator::Between, SearchReturn::Indices).unwrap();
        match result {
            SearchResult::Indices(indices) => assert_eq!(indices, vec![(1, 0), (2, 0)]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_between_requires_two_operands() {
        let record = record();
        let error = search(&record, "Id", &["1"], SearchOperator::Between, SearchReturn::Values).unwrap_err();
        assert!(matches!(error, ExportError::OperandCount { found: 1, .. }));
    }

    #[test]
    fn test_invalid_operand_and_column() {
        let record = record();
        let error = search(&record, "Id", &["abc"], SearchOperator::Equal, SearchReturn::Values).unwrap_err();
        assert!(matches!(error, ExportError::InvalidOperand { expected: "integer", .. }));
        let error = search(&record, "Nope", &["1"], SearchOperator::Equal, SearchReturn::Values).unwrap_err();
        assert!(matches!(error, ExportError::UnknownColumn(_)));
    }

    #[test]
    fn test_operator_parsing() {
        assert_eq!("not-like".parse::<SearchOperator>().unwrap(), SearchOperator::NotLike);
        assert_eq!(">".parse::<SearchOperator>().unwrap(), SearchOperator::Above);
        assert!("sideways".parse::<SearchOperator>().is_err());
        assert_eq!(SearchOperator::NotEqual.to_string(), "not_equal");
    }

    #[test]
    fn test_hex_operands() {
        assert_eq!(decode_hex("0x00ff"), Some(vec![0, 0xff]));
        assert_eq!(decode_hex("abc"), None);
        assert_eq!(decode_hex("zz"), None);
    }
}
