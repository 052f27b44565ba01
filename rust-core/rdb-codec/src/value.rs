// SPDX-License-Identifier: PMPL-1.0-or-later
//
// RDB Codec - Decoded cell values
//
// `Value` is the closed set of primitive kinds a cell can decode to. Every
// encode site matches on it exhaustively, so a cell can never be handed a
// value its wire type does not understand without producing a
// `TypeMismatch` error.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Decimal
// ---------------------------------------------------------------------------

/// Fixed-point number with two fractional digits, stored as hundredths.
///
/// Decimal cells hold `round(value * 100)` as an int32 on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decimal(i64);

impl Decimal {
    /// Build a decimal from its count of hundredths (`1234` is `12.34`).
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Self(hundredths)
    }

    /// Round a float to the nearest hundredth. Returns `None` for values
    /// that are not finite or do not fit.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let scaled = (value * 100.0).round();
        if scaled < i64::MIN as f64 || scaled > i64::MAX as f64 {
            return None;
        }
        Some(Self(scaled as i64))
    }

    /// The raw count of hundredths.
    pub const fn hundredths(self) -> i64 {
        self.0
    }

    /// Lossy conversion to a float.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", magnitude / 100, magnitude % 100)
    }
}

/// A string could not be parsed as a two-digit fixed-point decimal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid decimal literal `{0}`")]
pub struct ParseDecimalError(String);

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseDecimalError(s.to_string());
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));

        if (whole.is_empty() && fraction.is_empty())
            || fraction.len() > 2
            || !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let mut cents: i64 = if fraction.is_empty() {
            0
        } else {
            fraction.parse().map_err(|_| invalid())?
        };
        if fraction.len() == 1 {
            cents *= 10;
        }

        let hundredths = whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(cents))
            .ok_or_else(invalid)?;
        Ok(Self(if negative { -hundredths } else { hundredths }))
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// TextEncoding
// ---------------------------------------------------------------------------

/// Character encoding applied to string cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// Strict UTF-8; undecodable bytes are a format error.
    #[default]
    #[serde(alias = "utf-8")]
    Utf8,
    /// ISO-8859-1: every byte maps to the code point of the same value.
    #[serde(alias = "iso-8859-1")]
    Latin1,
}

impl TextEncoding {
    /// Decode raw cell bytes into text.
    pub fn decode(self, bytes: &[u8]) -> Result<String, std::str::Utf8Error> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes).map(str::to_owned),
            Self::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }

    /// Encode text into raw cell bytes. On failure returns the first
    /// character the encoding cannot represent.
    pub fn encode(self, text: &str) -> Result<Vec<u8>, char> {
        match self {
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            Self::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).map_err(|_| c))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A decoded cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Single unsigned byte (also used for bit-vector members).
    Byte(u8),
    /// Raw byte blob (byte arrays, skipped regions).
    Bytes(Vec<u8>),
    /// Signed 16-bit integer.
    Short(i16),
    /// Unsigned 16-bit integer.
    UShort(u16),
    /// Signed 32-bit integer.
    Int(i32),
    /// Unsigned 32-bit integer.
    UInt(u32),
    /// Signed 64-bit integer.
    Long(i64),
    /// IEEE-754 single precision.
    Float(f32),
    /// IEEE-754 double precision.
    Double(f64),
    /// Two-digit fixed-point decimal.
    Decimal(Decimal),
    /// Calendar date from an 8-byte `yyyyMMdd` string.
    Date(NaiveDate),
    /// UTC instant from a seconds-since-epoch int32.
    Timestamp(DateTime<Utc>),
    /// Decoded string.
    Text(String),
}

impl Value {
    /// Short name of this value's kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Byte(_) => "byte",
            Self::Bytes(_) => "bytes",
            Self::Short(_) => "short",
            Self::UShort(_) => "ushort",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Decimal(_) => "decimal",
            Self::Date(_) => "date",
            Self::Timestamp(_) => "timestamp",
            Self::Text(_) => "text",
        }
    }

    /// The value as a signed integer, for integer kinds only.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Byte(v) => Some(i64::from(v)),
            Self::Short(v) => Some(i64::from(v)),
            Self::UShort(v) => Some(i64::from(v)),
            Self::Int(v) => Some(i64::from(v)),
            Self::UInt(v) => Some(i64::from(v)),
            Self::Long(v) => Some(v),
            _ => None,
        }
    }

    /// The value as a float, for every numeric kind.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float(v) => Some(f64::from(v)),
            Self::Double(v) => Some(v),
            Self::Decimal(v) => Some(v.to_f64()),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    /// The text of a string value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The bytes of a blob value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte(v) => write!(f, "{v}"),
            Self::Bytes(bytes) => f.write_str(&hex::encode(bytes)),
            Self::Short(v) => write!(f, "{v}"),
            Self::UShort(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y%m%d")),
            Self::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}
