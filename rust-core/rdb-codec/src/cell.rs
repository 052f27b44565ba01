// SPDX-License-Identifier: PMPL-1.0-or-later
//
// RDB Codec - Cell wire types
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Each wire type fixes how a cell's bytes are laid out on disk. All
// multi-byte numerics are little-endian.
//
//   Byte            1   raw byte
//   ByteArray       N   raw bytes
//   Short/UShort    2   int16 / uint16
//   Int/UInt        4   int32 / uint32
//   Long            8   int64
//   Float/Double    4/8 IEEE-754
//   Decimal         4   int32 hundredths
//   DateString      8   ASCII "yyyyMMdd"
//   DateTime        4   int32 seconds since 1970-01-01T00:00:00Z
//   EncodedInt      4   int32 passed through the scramble permutation
//   FixedString     N   NUL-terminated, zero-padded to N
//   LengthString    *   width taken from an earlier cell in the same row
//   HeaderLength..  *   width taken from a cell of the header row
//   BitVector       4   int32 rebuilt from its member bits on write
//   BitFromVector   0   one bit of the parent vector
//   Skip            N   zeros
//   CopyInt32       4   duplicate of an earlier int cell
//   SequenceId      0/4 generated on read, written as int32
//
// Cells whose value comes from another cell (BitFromVector, CopyInt32,
// SequenceId) and cells whose width is resolved at runtime are dispatched by
// the row; this module only handles a cell once its width is known.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Location, RdbError, RdbResult};
use crate::scramble::{restore_i32, scramble_i32};
use crate::value::{Decimal, TextEncoding, Value};

// ---------------------------------------------------------------------------
// WireType
// ---------------------------------------------------------------------------

/// On-disk encoding of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireType {
    /// One raw byte.
    Byte,
    /// Fixed number of raw bytes.
    ByteArray,
    /// Signed 16-bit integer.
    #[serde(alias = "int16")]
    Short,
    /// Unsigned 16-bit integer.
    #[serde(rename = "ushort", alias = "uint16", alias = "uint_16")]
    UShort,
    /// Signed 32-bit integer.
    #[serde(alias = "int32", alias = "string_len")]
    Int,
    /// Unsigned 32-bit integer.
    #[serde(rename = "uint", alias = "uint32")]
    UInt,
    /// Signed 64-bit integer.
    #[serde(alias = "int64")]
    Long,
    /// Single precision float.
    #[serde(alias = "single", alias = "float32")]
    Float,
    /// Double precision float.
    #[serde(alias = "float64")]
    Double,
    /// Fixed-point decimal stored as int32 hundredths.
    Decimal,
    /// Date stored as 8 ASCII digits.
    #[serde(alias = "datestring")]
    DateString,
    /// Timestamp stored as int32 seconds since the Unix epoch.
    #[serde(alias = "datetime")]
    DateTime,
    /// Scrambled int32.
    #[serde(alias = "encoded_int32")]
    EncodedInt,
    /// NUL-terminated string in a fixed-width field.
    #[serde(alias = "string")]
    FixedString,
    /// String whose width is an earlier integer cell of the same row.
    #[serde(alias = "string_by_len")]
    LengthString,
    /// String whose width is an integer cell of the header row.
    #[serde(alias = "string_by_header_ref")]
    HeaderLengthString,
    /// int32 bit vector owning a set of member bits.
    BitVector,
    /// A single bit of a bit vector; occupies no bytes.
    BitFromVector,
    /// Padding that is skipped on read and zero-filled on write.
    Skip,
    /// int32 duplicating an earlier cell of the same row.
    CopyInt32,
    /// Identity generated by the sequence generator on read.
    #[serde(alias = "sid")]
    SequenceId,
}

/// Broad value category of a wire type, used by export collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueClass {
    /// Whole numbers of any width.
    Integer,
    /// Floats and fixed-point decimals.
    Real,
    /// Strings.
    Text,
    /// Calendar dates.
    Date,
    /// Points in time.
    Timestamp,
    /// Raw bytes.
    Binary,
}

impl WireType {
    /// Width this type always occupies, or `None` when the width comes from
    /// the descriptor or a dependency.
    pub fn intrinsic_width(self) -> Option<usize> {
        match self {
            Self::BitFromVector => Some(0),
            Self::Byte => Some(1),
            Self::Short | Self::UShort => Some(2),
            Self::Int
            | Self::UInt
            | Self::Float
            | Self::Decimal
            | Self::DateTime
            | Self::EncodedInt
            | Self::BitVector
            | Self::CopyInt32
            | Self::SequenceId => Some(4),
            Self::Long | Self::Double | Self::DateString => Some(8),
            Self::ByteArray
            | Self::FixedString
            | Self::Skip
            | Self::LengthString
            | Self::HeaderLengthString => None,
        }
    }

    /// Types whose width must be declared on the descriptor.
    pub fn needs_explicit_length(self) -> bool {
        matches!(self, Self::ByteArray | Self::FixedString | Self::Skip)
    }

    /// Types whose width is resolved from another cell's value.
    pub fn is_dependent_length(self) -> bool {
        matches!(self, Self::LengthString | Self::HeaderLengthString)
    }

    /// Types that cannot be processed without a dependency.
    pub fn requires_dependency(self) -> bool {
        matches!(
            self,
            Self::LengthString | Self::HeaderLengthString | Self::BitFromVector | Self::CopyInt32
        )
    }

    /// Types that decode to an integer value.
    pub fn is_integer(self) -> bool {
        self.class() == ValueClass::Integer
    }

    /// Value category of this type.
    pub fn class(self) -> ValueClass {
        match self {
            Self::Byte
            | Self::Short
            | Self::UShort
            | Self::Int
            | Self::UInt
            | Self::Long
            | Self::EncodedInt
            | Self::BitVector
            | Self::BitFromVector
            | Self::CopyInt32
            | Self::SequenceId => ValueClass::Integer,
            Self::Float | Self::Double | Self::Decimal => ValueClass::Real,
            Self::FixedString | Self::LengthString | Self::HeaderLengthString => ValueClass::Text,
            Self::DateString => ValueClass::Date,
            Self::DateTime => ValueClass::Timestamp,
            Self::ByteArray | Self::Skip => ValueClass::Binary,
        }
    }

    /// Name of the [`Value`] kind this type encodes from.
    pub fn expected_kind(self) -> &'static str {
        match self {
            Self::Byte | Self::BitFromVector => "byte",
            Self::ByteArray | Self::Skip => "bytes",
            Self::Short => "short",
            Self::UShort => "ushort",
            Self::Int | Self::EncodedInt | Self::BitVector | Self::CopyInt32 | Self::SequenceId => {
                "int"
            }
            Self::UInt => "uint",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::DateString => "date",
            Self::DateTime => "timestamp",
            Self::FixedString | Self::LengthString | Self::HeaderLengthString => "text",
        }
    }

    /// Wrap an integer in the value kind this type carries, if it fits.
    pub fn integer_value(self, value: i64) -> Option<Value> {
        match self {
            Self::Byte | Self::BitFromVector => u8::try_from(value).ok().map(Value::Byte),
            Self::Short => i16::try_from(value).ok().map(Value::Short),
            Self::UShort => u16::try_from(value).ok().map(Value::UShort),
            Self::Int | Self::EncodedInt | Self::BitVector | Self::CopyInt32 | Self::SequenceId => {
                i32::try_from(value).ok().map(Value::Int)
            }
            Self::UInt => u32::try_from(value).ok().map(Value::UInt),
            Self::Long => Some(Value::Long(value)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode one cell of `width` bytes at the reader's position.
///
/// `width` is ignored by fixed-width types. Derived types must be resolved
/// by the row and are rejected here.
pub fn decode(
    wire: WireType,
    width: usize,
    reader: &mut ByteReader<'_>,
    cell: &str,
    encoding: TextEncoding,
) -> RdbResult<Value> {
    let start = reader.offset();
    let value = match wire {
        WireType::Byte => Value::Byte(reader.read_array::<1>(cell)?[0]),
        WireType::ByteArray => Value::Bytes(reader.take(width, cell)?.to_vec()),
        WireType::Short => Value::Short(i16::from_le_bytes(reader.read_array(cell)?)),
        WireType::UShort => Value::UShort(u16::from_le_bytes(reader.read_array(cell)?)),
        WireType::Int | WireType::BitVector => Value::Int(reader.read_i32(cell)?),
        WireType::UInt => Value::UInt(u32::from_le_bytes(reader.read_array(cell)?)),
        WireType::Long => Value::Long(i64::from_le_bytes(reader.read_array(cell)?)),
        WireType::Float => Value::Float(f32::from_le_bytes(reader.read_array(cell)?)),
        WireType::Double => Value::Double(f64::from_le_bytes(reader.read_array(cell)?)),
        WireType::Decimal => {
            Value::Decimal(Decimal::from_hundredths(i64::from(reader.read_i32(cell)?)))
        }
        WireType::DateString => {
            let raw = reader.take(8, cell)?;
            let date = parse_date_string(raw).ok_or_else(|| {
                RdbError::format(
                    Location::new(cell, start),
                    format!("`{}` is not a yyyyMMdd date", String::from_utf8_lossy(raw)),
                )
            })?;
            Value::Date(date)
        }
        WireType::DateTime => {
            let seconds = reader.read_i32(cell)?;
            let timestamp = DateTime::<Utc>::from_timestamp(i64::from(seconds), 0).ok_or_else(|| {
                RdbError::format(
                    Location::new(cell, start),
                    format!("{seconds} seconds is outside the supported time range"),
                )
            })?;
            Value::Timestamp(timestamp)
        }
        WireType::EncodedInt => Value::Int(restore_i32(reader.read_i32(cell)?)),
        WireType::FixedString => {
            let raw = reader.take(width, cell)?;
            decode_text(terminated(raw).unwrap_or(&[]), cell, start, encoding)?
        }
        WireType::LengthString | WireType::HeaderLengthString => {
            let raw = reader.take(width, cell)?;
            decode_text(terminated(raw).unwrap_or(raw), cell, start, encoding)?
        }
        WireType::Skip => {
            reader.skip(width, cell)?;
            Value::Bytes(vec![0; width])
        }
        WireType::BitFromVector | WireType::CopyInt32 | WireType::SequenceId => {
            return Err(RdbError::schema(
                cell,
                format!("{wire:?} cells are derived from other cells and cannot be decoded alone"),
            ));
        }
    };
    Ok(value)
}

/// The bytes before the first NUL, or `None` when there is no terminator.
fn terminated(raw: &[u8]) -> Option<&[u8]> {
    raw.iter().position(|&b| b == 0).map(|end| &raw[..end])
}

fn decode_text(
    raw: &[u8],
    cell: &str,
    start: usize,
    encoding: TextEncoding,
) -> RdbResult<Value> {
    encoding.decode(raw).map(Value::Text).map_err(|error| {
        RdbError::format(Location::new(cell, start), format!("undecodable text: {error}"))
    })
}

fn parse_date_string(raw: &[u8]) -> Option<NaiveDate> {
    if raw.len() != 8 || !raw.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let text = std::str::from_utf8(raw).ok()?;
    let year = text[0..4].parse().ok()?;
    let month = text[4..6].parse().ok()?;
    let day = text[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode `value` as a cell of `width` bytes at the writer's position.
pub fn encode(
    wire: WireType,
    width: usize,
    value: &Value,
    writer: &mut ByteWriter,
    cell: &str,
    encoding: TextEncoding,
) -> RdbResult<()> {
    let offset = writer.position();
    let location = || Location::new(cell, offset);

    match (wire, value) {
        (WireType::Skip, _) => writer.put_zeros(width),
        (WireType::BitFromVector, _) => {}
        (WireType::Byte, Value::Byte(v)) => writer.put(&[*v]),
        (WireType::ByteArray, Value::Bytes(bytes)) => {
            if bytes.len() > width {
                return Err(RdbError::encoding(
                    location(),
                    format!("{} bytes exceed capacity {width}", bytes.len()),
                ));
            }
            writer.put(bytes);
            writer.put_zeros(width - bytes.len());
        }
        (WireType::Short, Value::Short(v)) => writer.put(&v.to_le_bytes()),
        (WireType::UShort, Value::UShort(v)) => writer.put(&v.to_le_bytes()),
        (
            WireType::Int | WireType::BitVector | WireType::CopyInt32 | WireType::SequenceId,
            Value::Int(v),
        ) => writer.put(&v.to_le_bytes()),
        (WireType::UInt, Value::UInt(v)) => writer.put(&v.to_le_bytes()),
        (WireType::Long, Value::Long(v)) => writer.put(&v.to_le_bytes()),
        (WireType::Float, Value::Float(v)) => writer.put(&v.to_le_bytes()),
        (WireType::Double, Value::Double(v)) => writer.put(&v.to_le_bytes()),
        (WireType::Decimal, Value::Decimal(v)) => {
            let raw = i32::try_from(v.hundredths()).map_err(|_| {
                RdbError::encoding(location(), format!("decimal {v} does not fit an int32"))
            })?;
            writer.put(&raw.to_le_bytes());
        }
        (WireType::DateString, Value::Date(date)) => {
            if !(0..=9999).contains(&date.year()) {
                return Err(RdbError::encoding(
                    location(),
                    format!("year {} does not fit yyyyMMdd", date.year()),
                ));
            }
            let text = format!("{:04}{:02}{:02}", date.year(), date.month(), date.day());
            writer.put(text.as_bytes());
        }
        (WireType::DateTime, Value::Timestamp(timestamp)) => {
            let seconds = i32::try_from(timestamp.timestamp()).map_err(|_| {
                RdbError::encoding(
                    location(),
                    format!("{timestamp} is outside the int32 epoch range"),
                )
            })?;
            writer.put(&seconds.to_le_bytes());
        }
        (WireType::EncodedInt, Value::Int(v)) => writer.put(&scramble_i32(*v).to_le_bytes()),
        (WireType::FixedString, Value::Text(text)) => {
            encode_text(text, width, false, writer, location(), encoding)?;
        }
        (WireType::LengthString | WireType::HeaderLengthString, Value::Text(text)) => {
            encode_text(text, width, true, writer, location(), encoding)?;
        }
        (_, other) => {
            return Err(RdbError::TypeMismatch {
                location: location(),
                expected: wire.expected_kind(),
                found: other.kind_name(),
            });
        }
    }
    Ok(())
}

/// Write `text` plus a NUL terminator, zero-padded to `width`.
///
/// With `allow_unterminated`, text that exactly fills the field is written
/// without a terminator, matching how dependent-length strings are read.
fn encode_text(
    text: &str,
    width: usize,
    allow_unterminated: bool,
    writer: &mut ByteWriter,
    location: Location,
    encoding: TextEncoding,
) -> RdbResult<()> {
    let bytes = encoding.encode(text).map_err(|c| {
        RdbError::encoding(
            location.clone(),
            format!("character {c:?} cannot be represented in {encoding:?}"),
        )
    })?;

    if allow_unterminated && bytes.len() == width {
        writer.put(&bytes);
        return Ok(());
    }
    if bytes.len() + 1 > width {
        return Err(RdbError::encoding(
            location,
            format!(
                "encoded length {} plus terminator exceeds capacity {width}",
                bytes.len()
            ),
        ));
    }
    writer.put(&bytes);
    writer.put_zeros(width - bytes.len());
    Ok(())
}
