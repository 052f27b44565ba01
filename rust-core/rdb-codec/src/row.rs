// SPDX-License-Identifier: PMPL-1.0-or-later
//
// RDB Codec - Rows
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A row pairs a shared layout with its own value slots, one per descriptor.
// Reading walks the layout in position order and resolves dependencies from
// values already decoded in the same row (or from the header row). Writing
// walks the same order, refreshing derived cells in place right before they
// are encoded.

use std::sync::Arc;

use crate::cell::{self, WireType};
use crate::cursor::{ByteReader, ByteWriter};
use crate::descriptor::{CellDescriptor, CellFlags, RowLayout};
use crate::error::{Location, RdbError, RdbResult};
use crate::sequence::SequenceGenerator;
use crate::value::{TextEncoding, Value};

/// State threaded through a row read.
#[derive(Debug)]
pub struct ReadContext<'a> {
    /// Fully read header row, for header-referenced lengths.
    pub header: Option<&'a Row>,
    /// Source of sequence-id values.
    pub sequence: &'a mut SequenceGenerator,
    /// Encoding for string cells.
    pub encoding: TextEncoding,
    /// Data row index attached to errors.
    pub row_index: Option<usize>,
}

/// State threaded through a row write.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteContext<'a> {
    /// Header row, for header-referenced lengths.
    pub header: Option<&'a Row>,
    /// Encoding for string cells.
    pub encoding: TextEncoding,
    /// Data row index attached to errors.
    pub row_index: Option<usize>,
}

/// One header or data row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    layout: Arc<RowLayout>,
    values: Vec<Option<Value>>,
}

impl Row {
    /// An empty row with every slot unset.
    pub fn new(layout: Arc<RowLayout>) -> Self {
        let values = vec![None; layout.len()];
        Self { layout, values }
    }

    /// Decode one row from the reader's position.
    pub fn read(
        layout: Arc<RowLayout>,
        reader: &mut ByteReader<'_>,
        ctx: ReadContext<'_>,
    ) -> RdbResult<Self> {
        let ReadContext {
            header,
            sequence,
            encoding,
            row_index,
        } = ctx;
        let attach = |error: RdbError| match row_index {
            Some(index) => error.with_row(index),
            None => error,
        };

        let mut values: Vec<Option<Value>> = Vec::with_capacity(layout.len());
        for cell in layout.descriptors() {
            let start = reader.offset();
            let name = cell.name();
            let value = match cell.wire_type() {
                WireType::SequenceId => Value::Int(sequence.next()),
                WireType::BitFromVector => {
                    let parent = dependency_integer(cell, &layout, &values, start).map_err(attach)?;
                    Value::Byte(((parent >> cell.bit_offset()) & 1) as u8)
                }
                WireType::CopyInt32 => {
                    reader.skip(4, name).map_err(attach)?;
                    let source = dependency_integer(cell, &layout, &values, start).map_err(attach)?;
                    Value::Int(source as i32)
                }
                WireType::LengthString => {
                    let width = dependency_integer(cell, &layout, &values, start)
                        .and_then(|len| resolved_width(cell, len, start))
                        .map_err(attach)?;
                    cell::decode(cell.wire_type(), width, reader, name, encoding).map_err(attach)?
                }
                WireType::HeaderLengthString => {
                    let width = header_integer(cell, header, start)
                        .and_then(|len| resolved_width(cell, len, start))
                        .map_err(attach)?;
                    cell::decode(cell.wire_type(), width, reader, name, encoding).map_err(attach)?
                }
                wire => {
                    let width = cell.fixed_length().unwrap_or(0);
                    cell::decode(wire, width, reader, name, encoding).map_err(attach)?
                }
            };
            values.push(Some(value));
        }
        Ok(Self { layout, values })
    }

    /// Encode this row at the writer's position.
    ///
    /// Copy cells are refreshed from their source and bit vectors are rebuilt
    /// from their members before they are encoded, so the row reflects what
    /// was written once this returns.
    pub fn write(&mut self, writer: &mut ByteWriter, ctx: WriteContext<'_>) -> RdbResult<()> {
        let attach = |error: RdbError| match ctx.row_index {
            Some(index) => error.with_row(index),
            None => error,
        };
        let layout = Arc::clone(&self.layout);

        for cell in layout.descriptors() {
            let offset = writer.position();
            let width = match cell.wire_type() {
                WireType::BitFromVector => continue,
                WireType::Skip => {
                    writer.put_zeros(cell.fixed_length().unwrap_or(0));
                    continue;
                }
                WireType::CopyInt32 => {
                    let source = dependency_integer(cell, &layout, &self.values, offset).map_err(attach)?;
                    self.values[cell.position()] = Some(Value::Int(source as i32));
                    4
                }
                WireType::BitVector => {
                    let rebuilt = self.rebuild_bit_vector(cell, offset).map_err(attach)?;
                    self.values[cell.position()] = Some(Value::Int(rebuilt));
                    4
                }
                WireType::LengthString => dependency_integer(cell, &layout, &self.values, offset)
                    .and_then(|len| resolved_width(cell, len, offset))
                    .map_err(attach)?,
                WireType::HeaderLengthString => header_integer(cell, ctx.header, offset)
                    .and_then(|len| resolved_width(cell, len, offset))
                    .map_err(attach)?,
                _ => cell.fixed_length().unwrap_or(0),
            };

            let value = self.values[cell.position()].as_ref().ok_or_else(|| {
                attach(RdbError::TypeMismatch {
                    location: Location::new(cell.name(), offset),
                    expected: cell.wire_type().expected_kind(),
                    found: "unset",
                })
            })?;
            cell::encode(cell.wire_type(), width, value, writer, cell.name(), ctx.encoding)
                .map_err(attach)?;
        }
        Ok(())
    }

    fn rebuild_bit_vector(&self, parent: &CellDescriptor, offset: usize) -> RdbResult<i32> {
        let mut rebuilt = 0i32;
        for member in self.layout.members_of(parent.name()) {
            if member.wire_type() != WireType::BitFromVector {
                continue;
            }
            let bit = self.values[member.position()]
                .as_ref()
                .and_then(Value::as_i64)
                .ok_or_else(|| RdbError::TypeMismatch {
                    location: Location::new(member.name(), offset),
                    expected: "byte",
                    found: self.values[member.position()]
                        .as_ref()
                        .map_or("unset", Value::kind_name),
                })?;
            rebuilt |= (bit as i32).wrapping_shl(u32::from(member.bit_offset()));
        }
        Ok(rebuilt)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The layout this row was built from.
    pub fn layout(&self) -> &Arc<RowLayout> {
        &self.layout
    }

    /// Value of the cell called `name`, if the cell exists and is set.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.layout.position_of(name).and_then(|position| self.get_at(position))
    }

    /// Value at `position`, if set.
    pub fn get_at(&self, position: usize) -> Option<&Value> {
        self.values.get(position).and_then(Option::as_ref)
    }

    /// Replace the value of the cell called `name`.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> RdbResult<()> {
        let position = self
            .layout
            .position_of(name)
            .ok_or_else(|| RdbError::UnknownCell(name.to_string()))?;
        self.values[position] = Some(value.into());
        Ok(())
    }

    /// Store `value` at a position taken from this row's own layout.
    pub(crate) fn put(&mut self, position: usize, value: Value) {
        self.values[position] = Some(value);
    }

    /// Replace the value at `position`.
    pub fn set_at(&mut self, position: usize, value: impl Into<Value>) -> RdbResult<()> {
        let slot = self
            .values
            .get_mut(position)
            .ok_or_else(|| RdbError::UnknownCell(format!("#{position}")))?;
        *slot = Some(value.into());
        Ok(())
    }

    /// Value of the first cell carrying `flag`.
    pub fn value_by_flag(&self, flag: CellFlags) -> Option<&Value> {
        self.descriptor_by_flag(flag)
            .and_then(|cell| self.get_at(cell.position()))
    }

    /// First descriptor carrying `flag`.
    pub fn descriptor_by_flag(&self, flag: CellFlags) -> Option<&CellDescriptor> {
        self.layout.by_flag(flag)
    }

    /// Descriptors and values of the cells depending on `name`.
    pub fn members_of<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = (&'a CellDescriptor, Option<&'a Value>)> {
        self.layout
            .members_of(name)
            .map(move |cell| (cell, self.get_at(cell.position())))
    }

    /// Integer value of the cell called `name`.
    pub fn integer(&self, name: &str) -> RdbResult<i64> {
        let cell = self
            .layout
            .descriptor(name)
            .ok_or_else(|| RdbError::UnknownCell(name.to_string()))?;
        let value = self.get_at(cell.position());
        value.and_then(Value::as_i64).ok_or_else(|| RdbError::TypeMismatch {
            location: Location::new(name, 0),
            expected: "integer",
            found: value.map_or("unset", Value::kind_name),
        })
    }

    /// Every cell with its value, in position order.
    pub fn cells(&self) -> impl Iterator<Item = (&CellDescriptor, Option<&Value>)> {
        self.layout
            .descriptors()
            .iter()
            .zip(self.values.iter().map(Option::as_ref))
    }

    /// Cells without the hidden flag.
    pub fn visible_cells(&self) -> impl Iterator<Item = (&CellDescriptor, Option<&Value>)> {
        self.cells().filter(|(cell, _)| cell.is_visible())
    }

    /// True when every slot holds a value.
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }
}

fn dependency_name(cell: &CellDescriptor) -> RdbResult<&str> {
    cell.dependency()
        .ok_or_else(|| RdbError::schema(cell.name(), "missing dependency"))
}

/// Integer value of `cell`'s dependency among `values`.
fn dependency_integer(
    cell: &CellDescriptor,
    layout: &RowLayout,
    values: &[Option<Value>],
    offset: usize,
) -> RdbResult<i64> {
    let dependency = dependency_name(cell)?;
    let position = layout.position_of(dependency).ok_or_else(|| {
        RdbError::schema(cell.name(), format!("depends on unknown cell `{dependency}`"))
    })?;
    let value = values.get(position).and_then(Option::as_ref);
    value.and_then(Value::as_i64).ok_or_else(|| RdbError::TypeMismatch {
        location: Location::new(cell.name(), offset),
        expected: "integer",
        found: value.map_or("unset", Value::kind_name),
    })
}

fn header_integer(cell: &CellDescriptor, header: Option<&Row>, offset: usize) -> RdbResult<i64> {
    let dependency = dependency_name(cell)?;
    let header = header.ok_or_else(|| {
        RdbError::schema(
            cell.name(),
            format!("length `{dependency}` lives in the header but no header row is available"),
        )
    })?;
    let value = header.get(dependency);
    value.and_then(Value::as_i64).ok_or_else(|| RdbError::TypeMismatch {
        location: Location::new(cell.name(), offset),
        expected: "integer",
        found: value.map_or("unset", Value::kind_name),
    })
}

fn resolved_width(cell: &CellDescriptor, length: i64, offset: usize) -> RdbResult<usize> {
    usize::try_from(length).map_err(|_| {
        RdbError::format(
            Location::new(cell.name(), offset),
            format!("resolved length {length} is negative"),
        )
    })
}
