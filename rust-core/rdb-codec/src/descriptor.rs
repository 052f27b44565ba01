// SPDX-License-Identifier: PMPL-1.0-or-later
//
// RDB Codec - Cell descriptors and row layouts
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A `RowLayout` is the validated, immutable list of descriptors for one kind
// of row. Positions are assigned here, once, in declaration order; layouts
// are shared behind an `Arc` by every row built from them. Runtime-resolved
// string lengths are never written back into a descriptor.

use std::collections::HashMap;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::cell::WireType;
use crate::error::{RdbError, RdbResult};

/// Name of the default header's creation date cell.
pub const CREATION_DATE_CELL: &str = "CreationDate";
/// Name of the header cell that receives the provenance signature on write.
pub const SIGNATURE_CELL: &str = "Signature";
/// Name of the default header's row count cell.
pub const ROW_COUNT_CELL: &str = "RowCount";
/// Width of the default header's signature blob.
pub const SIGNATURE_LENGTH: usize = 120;

// ---------------------------------------------------------------------------
// ByteLength / CellFlags
// ---------------------------------------------------------------------------

/// Declared width of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteLength {
    /// Always this many bytes.
    Fixed(usize),
    /// Resolved per row from a dependency.
    Variable,
}

/// Set of behavioural flags carried by a descriptor.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CellFlags(u16);

impl CellFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Excluded from CSV output and visible-cell views.
    pub const HIDDEN: Self = Self(1);
    /// Holds the outer read-loop count (header rows).
    pub const ROW_COUNT: Self = Self(2);
    /// Informational only; the codec still reads and writes the cell.
    pub const RDB_IGNORE: Self = Self(4);
    /// Excluded from generated SQL statements.
    pub const SQL_IGNORE: Self = Self(8);
    /// Groups rows in the grouped layout.
    pub const LOOP_COUNTER: Self = Self(16);

    const NAMED: [(Self, &'static str); 5] = [
        (Self::HIDDEN, "hidden"),
        (Self::ROW_COUNT, "row_count"),
        (Self::RDB_IGNORE, "rdb_ignore"),
        (Self::SQL_IGNORE, "sql_ignore"),
        (Self::LOOP_COUNTER, "loop_counter"),
    ];

    /// Raw bit representation.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// True if every flag in `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if no flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Names of the set flags, in declaration order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMED
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, name)| name)
    }
}

impl BitOr for CellFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CellFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for CellFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

// ---------------------------------------------------------------------------
// CellDescriptor
// ---------------------------------------------------------------------------

/// Schema metadata for one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellDescriptor {
    name: String,
    wire_type: WireType,
    length: ByteLength,
    bit_offset: u8,
    dependency: Option<String>,
    flags: CellFlags,
    position: usize,
}

impl CellDescriptor {
    /// A descriptor with the wire type's intrinsic width, or a variable
    /// width for types that need one declared or resolved.
    pub fn new(name: impl Into<String>, wire_type: WireType) -> Self {
        let length = match wire_type.intrinsic_width() {
            Some(width) => ByteLength::Fixed(width),
            None => ByteLength::Variable,
        };
        Self {
            name: name.into(),
            wire_type,
            length,
            bit_offset: 0,
            dependency: None,
            flags: CellFlags::NONE,
            position: 0,
        }
    }

    /// NUL-terminated string in a field of `length` bytes.
    pub fn fixed_string(name: impl Into<String>, length: usize) -> Self {
        Self::new(name, WireType::FixedString).with_length(length)
    }

    /// Raw blob of `length` bytes.
    pub fn byte_array(name: impl Into<String>, length: usize) -> Self {
        Self::new(name, WireType::ByteArray).with_length(length)
    }

    /// `length` bytes of padding.
    pub fn skip(name: impl Into<String>, length: usize) -> Self {
        Self::new(name, WireType::Skip).with_length(length)
    }

    /// Bit `offset` of the bit vector named `parent`.
    pub fn bit(name: impl Into<String>, parent: impl Into<String>, offset: u8) -> Self {
        Self::new(name, WireType::BitFromVector)
            .with_dependency(parent)
            .with_bit_offset(offset)
    }

    /// int32 duplicate of the cell named `source`.
    pub fn copy_int32(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(name, WireType::CopyInt32).with_dependency(source)
    }

    /// String whose width is the value of the earlier cell `length_cell`.
    pub fn length_string(name: impl Into<String>, length_cell: impl Into<String>) -> Self {
        Self::new(name, WireType::LengthString).with_dependency(length_cell)
    }

    /// String whose width is the value of the header cell `length_cell`.
    pub fn header_length_string(name: impl Into<String>, length_cell: impl Into<String>) -> Self {
        Self::new(name, WireType::HeaderLengthString).with_dependency(length_cell)
    }

    /// Declare a fixed width.
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = ByteLength::Fixed(length);
        self
    }

    /// Name the cell this one depends on.
    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependency = Some(dependency.into());
        self
    }

    /// Bit position within the parent vector.
    pub fn with_bit_offset(mut self, offset: u8) -> Self {
        self.bit_offset = offset;
        self
    }

    /// Add flags.
    pub fn with_flags(mut self, flags: CellFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }

    pub fn length(&self) -> ByteLength {
        self.length
    }

    /// The declared width, or `None` when it is resolved per row.
    pub fn fixed_length(&self) -> Option<usize> {
        match self.length {
            ByteLength::Fixed(width) => Some(width),
            ByteLength::Variable => None,
        }
    }

    pub fn bit_offset(&self) -> u8 {
        self.bit_offset
    }

    pub fn dependency(&self) -> Option<&str> {
        self.dependency.as_deref()
    }

    pub fn flags(&self) -> CellFlags {
        self.flags
    }

    /// True if this descriptor carries every flag in `flag`.
    pub fn has_flag(&self, flag: CellFlags) -> bool {
        self.flags.contains(flag)
    }

    /// True unless flagged hidden.
    pub fn is_visible(&self) -> bool {
        !self.has_flag(CellFlags::HIDDEN)
    }

    /// Index of this cell's value within its row.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes this cell consumes on read when its width is not resolved
    /// from a dependency.
    fn read_width(&self) -> usize {
        match self.wire_type {
            WireType::SequenceId | WireType::BitFromVector => 0,
            _ => self.fixed_length().unwrap_or(0),
        }
    }
}

// ---------------------------------------------------------------------------
// RowLayout
// ---------------------------------------------------------------------------

/// Validated, ordered descriptors for one kind of row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLayout {
    cells: Vec<CellDescriptor>,
    index: HashMap<String, usize>,
}

impl RowLayout {
    /// Assign positions in declaration order and validate the layout.
    ///
    /// Header-referenced lengths are only checked for presence of a
    /// dependency name here; [`RowLayout::validate_header_refs`] resolves
    /// them once the header layout is known.
    pub fn new(cells: Vec<CellDescriptor>) -> RdbResult<Self> {
        let layout = Self::indexed(cells);
        for cell in &layout.cells {
            if cell.name.is_empty() {
                return Err(RdbError::schema(
                    format!("#{}", cell.position),
                    "cell name must not be empty",
                ));
            }
            if layout.index.get(&cell.name) != Some(&cell.position) {
                return Err(RdbError::schema(&cell.name, "duplicate cell name"));
            }
        }
        for cell in &layout.cells {
            layout.validate_cell(cell)?;
        }
        Ok(layout)
    }

    /// The 3-cell header used when a schema does not declare one:
    /// an 8-byte creation date, a 120-byte signature and an int32 row count.
    pub fn default_header() -> Self {
        Self::indexed(vec![
            CellDescriptor::new(CREATION_DATE_CELL, WireType::DateString),
            CellDescriptor::byte_array(SIGNATURE_CELL, SIGNATURE_LENGTH),
            CellDescriptor::new(ROW_COUNT_CELL, WireType::Int).with_flags(CellFlags::ROW_COUNT),
        ])
    }

    fn indexed(mut cells: Vec<CellDescriptor>) -> Self {
        for (position, cell) in cells.iter_mut().enumerate() {
            cell.position = position;
        }
        let mut index = HashMap::with_capacity(cells.len());
        for cell in &cells {
            index.entry(cell.name.clone()).or_insert(cell.position);
        }
        Self { cells, index }
    }

    fn validate_cell(&self, cell: &CellDescriptor) -> RdbResult<()> {
        let wire = cell.wire_type;

        match (wire.intrinsic_width(), cell.length) {
            (Some(width), ByteLength::Fixed(declared)) if declared != width => {
                return Err(RdbError::schema(
                    &cell.name,
                    format!("{wire:?} is {width} bytes wide, declared {declared}"),
                ));
            }
            (None, ByteLength::Variable) if wire.needs_explicit_length() => {
                return Err(RdbError::schema(
                    &cell.name,
                    format!("{wire:?} requires an explicit length"),
                ));
            }
            (None, ByteLength::Fixed(_)) if wire.is_dependent_length() => {
                return Err(RdbError::schema(
                    &cell.name,
                    "width is resolved from the dependency and cannot be declared",
                ));
            }
            _ => {}
        }
        if wire == WireType::FixedString && cell.length == ByteLength::Fixed(0) {
            return Err(RdbError::schema(
                &cell.name,
                "fixed strings need room for a terminator",
            ));
        }
        if cell.bit_offset >= 32 {
            return Err(RdbError::schema(
                &cell.name,
                format!("bit offset {} is outside 0..32", cell.bit_offset),
            ));
        }

        let Some(dependency) = cell.dependency.as_deref() else {
            if wire.requires_dependency() {
                return Err(RdbError::schema(
                    &cell.name,
                    format!("{wire:?} requires a dependency"),
                ));
            }
            return Ok(());
        };
        if wire == WireType::HeaderLengthString {
            return Ok(());
        }

        let target = self.descriptor(dependency).ok_or_else(|| {
            RdbError::schema(&cell.name, format!("depends on unknown cell `{dependency}`"))
        })?;
        if target.position >= cell.position {
            return Err(RdbError::schema(
                &cell.name,
                format!(
                    "dependency `{dependency}` at position {} must precede position {}",
                    target.position, cell.position
                ),
            ));
        }
        match wire {
            WireType::BitFromVector if target.wire_type != WireType::BitVector => {
                Err(RdbError::schema(
                    &cell.name,
                    format!("bit parent `{dependency}` is not a bit vector"),
                ))
            }
            WireType::CopyInt32 | WireType::LengthString if !target.wire_type.is_integer() => {
                Err(RdbError::schema(
                    &cell.name,
                    format!("dependency `{dependency}` is not an integer cell"),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Check that every header-referenced length names an integer cell of
    /// `header`.
    pub fn validate_header_refs(&self, header: &RowLayout) -> RdbResult<()> {
        for cell in &self.cells {
            if cell.wire_type != WireType::HeaderLengthString {
                continue;
            }
            let dependency = cell.dependency.as_deref().unwrap_or_default();
            let target = header.descriptor(dependency).ok_or_else(|| {
                RdbError::schema(
                    &cell.name,
                    format!("depends on unknown header cell `{dependency}`"),
                )
            })?;
            if !target.wire_type.is_integer() {
                return Err(RdbError::schema(
                    &cell.name,
                    format!("header cell `{dependency}` is not an integer cell"),
                ));
            }
        }
        Ok(())
    }

    /// Descriptors in position order.
    pub fn descriptors(&self) -> &[CellDescriptor] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Look up a descriptor by name.
    pub fn descriptor(&self, name: &str) -> Option<&CellDescriptor> {
        self.index.get(name).and_then(|&position| self.cells.get(position))
    }

    /// Position of the cell called `name`.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// First descriptor carrying `flag`.
    pub fn by_flag(&self, flag: CellFlags) -> Option<&CellDescriptor> {
        self.cells.iter().find(|cell| cell.has_flag(flag))
    }

    /// Descriptors whose dependency is `name`.
    pub fn members_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a CellDescriptor> {
        self.cells
            .iter()
            .filter(move |cell| cell.dependency() == Some(name))
    }

    /// Smallest number of bytes a row of this layout consumes on read.
    pub fn min_read_width(&self) -> usize {
        self.cells.iter().map(CellDescriptor::read_width).sum()
    }

    /// Exact on-disk width, when no cell resolves its width at runtime.
    pub fn fixed_width(&self) -> Option<usize> {
        if self.cells.iter().any(|cell| cell.wire_type.is_dependent_length()) {
            None
        } else {
            Some(self.min_read_width())
        }
    }

    /// True if any cell is a header-referenced string.
    pub fn has_header_refs(&self) -> bool {
        self.cells
            .iter()
            .any(|cell| cell.wire_type == WireType::HeaderLengthString)
    }
}
