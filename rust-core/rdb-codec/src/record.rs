// SPDX-License-Identifier: PMPL-1.0-or-later
//
// RDB Codec - Records
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A record is one whole RDB file: a header row followed by data rows.
//
// ## Layouts
//
// ```text
// default:  [header][row][row][row]...                 RowCount = rows
// grouped:  [header][n:i32][row * n][m:i32][row * m]... RowCount = groups
// ```
//
// In the grouped layout the header's row count is the number of groups, not
// the number of rows. Files already on disk depend on this, so it is kept.
// Writing never rewrites the row count; call `Record::sync_row_count` when
// rows were added or removed.

use std::fs;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cell::WireType;
use crate::cursor::{ByteReader, ByteWriter};
use crate::descriptor::{
    CellDescriptor, CellFlags, RowLayout, CREATION_DATE_CELL, SIGNATURE_CELL,
};
use crate::error::{Location, RdbError, RdbResult};
use crate::row::{ReadContext, Row, WriteContext};
use crate::sequence::SequenceGenerator;
use crate::value::{TextEncoding, Value};

/// Label used in errors raised while reading a group count prefix.
const GROUP_COUNT_LABEL: &str = "<group count>";

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// How data rows are framed after the header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialCase {
    /// Rows follow each other with no framing.
    #[default]
    None,
    /// Rows are framed in count-prefixed runs of equal loop-counter values.
    #[serde(alias = "double_loop")]
    GroupedRows,
}

/// Descriptive metadata about a record structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureInfo {
    /// Structure name.
    pub name: String,
    /// Who authored the structure definition.
    pub author: String,
    /// Version of the structure definition.
    pub version: String,
    /// File the structure is usually stored in.
    pub file_name: String,
    /// SQL table the rows map to.
    pub table_name: Option<String>,
    /// Custom SELECT statement used instead of the generated one.
    pub select_statement: Option<String>,
}

/// Validated header and data layouts plus record-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    info: StructureInfo,
    header: Arc<RowLayout>,
    data: Arc<RowLayout>,
    special_case: SpecialCase,
    encoding: TextEncoding,
    signature: Option<Vec<u8>>,
}

impl RecordSchema {
    /// Start a schema for the given data cells.
    pub fn builder(cells: Vec<CellDescriptor>) -> RecordSchemaBuilder {
        RecordSchemaBuilder {
            cells,
            ..RecordSchemaBuilder::default()
        }
    }

    /// A default-layout schema with the default header.
    pub fn new(cells: Vec<CellDescriptor>) -> RdbResult<Self> {
        Self::builder(cells).build()
    }

    pub fn info(&self) -> &StructureInfo {
        &self.info
    }

    pub fn header_layout(&self) -> &Arc<RowLayout> {
        &self.header
    }

    pub fn data_layout(&self) -> &Arc<RowLayout> {
        &self.data
    }

    pub fn special_case(&self) -> SpecialCase {
        self.special_case
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Signature bytes written into the header, sized to `width`.
    pub fn signature(&self, width: usize) -> Vec<u8> {
        let mut signature = match &self.signature {
            Some(custom) => custom.clone(),
            None => {
                let mut default = vec![0u8; 8];
                default.extend_from_slice(
                    format!("Written by rdb-codec v{}", env!("CARGO_PKG_VERSION")).as_bytes(),
                );
                default
            }
        };
        signature.resize(width, 0);
        signature
    }
}

/// Builder for [`RecordSchema`].
#[derive(Debug, Default)]
pub struct RecordSchemaBuilder {
    info: StructureInfo,
    header: Option<Vec<CellDescriptor>>,
    cells: Vec<CellDescriptor>,
    special_case: SpecialCase,
    encoding: TextEncoding,
    signature: Option<Vec<u8>>,
}

impl RecordSchemaBuilder {
    pub fn info(mut self, info: StructureInfo) -> Self {
        self.info = info;
        self
    }

    /// Replace the default 3-cell header.
    pub fn header(mut self, cells: Vec<CellDescriptor>) -> Self {
        self.header = Some(cells);
        self
    }

    pub fn special_case(mut self, special_case: SpecialCase) -> Self {
        self.special_case = special_case;
        self
    }

    pub fn encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Override the provenance signature written on save.
    pub fn signature(mut self, signature: impl Into<Vec<u8>>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Validate both layouts and their cross references.
    pub fn build(self) -> RdbResult<RecordSchema> {
        let header = match self.header {
            Some(cells) => RowLayout::new(cells)?,
            None => RowLayout::default_header(),
        };
        let count = header.by_flag(CellFlags::ROW_COUNT).ok_or_else(|| {
            RdbError::schema("<header>", "header has no cell flagged row_count")
        })?;
        if !count.wire_type().is_integer() {
            return Err(RdbError::schema(count.name(), "row count cell must be an integer"));
        }
        if let Some(cell) = header
            .descriptors()
            .iter()
            .find(|cell| cell.wire_type() == WireType::HeaderLengthString)
        {
            return Err(RdbError::schema(
                cell.name(),
                "header cells cannot reference the header",
            ));
        }

        let data = RowLayout::new(self.cells)?;
        data.validate_header_refs(&header)?;
        if data.fixed_width() == Some(0) {
            return Err(RdbError::schema(
                "<data>",
                "data rows must occupy at least one byte",
            ));
        }
        if self.special_case == SpecialCase::GroupedRows
            && data.by_flag(CellFlags::LOOP_COUNTER).is_none()
        {
            return Err(RdbError::schema(
                "<data>",
                "grouped rows need a cell flagged loop_counter",
            ));
        }

        Ok(RecordSchema {
            info: self.info,
            header: Arc::new(header),
            data: Arc::new(data),
            special_case: self.special_case,
            encoding: self.encoding,
            signature: self.signature,
        })
    }
}

// ---------------------------------------------------------------------------
// Row processing hook
// ---------------------------------------------------------------------------

/// Which way a row is travelling when a processor sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// After the row was decoded.
    Read,
    /// Before the row is encoded.
    Write,
}

/// Hook invoked once per data row during reads and writes.
pub trait RowProcessor {
    fn process(&mut self, row: &mut Row, direction: Direction) -> RdbResult<()>;
}

impl<F> RowProcessor for F
where
    F: FnMut(&mut Row, Direction) -> RdbResult<()>,
{
    fn process(&mut self, row: &mut Row, direction: Direction) -> RdbResult<()> {
        self(row, direction)
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A header row and its data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<RecordSchema>,
    header: Row,
    rows: Vec<Row>,
}

impl Record {
    /// An empty record. Default header cells start out as 1990-01-01, a
    /// zeroed signature and a zero row count.
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        let mut header = Row::new(Arc::clone(&schema.header));
        let layout = Arc::clone(&schema.header);
        for cell in layout.descriptors() {
            let initial = match cell.wire_type() {
                WireType::DateString if cell.name() == CREATION_DATE_CELL => {
                    NaiveDate::from_ymd_opt(1990, 1, 1).map(Value::Date)
                }
                WireType::ByteArray if cell.name() == SIGNATURE_CELL => {
                    Some(Value::Bytes(vec![0; cell.fixed_length().unwrap_or(0)]))
                }
                wire if cell.has_flag(CellFlags::ROW_COUNT) => wire.integer_value(0),
                _ => None,
            };
            if let Some(value) = initial {
                header.put(cell.position(), value);
            }
        }
        Self {
            schema,
            header,
            rows: Vec::new(),
        }
    }

    /// Parse a whole file image.
    pub fn read(
        schema: Arc<RecordSchema>,
        bytes: &[u8],
        sequence: &mut SequenceGenerator,
    ) -> RdbResult<Self> {
        Self::read_inner(schema, bytes, sequence, None)
    }

    /// Parse a whole file image, passing each data row through `processor`.
    pub fn read_with(
        schema: Arc<RecordSchema>,
        bytes: &[u8],
        sequence: &mut SequenceGenerator,
        processor: &mut dyn RowProcessor,
    ) -> RdbResult<Self> {
        Self::read_inner(schema, bytes, sequence, Some(processor))
    }

    /// Read `path` fully into memory and parse it.
    pub fn load(
        schema: Arc<RecordSchema>,
        path: impl AsRef<Path>,
        sequence: &mut SequenceGenerator,
    ) -> RdbResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        debug!(path = %path.display(), bytes = bytes.len(), "Loaded record file");
        Self::read(schema, &bytes, sequence)
    }

    fn read_inner(
        schema: Arc<RecordSchema>,
        bytes: &[u8],
        sequence: &mut SequenceGenerator,
        mut processor: Option<&mut dyn RowProcessor>,
    ) -> RdbResult<Self> {
        let encoding = schema.encoding;
        let mut reader = ByteReader::new(bytes);

        let header = Row::read(
            Arc::clone(&schema.header),
            &mut reader,
            ReadContext {
                header: None,
                sequence: &mut *sequence,
                encoding,
                row_index: None,
            },
        )?;
        sequence.restart();

        let outer = header_count(&header, reader.offset())?;
        let mut rows = Vec::new();
        let mut read_row = |reader: &mut ByteReader<'_>, rows: &mut Vec<Row>| -> RdbResult<()> {
            let index = rows.len();
            let start = reader.offset();
            let mut row = Row::read(
                Arc::clone(&schema.data),
                reader,
                ReadContext {
                    header: Some(&header),
                    sequence: &mut *sequence,
                    encoding,
                    row_index: Some(index),
                },
            )?;
            if reader.offset() == start {
                return Err(
                    RdbError::format(Location::new("<row>", start), "data row consumed no bytes")
                        .with_row(index),
                );
            }
            if let Some(processor) = processor.as_deref_mut() {
                processor
                    .process(&mut row, Direction::Read)
                    .map_err(|error| error.with_row(index))?;
            }
            rows.push(row);
            Ok(())
        };

        match schema.special_case {
            SpecialCase::None => {
                for _ in 0..outer {
                    read_row(&mut reader, &mut rows)?;
                }
            }
            SpecialCase::GroupedRows => {
                for group in 0..outer {
                    let offset = reader.offset();
                    let count = reader.read_i32(GROUP_COUNT_LABEL)?;
                    if count < 0 {
                        return Err(RdbError::format(
                            Location::new(GROUP_COUNT_LABEL, offset),
                            format!("group {group} has negative row count {count}"),
                        ));
                    }
                    for _ in 0..count {
                        read_row(&mut reader, &mut rows)?;
                    }
                }
            }
        }

        if !reader.is_empty() {
            warn!(
                offset = reader.offset(),
                trailing = reader.remaining(),
                "Record has unread trailing bytes"
            );
        }
        debug!(
            structure = %schema.info.name,
            rows = rows.len(),
            bytes = bytes.len(),
            "Record read"
        );

        Ok(Self {
            schema,
            header,
            rows,
        })
    }

    /// Serialize the record into a new buffer.
    pub fn write(&mut self) -> RdbResult<Vec<u8>> {
        self.write_inner(None)
    }

    /// Serialize the record, passing each data row through `processor`
    /// before any bytes are produced.
    pub fn write_with(&mut self, processor: &mut dyn RowProcessor) -> RdbResult<Vec<u8>> {
        self.write_inner(Some(processor))
    }

    /// Serialize fully, then write the file in one call.
    pub fn save(&mut self, path: impl AsRef<Path>) -> RdbResult<()> {
        let path = path.as_ref();
        let bytes = self.write()?;
        fs::write(path, &bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "Saved record file");
        Ok(())
    }

    fn write_inner(&mut self, processor: Option<&mut dyn RowProcessor>) -> RdbResult<Vec<u8>> {
        let encoding = self.schema.encoding;

        // Work on copies; the record is only updated once every row encoded.
        let mut header = self.header.clone();
        let mut rows = self.rows.clone();

        if let Some(cell) = self.schema.header.descriptor(SIGNATURE_CELL) {
            if cell.wire_type() == WireType::ByteArray {
                let signature = self.schema.signature(cell.fixed_length().unwrap_or(0));
                header.put(cell.position(), Value::Bytes(signature));
            }
        }
        if let Some(processor) = processor {
            for (index, row) in rows.iter_mut().enumerate() {
                processor
                    .process(row, Direction::Write)
                    .map_err(|error| error.with_row(index))?;
            }
        }

        let mut writer = ByteWriter::with_capacity(self.estimated_size());
        header.write(
            &mut writer,
            WriteContext {
                header: None,
                encoding,
                row_index: None,
            },
        )?;

        let ctx = |index| WriteContext {
            header: Some(&header),
            encoding,
            row_index: Some(index),
        };
        match self.schema.special_case {
            SpecialCase::None => {
                for (index, row) in rows.iter_mut().enumerate() {
                    row.write(&mut writer, ctx(index))?;
                }
            }
            SpecialCase::GroupedRows => {
                for run in runs_by_loop_counter(&rows, &self.schema.data) {
                    let count = i32::try_from(run.len()).map_err(|_| {
                        RdbError::encoding(
                            Location::new(GROUP_COUNT_LABEL, writer.position()),
                            format!("group of {} rows exceeds int32", run.len()),
                        )
                    })?;
                    writer.put_i32(count);
                    for index in run {
                        rows[index].write(&mut writer, ctx(index))?;
                    }
                }
            }
        }

        debug!(
            structure = %self.schema.info.name,
            rows = rows.len(),
            bytes = writer.position(),
            "Record written"
        );
        self.header = header;
        self.rows = rows;
        Ok(writer.into_inner())
    }

    /// Contiguous runs of rows sharing a loop-counter value.
    fn group_runs(&self) -> Vec<Range<usize>> {
        runs_by_loop_counter(&self.rows, &self.schema.data)
    }

    fn estimated_size(&self) -> usize {
        let header = self.schema.header.min_read_width();
        let row = self.schema.data.min_read_width();
        header.saturating_add(row.saturating_mul(self.rows.len()))
    }

    /// Store the current number of rows (or groups, in the grouped layout)
    /// in the header's row count cell and return it.
    pub fn sync_row_count(&mut self) -> RdbResult<i64> {
        let count = match self.schema.special_case {
            SpecialCase::None => self.rows.len(),
            SpecialCase::GroupedRows => self.group_runs().len(),
        };
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        let cell = self
            .schema
            .header
            .by_flag(CellFlags::ROW_COUNT)
            .ok_or_else(|| RdbError::schema("<header>", "header has no cell flagged row_count"))?;
        let value = cell.wire_type().integer_value(count).ok_or_else(|| {
            RdbError::encoding(
                Location::new(cell.name(), 0),
                format!("{count} does not fit {:?}", cell.wire_type()),
            )
        })?;
        self.header.set_at(cell.position(), value)?;
        Ok(count)
    }

    /// The header's raw row count (groups, in the grouped layout).
    pub fn row_count(&self) -> RdbResult<i64> {
        header_count(&self.header, 0)
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    pub fn header(&self) -> &Row {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Row {
        &mut self.header
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut Vec<Row> {
        &mut self.rows
    }

    /// An empty data row for this record's layout.
    pub fn new_row(&self) -> Row {
        Row::new(Arc::clone(&self.schema.data))
    }

    /// Append a data row built from this record's layout.
    pub fn push_row(&mut self, row: Row) -> RdbResult<()> {
        if !Arc::ptr_eq(row.layout(), &self.schema.data) && **row.layout() != *self.schema.data {
            return Err(RdbError::schema(
                "<data>",
                "row was built from a different layout",
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    /// `(row index, value)` for every row where the cell `name` is set.
    pub fn column<'a>(
        &'a self,
        name: &str,
    ) -> RdbResult<impl Iterator<Item = (usize, &'a Value)> + 'a> {
        let position = self
            .schema
            .data
            .position_of(name)
            .ok_or_else(|| RdbError::UnknownCell(name.to_string()))?;
        Ok(self
            .rows
            .iter()
            .enumerate()
            .filter_map(move |(index, row)| row.get_at(position).map(|value| (index, value))))
    }

    /// Names of the data cells that are not hidden.
    pub fn visible_names(&self) -> Vec<&str> {
        self.schema
            .data
            .descriptors()
            .iter()
            .filter(|cell| cell.is_visible())
            .map(CellDescriptor::name)
            .collect()
    }
}

/// Contiguous runs of `rows` sharing a loop-counter value. Without a
/// loop counter every row belongs to one run.
fn runs_by_loop_counter(rows: &[Row], layout: &RowLayout) -> Vec<Range<usize>> {
    let Some(position) = layout
        .by_flag(CellFlags::LOOP_COUNTER)
        .map(CellDescriptor::position)
    else {
        return vec![0..rows.len()];
    };

    let mut runs: Vec<Range<usize>> = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        let key = row.get_at(position);
        match runs.last_mut() {
            Some(run) if rows[run.start].get_at(position) == key => run.end = index + 1,
            _ => runs.push(index..index + 1),
        }
    }
    runs
}

fn header_count(header: &Row, offset: usize) -> RdbResult<i64> {
    let cell = header
        .descriptor_by_flag(CellFlags::ROW_COUNT)
        .ok_or_else(|| RdbError::schema("<header>", "header has no cell flagged row_count"))?;
    let count = header.integer(cell.name())?;
    if count < 0 {
        return Err(RdbError::format(
            Location::new(cell.name(), offset),
            format!("row count {count} is negative"),
        ));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn grouped_schema() -> Arc<RecordSchema> {
        Arc::new(
            RecordSchema::builder(vec![
                CellDescriptor::new("Group", WireType::Int).with_flags(CellFlags::LOOP_COUNTER),
                CellDescriptor::new("Value", WireType::Byte),
            ])
            .special_case(SpecialCase::GroupedRows)
            .build()
            .unwrap(),
        )
    }

    fn header_bytes(count: i32) -> Vec<u8> {
        let mut bytes = b"19900101".to_vec();
        bytes.extend_from_slice(&[0; 120]);
        bytes.extend_from_slice(&count.to_le_bytes());
        bytes
    }

    #[test]
    fn test_new_record_defaults() {
        let schema = Arc::new(RecordSchema::new(vec![CellDescriptor::new("Id", WireType::Int)]).unwrap());
        let record = Record::new(schema);
        assert_eq!(record.row_count().unwrap(), 0);
        assert_eq!(
            record.header().get(CREATION_DATE_CELL),
            Some(&Value::Date(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()))
        );
        assert_eq!(record.header().get(SIGNATURE_CELL), Some(&Value::Bytes(vec![0; 120])));
        assert!(record.header().is_complete());
    }

    #[test]
    fn test_signature_written_on_save() {
        let schema = Arc::new(RecordSchema::new(vec![CellDescriptor::new("Id", WireType::Int)]).unwrap());
        let mut record = Record::new(schema);
        let bytes = record.write().unwrap();
        assert_eq!(bytes.len(), 132);
        assert_eq!(&bytes[8..16], &[0; 8]);
        assert!(bytes[16..].starts_with(b"Written by rdb-codec v"));
    }

    #[test]
    fn test_custom_signature_is_sized_to_cell() {
        let schema = RecordSchema::builder(vec![CellDescriptor::new("Id", WireType::Int)])
            .signature(b"custom".to_vec())
            .build()
            .unwrap();
        let signature = schema.signature(10);
        assert_eq!(signature, b"custom\0\0\0\0");
    }

    #[test]
    fn test_grouped_runs_follow_loop_counter() {
        let schema = grouped_schema();
        let mut record = Record::new(Arc::clone(&schema));
        for (group, value) in [(1, 10u8), (1, 11), (2, 20), (1, 12)] {
            let mut row = record.new_row();
            row.set("Group", group).unwrap();
            row.set("Value", Value::Byte(value)).unwrap();
            record.push_row(row).unwrap();
        }
        assert_eq!(record.group_runs(), vec![0..2, 2..3, 3..4]);
        assert_eq!(record.sync_row_count().unwrap(), 3);

        let bytes = record.write().unwrap();
        let mut expected = Vec::new();
        expected.extend_from_slice(&2i32.to_le_bytes());
        expected.extend_from_slice(&[1, 0, 0, 0, 10, 1, 0, 0, 0, 11]);
        expected.extend_from_slice(&1i32.to_le_bytes());
        expected.extend_from_slice(&[2, 0, 0, 0, 20]);
        expected.extend_from_slice(&1i32.to_le_bytes());
        expected.extend_from_slice(&[1, 0, 0, 0, 12]);
        assert_eq!(&bytes[132..], expected.as_slice());
    }

    #[test]
    fn test_row_count_not_rewritten_by_write() {
        let schema = Arc::new(RecordSchema::new(vec![CellDescriptor::new("Id", WireType::Int)]).unwrap());
        let mut record = Record::new(schema);
        let mut row = record.new_row();
        row.set("Id", 4).unwrap();
        record.push_row(row).unwrap();
        let bytes = record.write().unwrap();
        assert_eq!(&bytes[128..132], &0i32.to_le_bytes());
        assert_eq!(record.sync_row_count().unwrap(), 1);
        let bytes = record.write().unwrap();
        assert_eq!(&bytes[128..132], &1i32.to_le_bytes());
    }

    #[test]
    fn test_negative_row_count_is_format_error() {
        let schema = Arc::new(RecordSchema::new(vec![CellDescriptor::new("Id", WireType::Int)]).unwrap());
        let error = Record::read(schema, &header_bytes(-1), &mut SequenceGenerator::new()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_negative_group_count_is_format_error() {
        let mut bytes = header_bytes(1);
        bytes.extend_from_slice(&(-2i32).to_le_bytes());
        let error = Record::read(grouped_schema(), &bytes, &mut SequenceGenerator::new()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Format);
        assert_eq!(error.location().unwrap().cell, GROUP_COUNT_LABEL);
    }

    #[test]
    fn test_processor_sees_rows_in_both_directions() {
        let schema = Arc::new(RecordSchema::new(vec![CellDescriptor::new("Id", WireType::Int)]).unwrap());
        let mut bytes = header_bytes(2);
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&2i32.to_le_bytes());

        let mut seen = Vec::new();
        let mut on_read = |row: &mut Row, direction: Direction| -> RdbResult<()> {
            seen.push((row.integer("Id")?, direction));
            Ok(())
        };
        let mut record =
            Record::read_with(schema, &bytes, &mut SequenceGenerator::new(), &mut on_read).unwrap();
        assert_eq!(seen, vec![(1, Direction::Read), (2, Direction::Read)]);

        let mut double = |row: &mut Row, _: Direction| -> RdbResult<()> {
            let id = row.integer("Id")?;
            row.set("Id", (id * 2) as i32)
        };
        let written = record.write_with(&mut double).unwrap();
        assert_eq!(&written[132..], &[2, 0, 0, 0, 4, 0, 0, 0]);
    }

    #[test]
    fn test_failed_write_leaves_record_untouched() {
        let schema = Arc::new(
            RecordSchema::new(vec![
                CellDescriptor::new("Id", WireType::Int),
                CellDescriptor::fixed_string("Name", 4),
            ])
            .unwrap(),
        );
        let mut record = Record::new(schema);
        let mut row = record.new_row();
        row.set("Id", 5).unwrap();
        row.set("Name", "too long").unwrap();
        record.push_row(row).unwrap();
        let before = record.clone();

        let mut double = |row: &mut Row, _: Direction| -> RdbResult<()> {
            let id = row.integer("Id")?;
            row.set("Id", (id * 2) as i32)
        };
        let error = record.write_with(&mut double).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Encoding);
        assert_eq!(record, before);

        record.rows_mut()[0].set("Name", "ok").unwrap();
        let bytes = record.write_with(&mut double).unwrap();
        assert_eq!(&bytes[132..136], &10i32.to_le_bytes());
        assert_eq!(record.rows()[0].get("Id"), Some(&Value::Int(10)));
        assert!(record.header().get(SIGNATURE_CELL).unwrap().as_bytes().unwrap()[8..]
            .starts_with(b"Written by"));
    }

    #[test]
    fn test_processor_error_aborts_read() {
        let schema = Arc::new(RecordSchema::new(vec![CellDescriptor::new("Id", WireType::Int)]).unwrap());
        let mut bytes = header_bytes(1);
        bytes.extend_from_slice(&1i32.to_le_bytes());
        let mut reject =
            |_: &mut Row, _: Direction| -> RdbResult<()> { Err(RdbError::schema("Id", "rejected")) };
        let result = Record::read_with(schema, &bytes, &mut SequenceGenerator::new(), &mut reject);
        assert!(result.is_err());
    }

    #[test]
    fn test_schema_validation() {
        let zero_width = RecordSchema::new(vec![CellDescriptor::new("Sid", WireType::SequenceId)]);
        assert_eq!(zero_width.unwrap_err().kind(), ErrorKind::Schema);

        let no_counter = RecordSchema::builder(vec![CellDescriptor::new("Id", WireType::Int)])
            .special_case(SpecialCase::GroupedRows)
            .build();
        assert_eq!(no_counter.unwrap_err().kind(), ErrorKind::Schema);

        let no_row_count = RecordSchema::builder(vec![CellDescriptor::new("Id", WireType::Int)])
            .header(vec![CellDescriptor::new("Date", WireType::DateString)])
            .build();
        assert_eq!(no_row_count.unwrap_err().kind(), ErrorKind::Schema);
    }

    #[test]
    fn test_push_row_rejects_foreign_layout() {
        let schema = Arc::new(RecordSchema::new(vec![CellDescriptor::new("Id", WireType::Int)]).unwrap());
        let mut record = Record::new(schema);
        let foreign = Row::new(Arc::new(
            RowLayout::new(vec![CellDescriptor::new("Other", WireType::Byte)]).unwrap(),
        ));
        assert!(record.push_row(foreign).is_err());
    }

    #[test]
    fn test_column_and_visible_names() {
        let schema = Arc::new(
            RecordSchema::new(vec![
                CellDescriptor::new("Id", WireType::Int),
                CellDescriptor::new("Secret", WireType::Int).with_flags(CellFlags::HIDDEN),
            ])
            .unwrap(),
        );
        let mut record = Record::new(schema);
        for id in [3, 5] {
            let mut row = record.new_row();
            row.set("Id", id).unwrap();
            record.push_row(row).unwrap();
        }
        let column: Vec<(usize, &Value)> = record.column("Id").unwrap().collect();
        assert_eq!(column, vec![(0, &Value::Int(3)), (1, &Value::Int(5))]);
        assert!(record.column("Missing").is_err());
        assert_eq!(record.visible_names(), vec!["Id"]);
    }
}
