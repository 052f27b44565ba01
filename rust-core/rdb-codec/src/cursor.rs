// SPDX-License-Identifier: PMPL-1.0-or-later
//
// RDB Codec - Byte cursors
//
// Records are parsed from a fully buffered file and serialized into memory
// before a single flush, so both directions work over plain byte buffers.

use crate::error::{Location, RdbError, RdbResult};

/// Forward-only reader over an in-memory RDB buffer.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    /// Start reading at the beginning of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Current byte offset from the start of the buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// True when every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Consume `len` bytes on behalf of `cell`.
    pub fn take(&mut self, len: usize, cell: &str) -> RdbResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(RdbError::format(
                Location::new(cell, self.offset),
                format!(
                    "need {len} bytes, only {} available",
                    self.remaining()
                ),
            ));
        }
        let start = self.offset;
        self.offset += len;
        Ok(&self.data[start..self.offset])
    }

    /// Advance past `len` bytes without interpreting them.
    pub fn skip(&mut self, len: usize, cell: &str) -> RdbResult<()> {
        self.take(len, cell).map(|_| ())
    }

    /// Consume exactly `N` bytes as an array.
    pub fn read_array<const N: usize>(&mut self, cell: &str) -> RdbResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, cell)?);
        Ok(out)
    }

    /// Consume a little-endian int32.
    pub fn read_i32(&mut self, cell: &str) -> RdbResult<i32> {
        self.read_array(cell).map(i32::from_le_bytes)
    }
}

/// Growable output buffer for serializing a record.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buffer: Vec<u8>,
}

impl ByteWriter {
    /// An empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty writer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    pub fn position(&self) -> usize {
        self.buffer.len()
    }

    /// Append raw bytes.
    pub fn put(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Append `count` zero bytes.
    pub fn put_zeros(&mut self, count: usize) {
        self.buffer.resize(self.buffer.len() + count, 0);
    }

    /// Append a little-endian int32.
    pub fn put_i32(&mut self, value: i32) {
        self.put(&value.to_le_bytes());
    }

    /// The bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the writer and return its buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_take_advances() {
        let data = [1u8, 2, 3, 4, 5];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.take(2, "a").unwrap(), &[1, 2]);
        assert_eq!(reader.offset(), 2);
        assert_eq!(reader.remaining(), 3);
    }

    #[test]
    fn test_truncated_take_reports_location() {
        let data = [0u8; 3];
        let mut reader = ByteReader::new(&data);
        reader.skip(2, "pad").unwrap();
        let error = reader.read_i32("Count").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Format);
        let location = error.location().unwrap();
        assert_eq!(location.cell, "Count");
        assert_eq!(location.offset, 2);
        // A failed take leaves the cursor where it was.
        assert_eq!(reader.offset(), 2);
    }

    #[test]
    fn test_writer_helpers() {
        let mut writer = ByteWriter::new();
        writer.put(&[9]);
        writer.put_zeros(2);
        writer.put_i32(-2);
        assert_eq!(writer.position(), 7);
        assert_eq!(writer.into_inner(), vec![9, 0, 0, 0xfe, 0xff, 0xff, 0xff]);
    }
}
