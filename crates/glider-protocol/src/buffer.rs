use crate::varint;
use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use glider_common::{ProtocolError, Result};
use std::io::{self, Read, Write};
use uuid::Uuid;

/// Frame buffer. Contains the bytes of one frame and a read cursor.
///
/// Reads advance the reader index and fail with `BufferUnderrun` when fewer
/// bytes remain than required. Writes always append, so the writer index is
/// the end of the buffer. All multi-byte integers are big-endian.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    buffer: Vec<u8>,
    reader_index: usize,
    marked_reader_index: usize,
}

impl FrameBuffer {
    /// Creates an empty buffer, ready for writing.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            reader_index: 0,
            marked_reader_index: 0,
        }
    }

    /// Wraps an already assembled frame for reading.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            buffer: bytes.into(),
            reader_index: 0,
            marked_reader_index: 0,
        }
    }

    pub fn reader_index(&self) -> usize {
        self.reader_index
    }

    pub fn writer_index(&self) -> usize {
        self.buffer.len()
    }

    pub fn readable_bytes(&self) -> usize {
        self.buffer.len() - self.reader_index
    }

    pub fn is_readable(&self) -> bool {
        self.readable_bytes() > 0
    }

    /// The whole written region, independent of the reader index.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// The unread region.
    pub fn remaining(&self) -> &[u8] {
        &self.buffer[self.reader_index..]
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.buffer)
    }

    pub fn mark_reader_index(&mut self) {
        self.marked_reader_index = self.reader_index;
    }

    pub fn reset_reader_index(&mut self) {
        self.reader_index = self.marked_reader_index;
    }

    pub fn set_reader_index(&mut self, index: usize) -> Result<()> {
        if index > self.buffer.len() {
            return Err(ProtocolError::BufferUnderrun {
                needed: index,
                remaining: self.buffer.len(),
            });
        }
        self.reader_index = index;
        Ok(())
    }

    fn ensure_readable(&self, needed: usize) -> Result<()> {
        let remaining = self.readable_bytes();
        if needed > remaining {
            return Err(ProtocolError::BufferUnderrun { needed, remaining });
        }
        Ok(())
    }

    /// Returns the next byte without advancing the cursor.
    pub fn peek_u8(&self) -> Option<u8> {
        self.buffer.get(self.reader_index).copied()
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure_readable(n)?;
        self.reader_index += n;
        Ok(())
    }

    /// Non-owning view of `len` bytes starting at absolute index `start`.
    pub fn slice(&self, start: usize, len: usize) -> Result<&[u8]> {
        let end = start.checked_add(len).filter(|end| *end <= self.buffer.len());
        match end {
            Some(end) => Ok(&self.buffer[start..end]),
            None => Err(ProtocolError::BufferUnderrun {
                needed: len,
                remaining: self.buffer.len().saturating_sub(start),
            }),
        }
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&[u8]> {
        self.ensure_readable(n)?;
        let start = self.reader_index;
        self.reader_index += n;
        Ok(&self.buffer[start..start + n])
    }

    pub fn read_remaining(&mut self) -> &[u8] {
        let start = self.reader_index;
        self.reader_index = self.buffer.len();
        &self.buffer[start..]
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buffer.push(value as u8);
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buffer.push(value as u8);
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn write_u16(&mut self, value: u16) {
        let mut bytes = [0; 2];
        BigEndian::write_u16(&mut bytes, value);
        self.write_bytes(&bytes);
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(BigEndian::read_i16(self.read_bytes(2)?))
    }

    pub fn write_i16(&mut self, value: i16) {
        let mut bytes = [0; 2];
        BigEndian::write_i16(&mut bytes, value);
        self.write_bytes(&bytes);
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(BigEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn write_i32(&mut self, value: i32) {
        let mut bytes = [0; 4];
        BigEndian::write_i32(&mut bytes, value);
        self.write_bytes(&bytes);
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(BigEndian::read_i64(self.read_bytes(8)?))
    }

    pub fn write_i64(&mut self, value: i64) {
        let mut bytes = [0; 8];
        BigEndian::write_i64(&mut bytes, value);
        self.write_bytes(&bytes);
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(BigEndian::read_u64(self.read_bytes(8)?))
    }

    pub fn write_u64(&mut self, value: u64) {
        let mut bytes = [0; 8];
        BigEndian::write_u64(&mut bytes, value);
        self.write_bytes(&bytes);
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(BigEndian::read_f32(self.read_bytes(4)?))
    }

    pub fn write_f32(&mut self, value: f32) {
        let mut bytes = [0; 4];
        BigEndian::write_f32(&mut bytes, value);
        self.write_bytes(&bytes);
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(BigEndian::read_f64(self.read_bytes(8)?))
    }

    pub fn write_f64(&mut self, value: f64) {
        let mut bytes = [0; 8];
        BigEndian::write_f64(&mut bytes, value);
        self.write_bytes(&bytes);
    }

    /// Reads a UUID, written as two big-endian longs.
    pub fn read_uuid(&mut self) -> Result<Uuid> {
        let bytes = self.read_bytes(16)?;
        Ok(Uuid::from_u128(BigEndian::read_u128(bytes)))
    }

    pub fn write_uuid(&mut self, value: Uuid) {
        self.write_bytes(value.as_bytes());
    }

    pub fn read_varint(&mut self) -> Result<i32> {
        let (value, len) = varint::read_varint(self.remaining())?;
        self.reader_index += len;
        Ok(value)
    }

    pub fn write_varint(&mut self, value: i32) {
        varint::write_varint(&mut self.buffer, value);
    }

    pub fn read_varlong(&mut self) -> Result<i64> {
        let (value, len) = varint::read_varlong(self.remaining())?;
        self.reader_index += len;
        Ok(value)
    }

    pub fn write_varlong(&mut self, value: i64) {
        varint::write_varlong(&mut self.buffer, value);
    }

    pub fn read_zigzag_varint(&mut self) -> Result<i32> {
        Ok(varint::zigzag_decode32(self.read_varint()? as u32))
    }

    pub fn write_zigzag_varint(&mut self, value: i32) {
        self.write_varint(varint::zigzag_encode32(value) as i32);
    }

    pub fn read_zigzag_varlong(&mut self) -> Result<i64> {
        Ok(varint::zigzag_decode64(self.read_varlong()? as u64))
    }

    pub fn write_zigzag_varlong(&mut self, value: i64) {
        self.write_varlong(varint::zigzag_encode64(value) as i64);
    }

    /// Reads a varint-prefixed UTF-8 string of at most `max_chars` characters.
    ///
    /// The byte length is checked against `max_chars * 4` before the payload
    /// is touched, then the decoded character count against `max_chars`.
    pub fn read_string(&mut self, max_chars: usize) -> Result<String> {
        let length = self.read_varint()?;
        if length < 0 {
            return Err(ProtocolError::invalid_data(format!(
                "negative string length {}",
                length
            )));
        }
        let length = length as usize;
        let max_bytes = max_chars.saturating_mul(4);
        if length > max_bytes {
            return Err(ProtocolError::StringTooLong {
                length,
                max: max_bytes,
            });
        }
        let bytes = self.read_bytes(length)?;
        let value = std::str::from_utf8(bytes)
            .map_err(|_| ProtocolError::invalid_data("Failed to convert bytes to UTF-8 string"))?
            .to_owned();
        let chars = value.chars().count();
        if chars > max_chars {
            return Err(ProtocolError::StringTooLong {
                length: chars,
                max: max_chars,
            });
        }
        Ok(value)
    }

    pub fn write_string(&mut self, value: &str) {
        let bytes = value.as_bytes();
        self.write_varint(bytes.len() as i32);
        self.write_bytes(bytes);
    }
}

// The NBT codec works against std::io streams.
impl Read for FrameBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let to_read = buf.len().min(self.readable_bytes());
        buf[..to_read].copy_from_slice(&self.buffer[self.reader_index..self.reader_index + to_read]);
        self.reader_index += to_read;
        Ok(to_read)
    }
}

impl Write for FrameBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
