//! Typed little-endian field encoding and decoding.
//!
//! Every ADP message is an ordered sequence of fixed-width fields.  The codec
//! writes and reads them in little-endian order whatever the host byte order.
//!
//! Encoding with no output buffer is a dry run, returning the number of bytes
//! the fields would occupy.  This is used to size packets before allocating
//! them.
//!
//! ```rust
//! use adp_host::codec::{decode, encode, Field, FieldKind};
//!
//! let fields = [Field::Word(0x8000), Field::Byte(3), Field::Half(0x1234)];
//! let len = encode(None, &fields).unwrap();
//! let mut buf = [0u8; 16];
//! assert_eq!(encode(Some(&mut buf), &fields).unwrap(), len);
//!
//! let kinds = [FieldKind::Word, FieldKind::Byte, FieldKind::Half];
//! assert_eq!(decode(&buf[..len], &kinds).unwrap(), fields);
//! ```

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::vec;
use alloc::vec::Vec;

use crate::{Error, Result};

/// Type of a single wire field, used to drive decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 4 bytes
    Word,
    /// 2 bytes
    Half,
    /// 1 byte
    Byte,
    /// Raw bytes of the given length
    Bytes(usize),
}

impl FieldKind {
    /// Width of this field on the wire, in bytes
    pub const fn width(&self) -> usize {
        match self {
            FieldKind::Word => 4,
            FieldKind::Half => 2,
            FieldKind::Byte => 1,
            FieldKind::Bytes(len) => *len,
        }
    }
}

/// A single typed field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field<'a> {
    Word(u32),
    Half(u16),
    Byte(u8),
    Bytes(&'a [u8]),
}

impl Field<'_> {
    /// Width of this field on the wire, in bytes
    pub const fn width(&self) -> usize {
        match self {
            Field::Word(_) => 4,
            Field::Half(_) => 2,
            Field::Byte(_) => 1,
            Field::Bytes(bytes) => bytes.len(),
        }
    }

    /// The kind of this field
    pub const fn kind(&self) -> FieldKind {
        match self {
            Field::Word(_) => FieldKind::Word,
            Field::Half(_) => FieldKind::Half,
            Field::Byte(_) => FieldKind::Byte,
            Field::Bytes(bytes) => FieldKind::Bytes(bytes.len()),
        }
    }
}

/// Encode fields in order into `buf`.
///
/// Arguments:
/// - `buf` - Output buffer, or `None` to compute the encoded length only
/// - `fields` - Fields to encode
///
/// Returns the number of bytes written (or that would be written).
/// [`Error::BufferTooSmall`] if `buf` cannot hold every field, in which case
/// the contents of `buf` are unspecified.
pub fn encode(buf: Option<&mut [u8]>, fields: &[Field<'_>]) -> Result<usize> {
    let len = fields.iter().map(Field::width).sum();

    let Some(buf) = buf else {
        return Ok(len);
    };
    if buf.len() < len {
        return Err(Error::BufferTooSmall);
    }

    let mut pos = 0;
    for field in fields {
        let width = field.width();
        let out = &mut buf[pos..pos + width];
        match field {
            Field::Word(value) => out.copy_from_slice(&value.to_le_bytes()),
            Field::Half(value) => out.copy_from_slice(&value.to_le_bytes()),
            Field::Byte(value) => out[0] = *value,
            Field::Bytes(bytes) => out.copy_from_slice(bytes),
        }
        pos += width;
    }

    Ok(pos)
}

/// Encode fields into a newly allocated, exactly sized vector
pub fn encode_to_vec(fields: &[Field<'_>]) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; encode(None, fields)?];
    encode(Some(&mut buf), fields)?;
    Ok(buf)
}

/// Decode fields of the given kinds from the start of `data`.
///
/// Every field decodes into its own value, including runs of consecutive
/// byte fields.  Trailing data beyond the last field is ignored.
///
/// Returns [`Error::Truncated`] if `data` ends before the last field.
pub fn decode<'a>(data: &'a [u8], kinds: &[FieldKind]) -> Result<Vec<Field<'a>>> {
    let mut cursor = Cursor::new(data);
    kinds
        .iter()
        .map(|kind| match kind {
            FieldKind::Word => cursor.word().map(Field::Word),
            FieldKind::Half => cursor.half().map(Field::Half),
            FieldKind::Byte => cursor.byte().map(Field::Byte),
            FieldKind::Bytes(len) => cursor.bytes(*len).map(Field::Bytes),
        })
        .collect()
}

/// Sequential little-endian reader over a received message.
///
/// Used where a reply's layout depends on values earlier in the same reply,
/// which a fixed [`FieldKind`] list cannot express.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Create a cursor starting at `offset` into `data`
    pub fn at(data: &'a [u8], offset: usize) -> Result<Self> {
        if offset > data.len() {
            return Err(Error::Truncated);
        }
        Ok(Self { data, pos: offset })
    }

    /// Current offset from the start of the message
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn word(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn half(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    /// Everything from the current position to the end of the message
    pub fn rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos..];
        self.pos = self.data.len();
        rest
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::Truncated);
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_little_endian() {
        let mut buf = [0u8; 7];
        let len = encode(
            Some(&mut buf),
            &[Field::Word(0x0403_0201), Field::Half(0x0605), Field::Byte(7)],
        )
        .unwrap();
        assert_eq!(len, 7);
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn dry_run_leaves_nothing_written() {
        let fields = [Field::Word(1), Field::Bytes(&[9, 9, 9]), Field::Byte(2)];
        assert_eq!(encode(None, &fields).unwrap(), 8);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let mut buf = [0u8; 3];
        assert_eq!(
            encode(Some(&mut buf), &[Field::Word(1)]),
            Err(Error::BufferTooSmall)
        );
    }

    #[test]
    fn consecutive_byte_fields_decode_independently() {
        let data = [0x11, 0x22, 0x33, 0x78, 0x56, 0x34, 0x12, 0x44];
        let fields = decode(
            &data,
            &[
                FieldKind::Byte,
                FieldKind::Byte,
                FieldKind::Byte,
                FieldKind::Word,
                FieldKind::Byte,
            ],
        )
        .unwrap();
        assert_eq!(
            fields,
            [
                Field::Byte(0x11),
                Field::Byte(0x22),
                Field::Byte(0x33),
                Field::Word(0x1234_5678),
                Field::Byte(0x44),
            ]
        );
    }

    #[test]
    fn truncated_decode_fails() {
        assert_eq!(
            decode(&[1, 2, 3], &[FieldKind::Word]),
            Err(Error::Truncated)
        );
    }

    #[test]
    fn cursor_reads_in_sequence() {
        let data = [0xAA, 1, 0, 0, 0, 2, 0, b'h', b'i'];
        let mut cursor = Cursor::at(&data, 1).unwrap();
        assert_eq!(cursor.word().unwrap(), 1);
        assert_eq!(cursor.half().unwrap(), 2);
        assert_eq!(cursor.remaining(), 2);
        assert_eq!(cursor.rest(), b"hi");
        assert_eq!(cursor.byte(), Err(Error::Truncated));
    }
}
