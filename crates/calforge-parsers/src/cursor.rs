//! Sequential little-endian reader over an in-memory byte buffer.
//!
//! The asset formats never state their byte order; every sample file seen
//! so far is little-endian, so that is what the cursor assumes.

use std::io::{self, Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use calforge_core::{Color, Error, Quat, Vec2, Vec3};

use crate::traits::ParseResult;

/// Forward-only reader over a finite byte slice
#[derive(Debug, Clone)]
pub struct BinaryCursor<'a> {
    inner: Cursor<&'a [u8]>,
}

impl<'a> BinaryCursor<'a> {
    /// Create a cursor positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            inner: Cursor::new(data),
        }
    }

    /// Current byte offset
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Bytes left before the end of the buffer
    pub fn remaining(&self) -> usize {
        let len = self.inner.get_ref().len() as u64;
        len.saturating_sub(self.inner.position()) as usize
    }

    /// Whether every byte has been consumed
    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    fn eof(&self, requested: usize) -> Error {
        Error::UnexpectedEndOfData {
            offset: self.position(),
            requested,
        }
    }

    fn map_io(&self, err: io::Error, requested: usize) -> Error {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            self.eof(requested)
        } else {
            Error::Io(err)
        }
    }

    fn ensure(&self, requested: usize) -> ParseResult<()> {
        if self.remaining() < requested {
            return Err(self.eof(requested));
        }
        Ok(())
    }

    pub fn read_u32(&mut self) -> ParseResult<u32> {
        self.ensure(4)?;
        self.inner
            .read_u32::<LittleEndian>()
            .map_err(|e| self.map_io(e, 4))
    }

    pub fn read_i32(&mut self) -> ParseResult<i32> {
        self.ensure(4)?;
        self.inner
            .read_i32::<LittleEndian>()
            .map_err(|e| self.map_io(e, 4))
    }

    pub fn read_f32(&mut self) -> ParseResult<f32> {
        self.ensure(4)?;
        self.inner
            .read_f32::<LittleEndian>()
            .map_err(|e| self.map_io(e, 4))
    }

    /// Read exactly `len` raw bytes
    pub fn read_bytes(&mut self, len: usize) -> ParseResult<Vec<u8>> {
        self.ensure(len)?;
        let mut buf = vec![0u8; len];
        self.inner
            .read_exact(&mut buf)
            .map_err(|e| self.map_io(e, len))?;
        Ok(buf)
    }

    /// Read a fixed-size array of bytes (magic signatures)
    pub fn read_array<const N: usize>(&mut self) -> ParseResult<[u8; N]> {
        self.ensure(N)?;
        let mut buf = [0u8; N];
        self.inner
            .read_exact(&mut buf)
            .map_err(|e| self.map_io(e, N))?;
        Ok(buf)
    }

    /// Four consecutive bytes as an RGBA color
    pub fn read_color(&mut self) -> ParseResult<Color> {
        Ok(Color::from_array(self.read_array::<4>()?))
    }

    /// 32-bit length followed by that many single-byte characters.
    ///
    /// Each byte is widened to one `char`; multi-byte encodings come out
    /// garbled.
    pub fn read_string(&mut self) -> ParseResult<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(bytes.into_iter().map(char::from).collect())
    }

    /// Length-prefixed string with trailing NUL characters removed
    pub fn read_c_string(&mut self) -> ParseResult<String> {
        let mut s = self.read_string()?;
        let trimmed = s.trim_end_matches('\0').len();
        s.truncate(trimmed);
        Ok(s)
    }

    /// Signed 32-bit record count; negative counts are corrupt data.
    pub fn read_count(&mut self, what: &str) -> ParseResult<usize> {
        let offset = self.position();
        let raw = self.read_i32()?;
        usize::try_from(raw).map_err(|_| {
            Error::invalid_data(format!("negative {what} count {raw} at offset {offset}"))
        })
    }

    /// Signed 32-bit index that must not be negative
    pub fn read_index(&mut self, what: &str) -> ParseResult<u32> {
        let offset = self.position();
        let raw = self.read_i32()?;
        u32::try_from(raw).map_err(|_| {
            Error::invalid_data(format!("negative {what} {raw} at offset {offset}"))
        })
    }

    pub fn read_vec2(&mut self) -> ParseResult<Vec2> {
        Ok(Vec2::new(self.read_f32()?, self.read_f32()?))
    }

    pub fn read_vec3(&mut self) -> ParseResult<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    pub fn read_quat(&mut self) -> ParseResult<Quat> {
        Ok(Quat::new(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ))
    }

    /// Capacity hint for `count` records of at least `min_record_size` bytes,
    /// bounded by what the buffer can still hold.
    pub fn capacity_for(&self, count: usize, min_record_size: usize) -> usize {
        count.min(self.remaining() / min_record_size.max(1))
    }
}
