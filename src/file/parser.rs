//! Cursor-based reader over a seekable symbol stream.
//!
//! This module provides the [`crate::file::parser::Parser`] type, which wraps any
//! [`std::io::Read`] + [`std::io::Seek`] source and exposes the primitive decoding operations the
//! symbol file format is built from: fixed-width little-endian values, base-128 integers and
//! length-prefixed strings.
//!
//! # Key Components
//!
//! ## Navigation Methods
//! - [`crate::file::parser::Parser::pos`] - Get the current stream position
//! - [`crate::file::parser::Parser::seek`] - Move to an absolute position
//! - [`crate::file::parser::Parser::at`] - Run a read at an absolute position and restore the
//!   caller's position afterwards
//!
//! ## Data Access Methods
//! - [`crate::file::parser::Parser::read_le`] - Read primitive types (little-endian)
//! - [`crate::file::parser::Parser::read_7bit_encoded_int`] - Read base-128 unsigned integers
//! - [`crate::file::parser::Parser::read_7bit_encoded_i32`] - Read base-128 signed integers
//! - [`crate::file::parser::Parser::read_prefixed_string_utf8`] - Read length-prefixed strings
//! - [`crate::file::parser::Parser::read_string_at`] - Read an out-of-line string by offset
//!
//! # Usage Examples
//!
//! ```rust
//! use std::io::Cursor;
//! use symstore::Parser;
//!
//! let data = vec![0x03, b'f', b'o', b'o', 0xAC, 0x02];
//! let mut parser = Parser::new(Cursor::new(data));
//!
//! assert_eq!(parser.read_prefixed_string_utf8()?, "foo");
//! assert_eq!(parser.read_7bit_encoded_int()?, 300);
//! assert_eq!(parser.read_string_at(0)?, "foo");
//! assert_eq!(parser.pos()?, 6);
//! # Ok::<(), symstore::Error>(())
//! ```
//!
//! # Error Handling
//!
//! Reading past the end of the stream yields [`crate::Error::OutOfBounds`]; other I/O failures
//! surface as [`crate::Error::FileError`]; invalid encodings yield [`crate::Error::Malformed`].

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use crate::{file::io::SymIO, Error, Result};

/// A cursor-based reader over a seekable stream.
///
/// The parser owns its stream. Callers that need to share one parser between threads wrap it
/// in a lock and perform every seek/read/restore sequence while holding it.
pub struct Parser<R> {
    inner: R,
}

impl<R: Read + Seek> Parser<R> {
    /// Create a new [`Parser`] reading from `inner`, starting at its current position.
    #[must_use]
    pub fn new(inner: R) -> Self {
        Parser { inner }
    }

    /// Consume the parser and return the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Get the current position within the stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the stream cannot report its position.
    pub fn pos(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Move the current position to an absolute offset.
    ///
    /// Seeking past the end is allowed; the next read then fails with
    /// [`crate::Error::OutOfBounds`].
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the stream cannot seek.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    /// Total length of the stream in bytes. The current position is preserved.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the stream cannot seek.
    pub fn len(&mut self) -> Result<u64> {
        let saved = self.inner.stream_position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(saved))?;
        Ok(end)
    }

    /// Execute `f` at the absolute position `pos`, restoring the previous position afterwards.
    ///
    /// The position is restored whether `f` succeeds or fails.
    ///
    /// # Errors
    /// Propagates the error of `f`, or any seek failure.
    pub fn at<T, F>(&mut self, pos: u64, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let saved = self.pos()?;
        self.seek(pos)?;
        let result = f(self);
        self.seek(saved)?;
        result
    }

    /// Read exactly `length` bytes.
    ///
    /// The length is checked against the bytes left in the stream before anything is allocated.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream ends early.
    pub fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>> {
        let remaining = self.len()?.saturating_sub(self.pos()?);
        if length as u64 > remaining {
            return Err(out_of_bounds_error!());
        }
        let mut buffer = vec![0u8; length];
        self.fill(&mut buffer)?;
        Ok(buffer)
    }

    /// Read a value of type `T` in little-endian byte order.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream ends before `T` is complete.
    pub fn read_le<T: SymIO>(&mut self) -> Result<T> {
        let mut bytes = T::Bytes::default();
        self.fill(bytes.as_mut())?;
        Ok(T::from_le_bytes(bytes))
    }

    /// Read a base-128 encoded unsigned integer.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream ends mid-value, or
    /// [`crate::Error::Malformed`] if the encoding exceeds 32 bits.
    pub fn read_7bit_encoded_int(&mut self) -> Result<u32> {
        let mut value = 0u32;
        let mut shift = 0;

        loop {
            let byte = self.read_le::<u8>()?;
            if shift == 28 && byte > 0x0F {
                return Err(malformed_error!(
                    "7-bit encoded integer overflow: value exceeds u32 capacity after {} bits",
                    shift
                ));
            }

            value |= u32::from(byte & 0x7F) << shift;
            shift += 7;

            if (byte & 0x80) == 0 {
                return Ok(value);
            }
        }
    }

    /// Read a base-128 encoded signed integer stored as its `u32` bit pattern.
    ///
    /// # Errors
    /// Same as [`Parser::read_7bit_encoded_int`].
    #[allow(clippy::cast_possible_wrap)]
    pub fn read_7bit_encoded_i32(&mut self) -> Result<i32> {
        Ok(self.read_7bit_encoded_int()? as i32)
    }

    /// Read a base-128 length followed by that many raw bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream ends early.
    pub fn read_prefixed_bytes(&mut self) -> Result<Vec<u8>> {
        let length = self.read_7bit_encoded_int()? as usize;
        self.read_bytes(length)
    }

    /// Read a length-prefixed UTF-8 string.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream ends early, or
    /// [`crate::Error::Malformed`] if the bytes are not valid UTF-8.
    pub fn read_prefixed_string_utf8(&mut self) -> Result<String> {
        let start = self.pos()?;
        let bytes = self.read_prefixed_bytes()?;
        String::from_utf8(bytes).map_err(|e| {
            malformed_error!("Invalid UTF-8 string at offset {}: {}", start, e.utf8_error())
        })
    }

    /// Read a length-prefixed UTF-8 string stored at the absolute `offset`, leaving the
    /// current position untouched.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `offset` lies at or past end-of-stream.
    pub fn read_string_at(&mut self, offset: u64) -> Result<String> {
        if offset >= self.len()? {
            return Err(out_of_bounds_error!());
        }
        self.at(offset, Self::read_prefixed_string_utf8)
    }

    fn fill(&mut self, buffer: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buffer).map_err(|error| match error.kind() {
            ErrorKind::UnexpectedEof => out_of_bounds_error!(),
            _ => Error::FileError(error),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn parser(data: &[u8]) -> Parser<Cursor<Vec<u8>>> {
        Parser::new(Cursor::new(data.to_vec()))
    }

    #[test]
    fn read_le_values() {
        let mut parser = parser(&[0x01, 0x02, 0x03, 0x04, 0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(parser.read_le::<u32>().unwrap(), 0x0403_0201);
        assert_eq!(parser.read_le::<i32>().unwrap(), -2);
        assert!(matches!(
            parser.read_le::<u8>(),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn read_7bit_values() {
        let mut parser = parser(&[0x00, 0x7F, 0x80, 0x01, 0xAC, 0x02, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert_eq!(parser.read_7bit_encoded_int().unwrap(), 0);
        assert_eq!(parser.read_7bit_encoded_int().unwrap(), 127);
        assert_eq!(parser.read_7bit_encoded_int().unwrap(), 128);
        assert_eq!(parser.read_7bit_encoded_int().unwrap(), 300);
        assert_eq!(parser.read_7bit_encoded_i32().unwrap(), -1);
    }

    #[test]
    fn read_7bit_overflow() {
        let mut parser = parser(&[0xFF, 0xFF, 0xFF, 0xFF, 0x7F]);
        assert!(matches!(
            parser.read_7bit_encoded_int(),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn read_7bit_truncated() {
        let mut parser = parser(&[0x80, 0x80]);
        assert!(matches!(
            parser.read_7bit_encoded_int(),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn read_strings() {
        let mut parser = parser(&[0x02, b'h', b'i', 0x00, 0x03, 0xFF, 0xFE, 0xFD]);
        assert_eq!(parser.read_prefixed_string_utf8().unwrap(), "hi");
        assert_eq!(parser.read_prefixed_string_utf8().unwrap(), "");
        assert!(matches!(
            parser.read_prefixed_string_utf8(),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn read_prefixed_length_past_end() {
        let mut huge = parser(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F, b'a', b'b', b'c']);
        assert!(matches!(
            huge.read_prefixed_bytes(),
            Err(Error::OutOfBounds { .. })
        ));

        let mut short = parser(&[0x04, b'a', b'b', b'c']);
        assert!(matches!(
            short.read_prefixed_string_utf8(),
            Err(Error::OutOfBounds { .. })
        ));

        let mut exact = parser(&[0x03, b'a', b'b', b'c']);
        assert_eq!(exact.read_prefixed_bytes().unwrap(), b"abc");
    }

    #[test]
    fn read_string_at_restores_position() {
        let mut parser = parser(&[0x01, 0x02, 0x03, b'a', b'b', b'c']);
        assert_eq!(parser.read_le::<u8>().unwrap(), 1);
        assert_eq!(parser.read_string_at(2).unwrap(), "abc");
        assert_eq!(parser.pos().unwrap(), 1);
        assert_eq!(parser.read_le::<u8>().unwrap(), 2);
    }

    #[test]
    fn read_string_at_past_end() {
        let mut parser = parser(&[0x01, b'a']);
        assert!(matches!(
            parser.read_string_at(2),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(matches!(
            parser.read_string_at(100),
            Err(Error::OutOfBounds { .. })
        ));
        assert_eq!(parser.pos().unwrap(), 0);
    }

    #[test]
    fn at_restores_position_on_error() {
        let mut parser = parser(&[0x01, 0x02]);
        parser.seek(1).unwrap();
        let result = parser.at(0, |p| p.read_le::<u64>());
        assert!(result.is_err());
        assert_eq!(parser.pos().unwrap(), 1);
    }

    #[test]
    fn len_preserves_position() {
        let mut parser = parser(&[0x01, 0x02, 0x03]);
        parser.seek(2).unwrap();
        assert_eq!(parser.len().unwrap(), 3);
        assert_eq!(parser.pos().unwrap(), 2);
    }
}
