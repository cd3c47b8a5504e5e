//! Positioned writer for emitting symbol files.
//!
//! This module provides the [`crate::file::output::Output`] type, the write-side counterpart of
//! [`crate::file::parser::Parser`]. Symbol files are written in a single forward pass whose
//! offsets are recorded from the current write position, followed by a seek back to patch the
//! header, so the output needs both [`std::io::Write`] and [`std::io::Seek`].
//!
//! All offsets in the format are 32-bit; [`Output::pos`] fails once the stream grows past that.

use std::io::{Seek, SeekFrom, Write};

use crate::{
    file::io::{write_7bit_encoded_i32, write_7bit_encoded_int, SymIO},
    Result,
};

/// A positioned writer over a seekable sink.
pub struct Output<W> {
    inner: W,
}

impl<W: Write + Seek> Output<W> {
    /// Create a new [`Output`] writing to `inner` at its current position.
    pub fn new(inner: W) -> Self {
        Output { inner }
    }

    /// Consume the output and return the underlying sink.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Current write position as a 32-bit file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the sink cannot report its position, or
    /// [`crate::Error::Malformed`] if the position no longer fits a 32-bit offset.
    pub fn pos(&mut self) -> Result<u32> {
        let pos = self.inner.stream_position()?;
        u32::try_from(pos)
            .map_err(|_| malformed_error!("Symbol file exceeds 32-bit offsets at {}", pos))
    }

    /// Move the write position to an absolute offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the sink cannot seek.
    pub fn seek(&mut self, pos: u32) -> Result<()> {
        self.inner.seek(SeekFrom::Start(u64::from(pos)))?;
        Ok(())
    }

    /// Move the write position to the end of the stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the sink cannot seek.
    pub fn seek_end(&mut self) -> Result<()> {
        self.inner.seek(SeekFrom::End(0))?;
        Ok(())
    }

    /// Write raw bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] on I/O failure.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data)?;
        Ok(())
    }

    /// Write a value in little-endian byte order.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] on I/O failure.
    pub fn write_le<T: SymIO>(&mut self, value: T) -> Result<()> {
        self.write_bytes(value.to_le_bytes().as_ref())
    }

    /// Write a base-128 encoded unsigned integer.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] on I/O failure.
    pub fn write_7bit_encoded_int(&mut self, value: u32) -> Result<()> {
        let mut buffer = Vec::with_capacity(5);
        write_7bit_encoded_int(value, &mut buffer);
        self.write_bytes(&buffer)
    }

    /// Write a base-128 encoded signed integer as its `u32` bit pattern.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] on I/O failure.
    pub fn write_7bit_encoded_i32(&mut self, value: i32) -> Result<()> {
        let mut buffer = Vec::with_capacity(5);
        write_7bit_encoded_i32(value, &mut buffer);
        self.write_bytes(&buffer)
    }

    /// Write a base-128 length followed by the raw bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the data is longer than a 32-bit length, or
    /// [`crate::Error::FileError`] on I/O failure.
    pub fn write_prefixed_bytes(&mut self, data: &[u8]) -> Result<()> {
        let length = u32::try_from(data.len())
            .map_err(|_| malformed_error!("Byte run of {} bytes is too long", data.len()))?;
        self.write_7bit_encoded_int(length)?;
        self.write_bytes(data)
    }

    /// Write a length-prefixed UTF-8 string.
    ///
    /// # Errors
    /// Same as [`Output::write_prefixed_bytes`].
    pub fn write_prefixed_string_utf8(&mut self, value: &str) -> Result<()> {
        self.write_prefixed_bytes(value.as_bytes())
    }
}
