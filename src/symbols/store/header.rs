//! Fixed-size preamble and header of a symbol file.
//!
//! ```text
//! offset  size  field
//! 0       8     magic (0x45e8_2623_fd7f_a614)
//! 8       4     major version (50)
//! 12      4     minor version (0)
//! 16      16    module GUID
//! 32      80    header: twenty little-endian int32 fields
//! ```

use bitflags::bitflags;

use crate::{
    file::io::{read_le_at, write_le_at},
    symbols::lineprogram::LineProgramOptions,
    Error, Result,
};

/// Magic number opening every symbol file.
pub const MAGIC: i64 = 0x45e8_2623_fd7f_a614;
/// Format major version written and accepted.
pub const MAJOR_VERSION: i32 = 50;
/// Format minor version written and accepted.
pub const MINOR_VERSION: i32 = 0;

/// Size of magic, versions and GUID.
pub const PREAMBLE_SIZE: usize = 32;
/// Size of the [`Header`] that follows the preamble.
pub const HEADER_SIZE: usize = 80;

/// Size of one method table record: token, data offset, line table offset.
pub const METHOD_RECORD_SIZE: u32 = 12;
/// Size of one source file table record: index, data offset.
pub const SOURCE_RECORD_SIZE: u32 = 8;
/// Size of one compile unit table record: index, data offset.
pub const COMPILE_UNIT_RECORD_SIZE: u32 = 8;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    /// File-wide flags stored in the header
    pub struct FileFlags: u32 {
        /// Source paths use Windows separators
        const WINDOWS_PATHS = 0x0001;
        /// Sources are ASP.NET pages
        const ASPX_SOURCE = 0x0002;
    }
}

/// The identification block at the start of a symbol file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preamble {
    /// Format major version
    pub major_version: i32,
    /// Format minor version
    pub minor_version: i32,
    /// GUID of the module the symbols belong to
    pub guid: uguid::Guid,
}

impl Preamble {
    /// A preamble for the current format version.
    #[must_use]
    pub fn new(guid: uguid::Guid) -> Self {
        Preamble {
            major_version: MAJOR_VERSION,
            minor_version: MINOR_VERSION,
            guid,
        }
    }

    /// Parse and validate a preamble.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] on a wrong magic number,
    /// [`crate::Error::UnsupportedVersion`] on any version other than 50.0, and
    /// [`crate::Error::OutOfBounds`] if `data` is too short.
    pub fn read(data: &[u8]) -> Result<Self> {
        if data.len() < PREAMBLE_SIZE {
            return Err(out_of_bounds_error!());
        }

        let mut offset = 0;
        let magic = read_le_at::<i64>(data, &mut offset)?;
        if magic != MAGIC {
            return Err(malformed_error!(
                "Invalid symbol file magic 0x{:016x}",
                magic
            ));
        }

        let major_version = read_le_at::<i32>(data, &mut offset)?;
        let minor_version = read_le_at::<i32>(data, &mut offset)?;
        if major_version != MAJOR_VERSION || minor_version != MINOR_VERSION {
            return Err(Error::UnsupportedVersion {
                major: major_version,
                minor: minor_version,
            });
        }

        let mut guid = [0u8; 16];
        guid.copy_from_slice(&data[offset..offset + 16]);

        Ok(Preamble {
            major_version,
            minor_version,
            guid: uguid::Guid::from_bytes(guid),
        })
    }

    /// Serialize to the on-disk layout.
    ///
    /// # Errors
    /// Never fails for an in-memory buffer; the signature follows the write helpers.
    pub fn to_bytes(&self) -> Result<[u8; PREAMBLE_SIZE]> {
        let mut data = [0u8; PREAMBLE_SIZE];
        let mut offset = 0;
        write_le_at(&mut data, &mut offset, MAGIC)?;
        write_le_at(&mut data, &mut offset, self.major_version)?;
        write_le_at(&mut data, &mut offset, self.minor_version)?;
        data[offset..].copy_from_slice(&self.guid.to_bytes());
        Ok(data)
    }
}

/// Section offsets, sizes and counts, plus the line-program parameters.
///
/// Written as zeros before any section and patched once every section is flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub struct Header {
    pub total_file_size: u32,
    pub data_section_offset: u32,
    pub data_section_size: u32,
    pub compile_unit_count: u32,
    pub compile_unit_table_offset: u32,
    pub compile_unit_table_size: u32,
    pub source_count: u32,
    pub source_table_offset: u32,
    pub source_table_size: u32,
    pub method_count: u32,
    pub method_table_offset: u32,
    pub method_table_size: u32,
    pub type_count: u32,
    pub anonymous_scope_count: u32,
    pub anonymous_scope_table_offset: u32,
    pub anonymous_scope_table_size: u32,
    pub line_base: i32,
    pub line_range: i32,
    pub opcode_base: i32,
    pub file_flags: u32,
}

impl Header {
    /// Parse a header from the 80 bytes following the preamble.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is too short.
    pub fn read(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(out_of_bounds_error!());
        }

        let mut offset = 0;
        Ok(Header {
            total_file_size: read_le_at(data, &mut offset)?,
            data_section_offset: read_le_at(data, &mut offset)?,
            data_section_size: read_le_at(data, &mut offset)?,
            compile_unit_count: read_le_at(data, &mut offset)?,
            compile_unit_table_offset: read_le_at(data, &mut offset)?,
            compile_unit_table_size: read_le_at(data, &mut offset)?,
            source_count: read_le_at(data, &mut offset)?,
            source_table_offset: read_le_at(data, &mut offset)?,
            source_table_size: read_le_at(data, &mut offset)?,
            method_count: read_le_at(data, &mut offset)?,
            method_table_offset: read_le_at(data, &mut offset)?,
            method_table_size: read_le_at(data, &mut offset)?,
            type_count: read_le_at(data, &mut offset)?,
            anonymous_scope_count: read_le_at(data, &mut offset)?,
            anonymous_scope_table_offset: read_le_at(data, &mut offset)?,
            anonymous_scope_table_size: read_le_at(data, &mut offset)?,
            line_base: read_le_at(data, &mut offset)?,
            line_range: read_le_at(data, &mut offset)?,
            opcode_base: read_le_at(data, &mut offset)?,
            file_flags: read_le_at(data, &mut offset)?,
        })
    }

    /// Serialize to the on-disk layout.
    ///
    /// # Errors
    /// Never fails for an in-memory buffer; the signature follows the write helpers.
    pub fn to_bytes(&self) -> Result<[u8; HEADER_SIZE]> {
        let mut data = [0u8; HEADER_SIZE];
        let offset = &mut 0;
        write_le_at(&mut data, offset, self.total_file_size)?;
        write_le_at(&mut data, offset, self.data_section_offset)?;
        write_le_at(&mut data, offset, self.data_section_size)?;
        write_le_at(&mut data, offset, self.compile_unit_count)?;
        write_le_at(&mut data, offset, self.compile_unit_table_offset)?;
        write_le_at(&mut data, offset, self.compile_unit_table_size)?;
        write_le_at(&mut data, offset, self.source_count)?;
        write_le_at(&mut data, offset, self.source_table_offset)?;
        write_le_at(&mut data, offset, self.source_table_size)?;
        write_le_at(&mut data, offset, self.method_count)?;
        write_le_at(&mut data, offset, self.method_table_offset)?;
        write_le_at(&mut data, offset, self.method_table_size)?;
        write_le_at(&mut data, offset, self.type_count)?;
        write_le_at(&mut data, offset, self.anonymous_scope_count)?;
        write_le_at(&mut data, offset, self.anonymous_scope_table_offset)?;
        write_le_at(&mut data, offset, self.anonymous_scope_table_size)?;
        write_le_at(&mut data, offset, self.line_base)?;
        write_le_at(&mut data, offset, self.line_range)?;
        write_le_at(&mut data, offset, self.opcode_base)?;
        write_le_at(&mut data, offset, self.file_flags)?;
        Ok(data)
    }

    /// Line-program parameters recorded in the header.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the stored values cannot drive a line program.
    pub fn line_program_options(&self) -> Result<LineProgramOptions> {
        LineProgramOptions::from_header(self.line_base, self.line_range, self.opcode_base)
    }

    /// File flags recorded in the header; unknown bits are dropped.
    #[must_use]
    pub fn file_flags(&self) -> FileFlags {
        FileFlags::from_bits_truncate(self.file_flags)
    }

    /// Absolute offset of the 1-based method table record `index`.
    pub(crate) fn method_record_offset(&self, index: u32) -> Result<u64> {
        record_offset(
            self.method_table_offset,
            self.method_count,
            METHOD_RECORD_SIZE,
            index,
        )
    }

    /// Absolute offset of the 1-based source table record `index`.
    pub(crate) fn source_record_offset(&self, index: u32) -> Result<u64> {
        record_offset(
            self.source_table_offset,
            self.source_count,
            SOURCE_RECORD_SIZE,
            index,
        )
    }

    /// Absolute offset of the 1-based compile unit table record `index`.
    pub(crate) fn compile_unit_record_offset(&self, index: u32) -> Result<u64> {
        record_offset(
            self.compile_unit_table_offset,
            self.compile_unit_count,
            COMPILE_UNIT_RECORD_SIZE,
            index,
        )
    }
}

fn record_offset(table_offset: u32, count: u32, record_size: u32, index: u32) -> Result<u64> {
    if index == 0 || index > count {
        return Err(out_of_bounds_error!());
    }
    Ok(u64::from(table_offset) + u64::from(index - 1) * u64::from(record_size))
}
