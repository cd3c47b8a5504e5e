//! Source file records.

use std::io::{Read, Seek, Write};

use md5::{Digest, Md5};

use crate::{
    file::{output::Output, parser::Parser},
    Result,
};

/// A source document referenced by line-number programs.
///
/// The checksum is opaque identity data; [`SourceFile::with_content`] fills it with the MD5
/// digest of the document, which is what debuggers compare against the file on disk.
///
/// # Examples
///
/// ```rust
/// use symstore::symbols::entries::SourceFile;
///
/// let source = SourceFile::with_content("Player.cs", b"class Player {}");
/// assert!(source.check_checksum(b"class Player {}"));
/// assert!(!source.check_checksum(b"class Enemy {}"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// 1-based index, assigned when the file is added to a store
    pub index: u32,
    /// Path of the document as the compiler saw it
    pub file_name: String,
    /// Identity bytes of the document contents
    pub checksum: Vec<u8>,
    /// The document was generated by a tool and not written by hand
    pub auto_generated: bool,
}

impl SourceFile {
    /// Create a source file record with explicit identity bytes.
    #[must_use]
    pub fn new(file_name: impl Into<String>, checksum: Vec<u8>) -> Self {
        SourceFile {
            index: 0,
            file_name: file_name.into(),
            checksum,
            auto_generated: false,
        }
    }

    /// Create a source file record whose checksum is the MD5 digest of `content`.
    #[must_use]
    pub fn with_content(file_name: impl Into<String>, content: &[u8]) -> Self {
        Self::new(file_name, Md5::digest(content).to_vec())
    }

    /// Mark the document as tool-generated.
    #[must_use]
    pub fn auto_generated(mut self, auto_generated: bool) -> Self {
        self.auto_generated = auto_generated;
        self
    }

    /// Returns `true` if `content` hashes to the stored MD5 checksum.
    ///
    /// Always `false` for records without a 16-byte checksum.
    #[must_use]
    pub fn check_checksum(&self, content: &[u8]) -> bool {
        self.checksum.len() == 16 && Md5::digest(content).as_slice() == self.checksum.as_slice()
    }

    pub(crate) fn write<W: Write + Seek>(&self, output: &mut Output<W>) -> Result<()> {
        output.write_prefixed_string_utf8(&self.file_name)?;
        output.write_prefixed_bytes(&self.checksum)?;
        output.write_le::<u8>(u8::from(self.auto_generated))
    }

    pub(crate) fn read<R: Read + Seek>(parser: &mut Parser<R>, index: u32) -> Result<Self> {
        let file_name = parser.read_prefixed_string_utf8()?;
        let checksum = parser.read_prefixed_bytes()?;
        let auto_generated = parser.read_le::<u8>()? != 0;

        Ok(SourceFile {
            index,
            file_name,
            checksum,
            auto_generated,
        })
    }
}
