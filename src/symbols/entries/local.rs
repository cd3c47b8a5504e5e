//! Local variable records.

use std::io::{Read, Seek, Write};

use crate::{
    file::{io::len_u32, output::Output, parser::Parser},
    Result,
};

/// A named local variable slot of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalVariable {
    /// Slot index in the method's local signature
    pub index: u32,
    /// Source-level name
    pub name: String,
    /// Index of the enclosing code block, 0 at method level
    pub block_index: u32,
}

impl LocalVariable {
    /// Create a local variable record.
    #[must_use]
    pub fn new(index: u32, name: impl Into<String>, block_index: u32) -> Self {
        LocalVariable {
            index,
            name: name.into(),
            block_index,
        }
    }

    pub(crate) fn write_table<W: Write + Seek>(
        locals: &[LocalVariable],
        output: &mut Output<W>,
    ) -> Result<()> {
        output.write_7bit_encoded_int(len_u32(locals.len())?)?;
        for local in locals {
            output.write_7bit_encoded_int(local.index)?;
            output.write_prefixed_string_utf8(&local.name)?;
            output.write_7bit_encoded_int(local.block_index)?;
        }
        Ok(())
    }

    pub(crate) fn read_table<R: Read + Seek>(parser: &mut Parser<R>) -> Result<Vec<Self>> {
        let count = parser.read_7bit_encoded_int()?;
        let mut locals = Vec::new();
        for _ in 0..count {
            locals.push(LocalVariable {
                index: parser.read_7bit_encoded_int()?,
                name: parser.read_prefixed_string_utf8()?,
                block_index: parser.read_7bit_encoded_int()?,
            });
        }
        Ok(locals)
    }
}
