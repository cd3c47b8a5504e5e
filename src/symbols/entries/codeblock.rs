//! Code block records describing a method's lexical scope tree.

use std::io::{Read, Seek, Write};

use strum::{Display, EnumIter, FromRepr};

use crate::{
    file::{io::len_u32, output::Output, parser::Parser},
    Result,
};

/// What a code block represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, FromRepr)]
#[repr(u32)]
pub enum CodeBlockKind {
    /// A `{ ... }` scope in source
    Lexical = 1,
    /// A region introduced by the compiler; also used for index placeholders
    CompilerGenerated = 2,
    /// The body of an iterator state machine
    IteratorBody = 3,
    /// The dispatcher switch of an iterator state machine
    IteratorDispatcher = 4,
}

/// A contiguous offset range of a method body, nested inside its parent block.
///
/// Blocks are numbered from 1 in table order; on disk the index is implicit. A `parent` of `-1`
/// marks a block directly inside the method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodeBlock {
    /// 1-based index, equal to the table position plus one
    pub index: u32,
    /// Index of the enclosing block, `-1` if none
    pub parent: i32,
    /// Block kind
    pub kind: CodeBlockKind,
    /// First offset covered
    pub start_offset: u32,
    /// Offset at which the block was closed
    pub end_offset: u32,
}

impl CodeBlock {
    /// Create a code block record.
    #[must_use]
    pub fn new(
        index: u32,
        parent: i32,
        kind: CodeBlockKind,
        start_offset: u32,
        end_offset: u32,
    ) -> Self {
        CodeBlock {
            index,
            parent,
            kind,
            start_offset,
            end_offset,
        }
    }

    /// A zero-length block standing in for a missing index.
    #[must_use]
    pub fn placeholder(index: u32) -> Self {
        CodeBlock::new(index, -1, CodeBlockKind::CompilerGenerated, 0, 0)
    }

    pub(crate) fn write_table<W: Write + Seek>(
        blocks: &[CodeBlock],
        output: &mut Output<W>,
    ) -> Result<()> {
        output.write_7bit_encoded_int(len_u32(blocks.len())?)?;
        for block in blocks {
            output.write_7bit_encoded_int(block.kind as u32)?;
            output.write_7bit_encoded_i32(block.parent)?;
            output.write_7bit_encoded_int(block.start_offset)?;
            output.write_7bit_encoded_int(block.end_offset)?;
        }
        Ok(())
    }

    pub(crate) fn read_table<R: Read + Seek>(parser: &mut Parser<R>) -> Result<Vec<Self>> {
        let count = parser.read_7bit_encoded_int()?;
        let mut blocks = Vec::new();
        for index in 1..=count {
            let raw_kind = parser.read_7bit_encoded_int()?;
            let Some(kind) = CodeBlockKind::from_repr(raw_kind) else {
                return Err(malformed_error!(
                    "Invalid kind {} for code block {}",
                    raw_kind,
                    index
                ));
            };

            blocks.push(CodeBlock {
                index,
                kind,
                parent: parser.read_7bit_encoded_i32()?,
                start_offset: parser.read_7bit_encoded_int()?,
                end_offset: parser.read_7bit_encoded_int()?,
            });
        }
        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use strum::IntoEnumIterator;

    use super::*;
    use crate::Error;

    #[test]
    fn kinds() {
        let kinds: Vec<u32> = CodeBlockKind::iter().map(|kind| kind as u32).collect();
        assert_eq!(kinds, [1, 2, 3, 4]);
        assert_eq!(CodeBlockKind::from_repr(3), Some(CodeBlockKind::IteratorBody));
        assert_eq!(CodeBlockKind::from_repr(0), None);
        assert_eq!(CodeBlockKind::Lexical.to_string(), "Lexical");
    }

    #[test]
    fn table_write_read() {
        let blocks = vec![
            CodeBlock::new(1, -1, CodeBlockKind::Lexical, 0, 40),
            CodeBlock::new(2, 1, CodeBlockKind::IteratorDispatcher, 4, 12),
            CodeBlock::placeholder(3),
        ];

        let mut output = Output::new(Cursor::new(Vec::new()));
        CodeBlock::write_table(&blocks, &mut output).unwrap();
        let bytes = output.into_inner().into_inner();
        assert_eq!(&bytes[..8], &[3, 1, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F, 0]);

        let read = CodeBlock::read_table(&mut Parser::new(Cursor::new(bytes))).unwrap();
        assert_eq!(read, blocks);
    }

    #[test]
    fn invalid_kind() {
        let bytes = vec![1, 9, 0, 0, 0];
        assert!(matches!(
            CodeBlock::read_table(&mut Parser::new(Cursor::new(bytes))),
            Err(Error::Malformed { .. })
        ));
    }
}
