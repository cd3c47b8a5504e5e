//! Compile unit records.

use std::io::{Read, Seek, Write};

use crate::{
    file::{io::len_u32, output::Output, parser::Parser},
    symbols::entries::Namespace,
    Result,
};

/// One compilation input: a primary source file, the files it includes, and the namespaces it
/// declares.
///
/// While a store is being authored the unit grows through
/// [`crate::SymbolStore::add_include_file`] and [`crate::SymbolStore::define_namespace`]. A
/// bound store reads the whole unit on first access and caches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileUnit {
    /// 1-based index in the compile unit table
    pub index: u32,
    /// Index of the primary [`crate::symbols::entries::SourceFile`]
    pub source: u32,
    /// Indices of included source files
    pub include_files: Vec<u32>,
    /// Namespaces in declaration order
    pub namespaces: Vec<Namespace>,
}

impl CompileUnit {
    pub(crate) fn new(index: u32, source: u32) -> Self {
        CompileUnit {
            index,
            source,
            include_files: Vec::new(),
            namespaces: Vec::new(),
        }
    }

    /// Look up a namespace by its store-wide index.
    #[must_use]
    pub fn namespace(&self, index: u32) -> Option<&Namespace> {
        self.namespaces.iter().find(|ns| ns.index == index)
    }

    pub(crate) fn write<W: Write + Seek>(&self, output: &mut Output<W>) -> Result<()> {
        output.write_7bit_encoded_int(self.source)?;

        output.write_7bit_encoded_int(len_u32(self.include_files.len())?)?;
        for include in &self.include_files {
            output.write_7bit_encoded_int(*include)?;
        }

        output.write_7bit_encoded_int(len_u32(self.namespaces.len())?)?;
        for namespace in &self.namespaces {
            namespace.write(output)?;
        }
        Ok(())
    }

    pub(crate) fn read<R: Read + Seek>(parser: &mut Parser<R>, index: u32) -> Result<Self> {
        let source = parser.read_7bit_encoded_int()?;

        let include_count = parser.read_7bit_encoded_int()?;
        let mut include_files = Vec::new();
        for _ in 0..include_count {
            include_files.push(parser.read_7bit_encoded_int()?);
        }

        let namespace_count = parser.read_7bit_encoded_int()?;
        let mut namespaces = Vec::new();
        for _ in 0..namespace_count {
            namespaces.push(Namespace::read(parser)?);
        }

        Ok(CompileUnit {
            index,
            source,
            include_files,
            namespaces,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn write_read() {
        let mut unit = CompileUnit::new(2, 5);
        unit.include_files.extend([6, 7]);
        unit.namespaces.push(Namespace {
            name: "Game".into(),
            index: 1,
            parent: 0,
            using_clauses: vec!["System".into()],
        });
        unit.namespaces.push(Namespace {
            name: "Game.UI".into(),
            index: 2,
            parent: 1,
            using_clauses: Vec::new(),
        });

        let mut output = Output::new(Cursor::new(Vec::new()));
        unit.write(&mut output).unwrap();
        let bytes = output.into_inner().into_inner();
        assert_eq!(&bytes[..4], &[5, 2, 6, 7]);

        let read = CompileUnit::read(&mut Parser::new(Cursor::new(bytes)), 2).unwrap();
        assert_eq!(read, unit);
        assert_eq!(read.namespace(2).map(|ns| ns.parent), Some(1));
        assert!(read.namespace(9).is_none());
    }

    #[test]
    fn truncated_unit() {
        // claims two includes but only carries one
        let bytes = vec![1, 2, 3];
        assert!(matches!(
            CompileUnit::read(&mut Parser::new(Cursor::new(bytes)), 1),
            Err(crate::Error::OutOfBounds { .. })
        ));
    }
}
