//! Namespace records stored inside compile units.

use std::io::{Read, Seek, Write};

use crate::{
    file::{io::len_u32, output::Output, parser::Parser},
    Result,
};

/// A namespace declared in a compile unit, with the `using` clauses in effect inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// Fully qualified name
    pub name: String,
    /// Store-wide index, assigned from the namespace counter
    pub index: u32,
    /// Index of the enclosing namespace, 0 at top level
    pub parent: u32,
    /// Namespaces imported by `using` clauses
    pub using_clauses: Vec<String>,
}

impl Namespace {
    pub(crate) fn write<W: Write + Seek>(&self, output: &mut Output<W>) -> Result<()> {
        output.write_prefixed_string_utf8(&self.name)?;
        output.write_7bit_encoded_int(self.index)?;
        output.write_7bit_encoded_int(self.parent)?;

        output.write_7bit_encoded_int(len_u32(self.using_clauses.len())?)?;
        for clause in &self.using_clauses {
            output.write_prefixed_string_utf8(clause)?;
        }
        Ok(())
    }

    pub(crate) fn read<R: Read + Seek>(parser: &mut Parser<R>) -> Result<Self> {
        let name = parser.read_prefixed_string_utf8()?;
        let index = parser.read_7bit_encoded_int()?;
        let parent = parser.read_7bit_encoded_int()?;

        let count = parser.read_7bit_encoded_int()?;
        let mut using_clauses = Vec::new();
        for _ in 0..count {
            using_clauses.push(parser.read_prefixed_string_utf8()?);
        }

        Ok(Namespace {
            name,
            index,
            parent,
            using_clauses,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn write_read() {
        let namespace = Namespace {
            name: "Game.Entities".into(),
            index: 3,
            parent: 1,
            using_clauses: vec!["System".into(), "UnityEngine".into()],
        };

        let mut output = Output::new(Cursor::new(Vec::new()));
        namespace.write(&mut output).unwrap();

        let mut parser = Parser::new(output.into_inner());
        parser.seek(0).unwrap();
        assert_eq!(Namespace::read(&mut parser).unwrap(), namespace);
    }
}
