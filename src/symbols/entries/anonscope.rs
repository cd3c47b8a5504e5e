//! Closure capture metadata for compiler-synthesized anonymous scopes.
//!
//! When a lambda or iterator captures variables, the compiler hoists them into fields of a
//! display class. An [`AnonymousScope`] records, for one such class, which source-level
//! variables became which fields, and which nested scopes are reachable through it.

use std::io::{Read, Seek, Write};

use strum::{Display, FromRepr};

use crate::{
    file::{io::len_u32, output::Output, parser::Parser},
    Result,
};

/// What kind of source entity a captured variable was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[repr(u8)]
pub enum CapturedKind {
    /// A local variable
    Local = 0,
    /// A method parameter
    Parameter = 1,
    /// The `this` reference
    This = 2,
}

/// A variable hoisted into an anonymous scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedVariable {
    /// Source-level name
    pub name: String,
    /// Name of the generated field holding it
    pub captured_name: String,
    /// What the variable was
    pub kind: CapturedKind,
}

/// A nested anonymous scope reachable through a field of its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedScope {
    /// Id of the nested scope
    pub scope: u32,
    /// Name of the generated field referencing it
    pub captured_name: String,
}

/// One anonymous scope and everything it captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymousScope {
    /// Caller-assigned id
    pub id: u32,
    /// Hoisted variables, in definition order
    pub captured_variables: Vec<CapturedVariable>,
    /// Nested scopes, in definition order
    pub captured_scopes: Vec<CapturedScope>,
}

impl AnonymousScope {
    /// Create an empty anonymous scope.
    #[must_use]
    pub fn new(id: u32) -> Self {
        AnonymousScope {
            id,
            captured_variables: Vec::new(),
            captured_scopes: Vec::new(),
        }
    }

    /// Look up a captured variable by its source-level name.
    #[must_use]
    pub fn captured_variable(&self, name: &str) -> Option<&CapturedVariable> {
        self.captured_variables.iter().find(|var| var.name == name)
    }

    pub(crate) fn add_variable(&mut self, name: &str, captured_name: &str, kind: CapturedKind) {
        self.captured_variables.push(CapturedVariable {
            name: name.to_string(),
            captured_name: captured_name.to_string(),
            kind,
        });
    }

    pub(crate) fn add_scope(&mut self, scope: u32, captured_name: &str) {
        self.captured_scopes.push(CapturedScope {
            scope,
            captured_name: captured_name.to_string(),
        });
    }

    pub(crate) fn write<W: Write + Seek>(&self, output: &mut Output<W>) -> Result<()> {
        output.write_7bit_encoded_int(self.id)?;

        output.write_7bit_encoded_int(len_u32(self.captured_variables.len())?)?;
        for variable in &self.captured_variables {
            output.write_prefixed_string_utf8(&variable.name)?;
            output.write_prefixed_string_utf8(&variable.captured_name)?;
            output.write_le::<u8>(variable.kind as u8)?;
        }

        output.write_7bit_encoded_int(len_u32(self.captured_scopes.len())?)?;
        for scope in &self.captured_scopes {
            output.write_7bit_encoded_int(scope.scope)?;
            output.write_prefixed_string_utf8(&scope.captured_name)?;
        }
        Ok(())
    }

    pub(crate) fn read<R: Read + Seek>(parser: &mut Parser<R>) -> Result<Self> {
        let id = parser.read_7bit_encoded_int()?;

        let variable_count = parser.read_7bit_encoded_int()?;
        let mut captured_variables = Vec::new();
        for _ in 0..variable_count {
            let name = parser.read_prefixed_string_utf8()?;
            let captured_name = parser.read_prefixed_string_utf8()?;
            let raw_kind = parser.read_le::<u8>()?;
            let Some(kind) = CapturedKind::from_repr(raw_kind) else {
                return Err(malformed_error!(
                    "Invalid capture kind {} in anonymous scope {}",
                    raw_kind,
                    id
                ));
            };
            captured_variables.push(CapturedVariable {
                name,
                captured_name,
                kind,
            });
        }

        let scope_count = parser.read_7bit_encoded_int()?;
        let mut captured_scopes = Vec::new();
        for _ in 0..scope_count {
            let scope = parser.read_7bit_encoded_int()?;
            let captured_name = parser.read_prefixed_string_utf8()?;
            captured_scopes.push(CapturedScope {
                scope,
                captured_name,
            });
        }

        Ok(AnonymousScope {
            id,
            captured_variables,
            captured_scopes,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::Error;

    fn sample() -> AnonymousScope {
        let mut scope = AnonymousScope::new(7);
        scope.add_variable("count", "<count>5__1", CapturedKind::Local);
        scope.add_variable("target", "target", CapturedKind::Parameter);
        scope.add_variable("this", "<>4__this", CapturedKind::This);
        scope.add_scope(8, "CS$<>8__locals1");
        scope
    }

    #[test]
    fn write_read() {
        let scope = sample();

        let mut output = Output::new(Cursor::new(Vec::new()));
        scope.write(&mut output).unwrap();
        let bytes = output.into_inner().into_inner();
        assert_eq!(&bytes[..2], &[7, 3]);

        let read = AnonymousScope::read(&mut Parser::new(Cursor::new(bytes))).unwrap();
        assert_eq!(read, scope);
        assert_eq!(
            read.captured_variable("this").map(|var| var.kind),
            Some(CapturedKind::This)
        );
    }

    #[test]
    fn invalid_kind() {
        let bytes = vec![1, 1, 1, b'a', 1, b'b', 9, 0];
        assert!(matches!(
            AnonymousScope::read(&mut Parser::new(Cursor::new(bytes))),
            Err(Error::Malformed { .. })
        ));
    }
}
