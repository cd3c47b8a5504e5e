//! Scope variable records.

use std::io::{Read, Seek, Write};

use crate::{
    file::{io::len_u32, output::Output, parser::Parser},
    Result,
};

/// Associates a local with the anonymous scope that captures it.
///
/// Unlike [`crate::symbols::entries::LocalVariable::block_index`], the scope here refers to an
/// [`crate::symbols::entries::AnonymousScope`] id, not to a code block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeVariable {
    /// Anonymous scope id
    pub scope: u32,
    /// Local slot index
    pub local: u32,
}

impl ScopeVariable {
    /// Create a scope variable record.
    #[must_use]
    pub fn new(scope: u32, local: u32) -> Self {
        ScopeVariable { scope, local }
    }

    pub(crate) fn write_table<W: Write + Seek>(
        variables: &[ScopeVariable],
        output: &mut Output<W>,
    ) -> Result<()> {
        output.write_7bit_encoded_int(len_u32(variables.len())?)?;
        for variable in variables {
            output.write_7bit_encoded_int(variable.scope)?;
            output.write_7bit_encoded_int(variable.local)?;
        }
        Ok(())
    }

    pub(crate) fn read_table<R: Read + Seek>(parser: &mut Parser<R>) -> Result<Vec<Self>> {
        let count = parser.read_7bit_encoded_int()?;
        let mut variables = Vec::new();
        for _ in 0..count {
            let scope = parser.read_7bit_encoded_int()?;
            let local = parser.read_7bit_encoded_int()?;
            variables.push(ScopeVariable { scope, local });
        }
        Ok(variables)
    }
}
