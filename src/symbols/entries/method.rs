//! Method records and their lazily loaded sub-tables.
//!
//! A method is stored as four variable-length tables (locals, code blocks, scope variables,
//! optional real name), its line-number program, and a trailer that points back at each table.
//! The method table only records the token, the trailer offset and the program offset, so a
//! bound store can list methods without touching any sub-table; each sub-table is read the first
//! time it is asked for.
//!
//! # Key Components
//!
//! - [`MethodDefinition`] - Plain data handed to [`crate::SymbolStore::define_method`]
//! - [`Method`] - A defined or bound method with hydrate-once accessors
//! - [`MethodFlags`] - Which optional line-program data the method carries

use std::{
    collections::HashSet,
    fmt,
    io::{Read, Seek, Write},
    sync::{Arc, Weak},
};

use bitflags::bitflags;

use crate::{
    file::{output::Output, parser::Parser},
    symbols::{
        entries::{CodeBlock, LocalVariable, ScopeVariable},
        lineprogram::{decode, LineNumberEntry, LineNumberTable, LineProgramOptions, NO_END_INFO},
        store::{bound::Shared, lazy::Lazy},
        token::Token,
    },
    Error, Result,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    /// Per-method flags stored in the method trailer
    pub struct MethodFlags: u32 {
        /// Two locals share a name; debuggers must not resolve locals by name alone
        const AMBIGUOUS_LOCALS = 0x0001;
        /// The line-number program carries start columns
        const COLUMNS_INCLUDED = 0x0002;
        /// The line-number program carries end positions
        const END_INFO_INCLUDED = 0x0004;
    }
}

/// Everything needed to define a method in an authoring store.
///
/// # Examples
///
/// ```rust
/// use symstore::{
///     symbols::{entries::{LocalVariable, MethodDefinition}, lineprogram::LineNumberEntry},
///     Token,
/// };
///
/// let definition = MethodDefinition::new(Token::new(0x0600_0001), 1)
///     .with_locals(vec![LocalVariable::new(0, "count", 0)])
///     .with_line_numbers(vec![
///         LineNumberEntry::new(1, 10, 0, false),
///         LineNumberEntry::new(1, 11, 6, false),
///     ]);
/// assert_eq!(definition.line_numbers.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDefinition {
    /// Caller-chosen key, unique per store
    pub token: Token,
    /// Owning compile unit
    pub compile_unit: u32,
    /// Index of the enclosing namespace, 0 for none
    pub namespace_id: u32,
    /// Named locals
    pub locals: Vec<LocalVariable>,
    /// Lexical blocks, indexed contiguously from 1
    pub code_blocks: Vec<CodeBlock>,
    /// Locals captured into anonymous scopes
    pub scope_variables: Vec<ScopeVariable>,
    /// Sequence points, non-decreasing in offset
    pub line_numbers: Vec<LineNumberEntry>,
    /// Name of the method as written in source, when it differs from the metadata name
    pub real_name: Option<String>,
    /// Force the [`MethodFlags::AMBIGUOUS_LOCALS`] flag
    pub ambiguous_locals: bool,
}

impl MethodDefinition {
    /// Create an empty definition.
    #[must_use]
    pub fn new(token: Token, compile_unit: u32) -> Self {
        MethodDefinition {
            token,
            compile_unit,
            namespace_id: 0,
            locals: Vec::new(),
            code_blocks: Vec::new(),
            scope_variables: Vec::new(),
            line_numbers: Vec::new(),
            real_name: None,
            ambiguous_locals: false,
        }
    }

    /// Set the enclosing namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace_id: u32) -> Self {
        self.namespace_id = namespace_id;
        self
    }

    /// Set the locals.
    #[must_use]
    pub fn with_locals(mut self, locals: Vec<LocalVariable>) -> Self {
        self.locals = locals;
        self
    }

    /// Set the code blocks.
    #[must_use]
    pub fn with_code_blocks(mut self, code_blocks: Vec<CodeBlock>) -> Self {
        self.code_blocks = code_blocks;
        self
    }

    /// Set the scope variables.
    #[must_use]
    pub fn with_scope_variables(mut self, scope_variables: Vec<ScopeVariable>) -> Self {
        self.scope_variables = scope_variables;
        self
    }

    /// Set the sequence points.
    #[must_use]
    pub fn with_line_numbers(mut self, line_numbers: Vec<LineNumberEntry>) -> Self {
        self.line_numbers = line_numbers;
        self
    }

    /// Set the source-level name.
    #[must_use]
    pub fn with_real_name(mut self, real_name: impl Into<String>) -> Self {
        self.real_name = Some(real_name.into());
        self
    }

    /// Force the ambiguous-locals flag.
    #[must_use]
    pub fn with_ambiguous_locals(mut self, ambiguous_locals: bool) -> Self {
        self.ambiguous_locals = ambiguous_locals;
        self
    }

    /// Check the entry invariants a method must satisfy before it is encoded.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a null sequence point, a decreasing offset, or
    /// code blocks whose indices are not `1..=n` in table order.
    pub fn validate(&self) -> Result<()> {
        let mut last_offset = 0;
        for (position, entry) in self.line_numbers.iter().enumerate() {
            if entry.is_null() {
                return Err(malformed_error!(
                    "Method {} has a null sequence point at position {}",
                    self.token,
                    position
                ));
            }
            if entry.offset < last_offset {
                return Err(malformed_error!(
                    "Method {} sequence point {} goes back from offset {} to {}",
                    self.token,
                    position,
                    last_offset,
                    entry.offset
                ));
            }
            if entry.has_end() && entry.end_row.wrapping_sub(entry.row) as u32 == NO_END_INFO {
                return Err(malformed_error!(
                    "Method {} sequence point {} ends {} lines after it starts",
                    self.token,
                    position,
                    NO_END_INFO
                ));
            }
            last_offset = entry.offset;
        }

        for (position, block) in (1u32..).zip(&self.code_blocks) {
            if block.index != position {
                return Err(malformed_error!(
                    "Method {} code block at position {} has index {}",
                    self.token,
                    position,
                    block.index
                ));
            }
        }
        Ok(())
    }

    /// Flags derived from the definition's contents.
    #[must_use]
    pub fn flags(&self) -> MethodFlags {
        let mut flags = MethodFlags::empty();

        let mut names = HashSet::new();
        if self.ambiguous_locals || !self.locals.iter().all(|local| names.insert(&local.name)) {
            flags |= MethodFlags::AMBIGUOUS_LOCALS;
        }
        if self.line_numbers.iter().any(LineNumberEntry::has_column) {
            flags |= MethodFlags::COLUMNS_INCLUDED;
        }
        if self.line_numbers.iter().any(LineNumberEntry::has_end) {
            flags |= MethodFlags::END_INFO_INCLUDED;
        }
        flags
    }
}

/// The trailer written after a method's payload; its position is the method's data offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct MethodTrailer {
    pub compile_unit: u32,
    pub local_table_offset: u32,
    pub namespace_id: u32,
    pub code_block_table_offset: u32,
    pub scope_variable_table_offset: u32,
    pub real_name_offset: u32,
    pub flags: u32,
}

impl MethodTrailer {
    pub(crate) fn write<W: Write + Seek>(&self, output: &mut Output<W>) -> Result<()> {
        output.write_7bit_encoded_int(self.compile_unit)?;
        output.write_7bit_encoded_int(self.local_table_offset)?;
        output.write_7bit_encoded_int(self.namespace_id)?;
        output.write_7bit_encoded_int(self.code_block_table_offset)?;
        output.write_7bit_encoded_int(self.scope_variable_table_offset)?;
        output.write_7bit_encoded_int(self.real_name_offset)?;
        output.write_7bit_encoded_int(self.flags)
    }

    pub(crate) fn read<R: Read + Seek>(parser: &mut Parser<R>) -> Result<Self> {
        Ok(MethodTrailer {
            compile_unit: parser.read_7bit_encoded_int()?,
            local_table_offset: parser.read_7bit_encoded_int()?,
            namespace_id: parser.read_7bit_encoded_int()?,
            code_block_table_offset: parser.read_7bit_encoded_int()?,
            scope_variable_table_offset: parser.read_7bit_encoded_int()?,
            real_name_offset: parser.read_7bit_encoded_int()?,
            flags: parser.read_7bit_encoded_int()?,
        })
    }
}

/// A method's debug information.
///
/// Methods defined in an authoring store hold their tables in memory. Methods of a bound store
/// read each table on first access and keep it; the accessors then fail with
/// [`crate::Error::NotBound`] once the store has been dropped.
pub struct Method {
    token: Token,
    index: u32,
    compile_unit: u32,
    namespace_id: u32,
    flags: MethodFlags,
    options: LineProgramOptions,
    locals: Lazy<Vec<LocalVariable>>,
    code_blocks: Lazy<Vec<CodeBlock>>,
    scope_variables: Lazy<Vec<ScopeVariable>>,
    line_numbers: Lazy<LineNumberTable>,
    real_name: Lazy<Option<String>>,
    store: Weak<Shared>,
}

impl Method {
    /// Build an in-memory method from a validated definition.
    pub(crate) fn authoring(definition: MethodDefinition, options: LineProgramOptions) -> Self {
        let flags = definition.flags();
        Method {
            token: definition.token,
            index: 0,
            compile_unit: definition.compile_unit,
            namespace_id: definition.namespace_id,
            flags,
            options,
            locals: Lazy::authoring(definition.locals),
            code_blocks: Lazy::authoring(definition.code_blocks),
            scope_variables: Lazy::authoring(definition.scope_variables),
            line_numbers: Lazy::authoring(LineNumberTable::new(definition.line_numbers)),
            real_name: Lazy::authoring(definition.real_name),
            store: Weak::new(),
        }
    }

    /// Build a method of a bound store from its table record and trailer.
    pub(crate) fn bound(
        token: Token,
        index: u32,
        line_table_offset: u32,
        trailer: &MethodTrailer,
        options: LineProgramOptions,
        store: Weak<Shared>,
    ) -> Self {
        let real_name = if trailer.real_name_offset == 0 {
            Lazy::hydrated(None)
        } else {
            Lazy::unhydrated(trailer.real_name_offset)
        };

        Method {
            token,
            index,
            compile_unit: trailer.compile_unit,
            namespace_id: trailer.namespace_id,
            flags: MethodFlags::from_bits_truncate(trailer.flags),
            options,
            locals: Lazy::unhydrated(trailer.local_table_offset),
            code_blocks: Lazy::unhydrated(trailer.code_block_table_offset),
            scope_variables: Lazy::unhydrated(trailer.scope_variable_table_offset),
            line_numbers: Lazy::unhydrated(line_table_offset),
            real_name,
            store,
        }
    }

    /// The caller-supplied key.
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// 1-based position in token order; 0 until the store is sealed.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: u32) {
        self.index = index;
    }

    /// Owning compile unit.
    #[must_use]
    pub fn compile_unit(&self) -> u32 {
        self.compile_unit
    }

    /// Enclosing namespace index, 0 for none.
    #[must_use]
    pub fn namespace_id(&self) -> u32 {
        self.namespace_id
    }

    /// Stored flags.
    #[must_use]
    pub fn flags(&self) -> MethodFlags {
        self.flags
    }

    /// Named locals.
    ///
    /// # Errors
    /// Fails if the table cannot be read from the bound file.
    pub fn locals(&self) -> Result<Arc<Vec<LocalVariable>>> {
        self.locals
            .get_or_hydrate(|offset| self.read_at(offset, LocalVariable::read_table))
    }

    /// Lexical blocks.
    ///
    /// # Errors
    /// Fails if the table cannot be read from the bound file.
    pub fn code_blocks(&self) -> Result<Arc<Vec<CodeBlock>>> {
        self.code_blocks
            .get_or_hydrate(|offset| self.read_at(offset, CodeBlock::read_table))
    }

    /// Locals captured into anonymous scopes.
    ///
    /// # Errors
    /// Fails if the table cannot be read from the bound file.
    pub fn scope_variables(&self) -> Result<Arc<Vec<ScopeVariable>>> {
        self.scope_variables
            .get_or_hydrate(|offset| self.read_at(offset, ScopeVariable::read_table))
    }

    /// Decoded sequence points.
    ///
    /// Columns and end positions are present only if the method was flagged with them.
    ///
    /// # Errors
    /// Fails if the program cannot be read or decoded.
    pub fn line_number_table(&self) -> Result<Arc<LineNumberTable>> {
        let columns = self.flags.contains(MethodFlags::COLUMNS_INCLUDED);
        let ends = self.flags.contains(MethodFlags::END_INFO_INCLUDED);
        self.line_numbers.get_or_hydrate(|offset| {
            log::trace!("decoding line table of method {} at {}", self.token, offset);
            self.read_at(offset, |parser| {
                decode(parser, &self.options, columns, ends)
            })
        })
    }

    /// Source-level name, if one was recorded.
    ///
    /// # Errors
    /// Fails if the name cannot be read from the bound file.
    pub fn real_name(&self) -> Result<Option<String>> {
        let name = self.real_name.get_or_hydrate(|offset| {
            self.read_at(offset, |parser| parser.read_prefixed_string_utf8().map(Some))
        })?;
        Ok((*name).clone())
    }

    /// Returns `true` once the line-number program is in memory.
    #[must_use]
    pub fn is_line_table_loaded(&self) -> bool {
        self.line_numbers.is_loaded()
    }

    fn read_at<T, F>(&self, offset: u32, f: F) -> Result<T>
    where
        F: FnOnce(&mut Parser<Box<dyn crate::file::SymbolSource>>) -> Result<T>,
    {
        let store = self.store.upgrade().ok_or(Error::NotBound)?;
        store.read_at(offset, f)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("token", &self.token)
            .field("index", &self.index)
            .field("compile_unit", &self.compile_unit)
            .field("namespace_id", &self.namespace_id)
            .field("flags", &self.flags)
            .field("line_numbers", &self.line_numbers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::symbols::entries::CodeBlockKind;

    fn definition() -> MethodDefinition {
        MethodDefinition::new(Token::new(0x0600_0010), 1).with_line_numbers(vec![
            LineNumberEntry::new(1, 10, 0, false),
            LineNumberEntry::new(1, 12, 4, false),
            LineNumberEntry::new(1, 12, 4, true),
        ])
    }

    #[test]
    fn validate_accepts_equal_offsets() {
        assert!(definition().validate().is_ok());
    }

    #[test]
    fn validate_rejects_decreasing_offset() {
        let mut def = definition();
        def.line_numbers.push(LineNumberEntry::new(1, 13, 3, false));
        assert!(matches!(def.validate(), Err(Error::Malformed { .. })));
    }

    #[test]
    fn validate_rejects_null_entry() {
        let mut def = definition();
        def.line_numbers.insert(0, LineNumberEntry::NULL);
        assert!(matches!(def.validate(), Err(Error::Malformed { .. })));
    }

    #[test]
    fn validate_rejects_reserved_end_delta() {
        let mut def = definition();
        def.line_numbers
            .push(LineNumberEntry::new(1, 20, 40, false).with_end(20 + 0xFF_FFFF, 3));
        assert!(matches!(def.validate(), Err(Error::Malformed { .. })));

        let mut def = definition();
        def.line_numbers
            .push(LineNumberEntry::new(1, 20, 40, false).with_end(20 + 0xFF_FFFE, 3));
        assert!(def.validate().is_ok());
    }

    #[test]
    fn validate_rejects_gapped_blocks() {
        let def = definition().with_code_blocks(vec![
            CodeBlock::new(1, -1, CodeBlockKind::Lexical, 0, 4),
            CodeBlock::new(3, -1, CodeBlockKind::Lexical, 4, 8),
        ]);
        assert!(matches!(def.validate(), Err(Error::Malformed { .. })));
    }

    #[test]
    fn derived_flags() {
        assert_eq!(definition().flags(), MethodFlags::empty());

        let mut def = definition().with_locals(vec![
            LocalVariable::new(0, "item", 1),
            LocalVariable::new(1, "item", 2),
        ]);
        def.line_numbers[1].column = 5;
        assert_eq!(
            def.flags(),
            MethodFlags::AMBIGUOUS_LOCALS | MethodFlags::COLUMNS_INCLUDED
        );

        def.line_numbers[2].end_row = 14;
        assert!(def.flags().contains(MethodFlags::END_INFO_INCLUDED));
        assert!(definition()
            .with_ambiguous_locals(true)
            .flags()
            .contains(MethodFlags::AMBIGUOUS_LOCALS));
    }

    #[test]
    fn authoring_method_serves_tables() {
        let method = Method::authoring(
            definition().with_real_name("Update"),
            LineProgramOptions::default(),
        );
        assert_eq!(method.index(), 0);
        assert_eq!(method.line_number_table().unwrap().len(), 3);
        assert!(method.locals().unwrap().is_empty());
        assert_eq!(method.real_name().unwrap().as_deref(), Some("Update"));
    }

    #[test]
    fn detached_bound_method() {
        let method = Method::bound(
            Token::new(1),
            1,
            64,
            &MethodTrailer::default(),
            LineProgramOptions::default(),
            Weak::new(),
        );
        assert!(matches!(method.locals(), Err(Error::NotBound)));
        assert_eq!(method.real_name().unwrap(), None);
    }

    #[test]
    fn trailer_write_read() {
        let trailer = MethodTrailer {
            compile_unit: 1,
            local_table_offset: 300,
            namespace_id: 2,
            code_block_table_offset: 301,
            scope_variable_table_offset: 302,
            real_name_offset: 0,
            flags: 6,
        };
        let mut output = Output::new(Cursor::new(Vec::new()));
        trailer.write(&mut output).unwrap();
        let bytes = output.into_inner().into_inner();
        assert_eq!(bytes.len(), 10);

        let read = MethodTrailer::read(&mut Parser::new(Cursor::new(bytes))).unwrap();
        assert_eq!(read, trailer);
    }
}
