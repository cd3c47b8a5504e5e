//! Compiler-facing symbol writer.

use std::{
    fs::File,
    io::{BufWriter, Seek, Write},
    path::Path,
};

use crate::{
    symbols::{
        builder::MethodBuilder,
        entries::{CodeBlockKind, SourceFile},
        store::{StoreOptions, SymbolStore},
        token::Token,
    },
    Error, Result,
};

/// A source document registered with [`SymbolWriter::define_document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Document {
    /// Index of the source file
    pub source: u32,
    /// Index of the compile unit created for it
    pub compile_unit: u32,
}

/// Event-style writer driven by a compiler or IL rewriter.
///
/// Methods are opened and closed in call order; nested `open_method` calls stack, and every
/// per-method call goes to the innermost open method. Per-method calls made while no method is
/// open are ignored.
///
/// # Examples
///
/// ```rust
/// use std::io::Cursor;
/// use symstore::{SymbolStore, SymbolWriter, Token};
///
/// let mut writer = SymbolWriter::new();
/// let document = writer.define_document("Player.cs", vec![])?;
///
/// writer.open_method(Token::new(0x0600_0001), document.compile_unit, 0);
/// writer.mark_sequence_point(0, document.source, 12, 9, false);
/// writer.open_scope(0)?;
/// writer.define_local(0, "speed");
/// writer.mark_sequence_point(6, document.source, 13, 13, false);
/// writer.close_scope(20)?;
/// writer.close_method()?;
///
/// let bytes = writer.write_symbol_file(Cursor::new(Vec::new()), uguid::Guid::ZERO)?;
/// let store = SymbolStore::open(Cursor::new(bytes.into_inner()))?;
/// assert_eq!(store.method(1)?.locals()?[0].name, "speed");
/// # Ok::<(), symstore::Error>(())
/// ```
#[derive(Debug)]
pub struct SymbolWriter {
    store: SymbolStore,
    methods: Vec<MethodBuilder>,
}

impl Default for SymbolWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolWriter {
    /// Create a writer over an empty store with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    /// Create a writer over an empty store.
    #[must_use]
    pub fn with_options(options: StoreOptions) -> Self {
        SymbolWriter {
            store: SymbolStore::with_options(options),
            methods: Vec::new(),
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &SymbolStore {
        &self.store
    }

    /// The underlying store, for calls the writer does not forward.
    pub fn store_mut(&mut self) -> &mut SymbolStore {
        &mut self.store
    }

    /// Add a source file and a compile unit for it.
    ///
    /// # Errors
    /// Fails if the store was already written.
    pub fn define_document(&mut self, file_name: &str, checksum: Vec<u8>) -> Result<Document> {
        let source = self.store.add_source(SourceFile::new(file_name, checksum))?;
        let compile_unit = self.store.add_compile_unit(source)?;
        Ok(Document {
            source,
            compile_unit,
        })
    }

    /// Add a compile unit for an existing source file.
    ///
    /// # Errors
    /// As [`SymbolStore::add_compile_unit`].
    pub fn define_compile_unit(&mut self, source: u32) -> Result<u32> {
        self.store.add_compile_unit(source)
    }

    /// Declare a namespace.
    ///
    /// # Errors
    /// As [`SymbolStore::define_namespace`].
    pub fn define_namespace(
        &mut self,
        compile_unit: u32,
        name: &str,
        using_clauses: Vec<String>,
        parent: u32,
    ) -> Result<u32> {
        self.store
            .define_namespace(compile_unit, name, using_clauses, parent)
    }

    /// Start a method; it becomes the target of every per-method call until closed.
    pub fn open_method(&mut self, token: Token, compile_unit: u32, namespace_id: u32) {
        self.methods
            .push(MethodBuilder::new(token, compile_unit).with_namespace(namespace_id));
    }

    /// Finish the innermost open method and add it to the store. Does nothing if none is open.
    ///
    /// # Errors
    /// As [`MethodBuilder::define_method`].
    pub fn close_method(&mut self) -> Result<()> {
        match self.methods.pop() {
            Some(builder) => builder.define_method(&mut self.store),
            None => Ok(()),
        }
    }

    /// Open a lexical scope at `start_offset`; returns its block index, or `None` with no
    /// method open.
    ///
    /// # Errors
    /// As [`MethodBuilder::start_block`].
    pub fn open_scope(&mut self, start_offset: u32) -> Result<Option<u32>> {
        self.open_block(CodeBlockKind::Lexical, start_offset)
    }

    /// Open a block of any kind at `start_offset`.
    ///
    /// # Errors
    /// As [`MethodBuilder::start_block`].
    pub fn open_block(&mut self, kind: CodeBlockKind, start_offset: u32) -> Result<Option<u32>> {
        self.methods
            .last_mut()
            .map(|method| method.start_block(kind, start_offset))
            .transpose()
    }

    /// Close the innermost open block of the current method.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnbalancedBlock`] if the current method has no open block.
    pub fn close_scope(&mut self, end_offset: u32) -> Result<()> {
        match self.methods.last_mut() {
            Some(method) => method.end_block(end_offset),
            None => Ok(()),
        }
    }

    /// Add a local to the current method's innermost open block.
    pub fn define_local(&mut self, index: u32, name: &str) {
        if let Some(method) = self.methods.last_mut() {
            method.add_local(index, name);
        }
    }

    /// Record that a local of the current method is captured by anonymous scope `scope`.
    pub fn define_scope_variable(&mut self, scope: u32, local: u32) {
        if let Some(method) = self.methods.last_mut() {
            method.add_scope_variable(scope, local);
        }
    }

    /// Record the source-level name of the current method.
    pub fn set_method_real_name(&mut self, name: &str) {
        if let Some(method) = self.methods.last_mut() {
            method.set_real_name(name);
        }
    }

    /// Record a sequence point in the current method.
    pub fn mark_sequence_point(
        &mut self,
        offset: u32,
        file: u32,
        row: i32,
        column: i32,
        is_hidden: bool,
    ) {
        if let Some(method) = self.methods.last_mut() {
            method.mark_sequence_point(offset, file, row, column, is_hidden);
        }
    }

    /// Record a sequence point with an end position in the current method.
    #[allow(clippy::too_many_arguments)]
    pub fn mark_sequence_point_with_end(
        &mut self,
        offset: u32,
        file: u32,
        row: i32,
        column: i32,
        end_row: i32,
        end_column: i32,
        is_hidden: bool,
    ) {
        if let Some(method) = self.methods.last_mut() {
            method.mark_sequence_point_with_end(
                offset, file, row, column, end_row, end_column, is_hidden,
            );
        }
    }

    /// Declare an anonymous scope.
    ///
    /// # Errors
    /// As [`SymbolStore::define_anonymous_scope`].
    pub fn define_anonymous_scope(&mut self, id: u32) -> Result<()> {
        self.store.define_anonymous_scope(id)
    }

    /// Record a local hoisted into anonymous scope `scope`.
    ///
    /// # Errors
    /// As [`SymbolStore::define_captured_local`].
    pub fn define_captured_local(
        &mut self,
        scope: u32,
        name: &str,
        captured_name: &str,
    ) -> Result<()> {
        self.store.define_captured_local(scope, name, captured_name)
    }

    /// Record a parameter hoisted into anonymous scope `scope`.
    ///
    /// # Errors
    /// As [`SymbolStore::define_captured_parameter`].
    pub fn define_captured_parameter(
        &mut self,
        scope: u32,
        name: &str,
        captured_name: &str,
    ) -> Result<()> {
        self.store
            .define_captured_parameter(scope, name, captured_name)
    }

    /// Record that anonymous scope `scope` captures `this`.
    ///
    /// # Errors
    /// As [`SymbolStore::define_captured_this`].
    pub fn define_captured_this(&mut self, scope: u32, captured_name: &str) -> Result<()> {
        self.store.define_captured_this(scope, captured_name)
    }

    /// Record a nested anonymous scope.
    ///
    /// # Errors
    /// As [`SymbolStore::define_captured_scope`].
    pub fn define_captured_scope(
        &mut self,
        scope: u32,
        captured_scope: u32,
        captured_name: &str,
    ) -> Result<()> {
        self.store
            .define_captured_scope(scope, captured_scope, captured_name)
    }

    /// Seal the store into `writer`.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnbalancedBlock`] while a method is still open, otherwise as
    /// [`SymbolStore::seal`].
    pub fn write_symbol_file<W: Write + Seek>(&mut self, writer: W, guid: uguid::Guid) -> Result<W> {
        if let Some(method) = self.methods.last() {
            return Err(Error::UnbalancedBlock(format!(
                "method {} is still open",
                method.token()
            )));
        }
        self.store.seal(writer, guid)
    }

    /// Create the file at `path` and seal the store into it.
    ///
    /// # Errors
    /// As [`SymbolWriter::write_symbol_file`], plus [`crate::Error::FileError`] if the file
    /// cannot be created or flushed.
    pub fn write_to_path(&mut self, path: impl AsRef<Path>, guid: uguid::Guid) -> Result<()> {
        let file = BufWriter::new(File::create(path)?);
        let mut file = self.write_symbol_file(file, guid)?;
        file.flush()?;
        Ok(())
    }

    /// Consume the writer and return its store.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnbalancedBlock`] while a method is still open.
    pub fn into_store(self) -> Result<SymbolStore> {
        if let Some(method) = self.methods.last() {
            return Err(Error::UnbalancedBlock(format!(
                "method {} is still open",
                method.token()
            )));
        }
        Ok(self.store)
    }
}
