//! The symbol store container.
//!
//! A [`SymbolStore`] is in one of three states:
//!
//! - **Authoring**: created with [`SymbolStore::new`]; sources, compile units, namespaces,
//!   methods and anonymous scopes are appended and numbered.
//! - **Sealed**: after [`SymbolStore::seal`] wrote everything out. No further changes.
//! - **Bound**: created with [`SymbolStore::open`] over an existing symbol file; read-only,
//!   entries are read on first access and cached.
//!
//! Mutating a bound store fails with [`crate::Error::ReadOnly`], mutating or re-sealing a sealed
//! one with [`crate::Error::AlreadySealed`], and reading anything but counts from a store that is
//! not bound fails with [`crate::Error::NotBound`].
//!
//! # Examples
//!
//! ```rust
//! use std::io::Cursor;
//! use symstore::{
//!     symbols::{entries::{MethodDefinition, SourceFile}, lineprogram::LineNumberEntry},
//!     SymbolStore, Token,
//! };
//!
//! let mut store = SymbolStore::new();
//! let source = store.add_source(SourceFile::new("Player.cs", vec![]))?;
//! let unit = store.add_compile_unit(source)?;
//! store.define_method(
//!     MethodDefinition::new(Token::new(0x0600_0001), unit)
//!         .with_line_numbers(vec![LineNumberEntry::new(source, 14, 0, false)]),
//! )?;
//!
//! let guid = uguid::guid!("d437908e-65e6-487c-9735-7bdff699bea5");
//! let bytes = store.seal(Cursor::new(Vec::new()), guid)?.into_inner();
//!
//! let bound = SymbolStore::open(Cursor::new(bytes))?;
//! let method = bound.method_by_token(Token::new(0x0600_0001))?;
//! assert_eq!(method.line_number_table()?.entries()[0].row, 14);
//! # Ok::<(), symstore::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! A bound store is [`Send`] and [`Sync`]. Every read holds the store lock for its whole
//! seek / read / restore sequence, so concurrent readers serialize on the shared stream.
//! Authoring is single-threaded and takes `&mut self`.

pub(crate) mod bound;
pub mod header;
pub(crate) mod lazy;
mod seal;

use std::{
    collections::HashSet,
    io::{Cursor, Seek, Write},
    path::Path,
    sync::Arc,
};

use crate::{
    file::{output::Output, physical::Physical, SymbolSource},
    symbols::{
        entries::{
            AnonymousScope, CapturedKind, CompileUnit, Method, MethodDefinition, Namespace,
            SourceFile,
        },
        lineprogram::LineProgramOptions,
        store::{
            bound::Shared,
            header::{FileFlags, Header},
        },
        token::Token,
    },
    Error, Result,
};

/// Settings recorded in the header of a newly authored symbol file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreOptions {
    line_program: LineProgramOptions,
    file_flags: FileFlags,
}

impl StoreOptions {
    /// Default line-program parameters and no flags.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use custom line-program parameters.
    #[must_use]
    pub fn with_line_program(mut self, line_program: LineProgramOptions) -> Self {
        self.line_program = line_program;
        self
    }

    /// Set the file flags.
    #[must_use]
    pub fn with_file_flags(mut self, file_flags: FileFlags) -> Self {
        self.file_flags = file_flags;
        self
    }

    /// Line-program parameters.
    #[must_use]
    pub fn line_program(&self) -> LineProgramOptions {
        self.line_program
    }

    /// File flags.
    #[must_use]
    pub fn file_flags(&self) -> FileFlags {
        self.file_flags
    }
}

/// Mutable contents of an authoring store.
pub(crate) struct Authoring {
    options: StoreOptions,
    sources: Vec<SourceFile>,
    compile_units: Vec<CompileUnit>,
    methods: Vec<Method>,
    tokens: HashSet<Token>,
    anonymous_scopes: Vec<AnonymousScope>,
    last_type_index: u32,
    last_method_index: u32,
    last_namespace_index: u32,
}

impl Authoring {
    fn new(options: StoreOptions) -> Self {
        Authoring {
            options,
            sources: Vec::new(),
            compile_units: Vec::new(),
            methods: Vec::new(),
            tokens: HashSet::new(),
            anonymous_scopes: Vec::new(),
            last_type_index: 0,
            last_method_index: 0,
            last_namespace_index: 0,
        }
    }

    fn check_source(&self, index: u32) -> Result<()> {
        if index == 0 || index as usize > self.sources.len() {
            return Err(out_of_bounds_error!());
        }
        Ok(())
    }

    fn compile_unit_mut(&mut self, index: u32) -> Result<&mut CompileUnit> {
        let position = (index as usize)
            .checked_sub(1)
            .ok_or(out_of_bounds_error!())?;
        self.compile_units
            .get_mut(position)
            .ok_or(out_of_bounds_error!())
    }

    fn anonymous_scope_mut(&mut self, id: u32) -> Result<&mut AnonymousScope> {
        self.anonymous_scopes
            .iter_mut()
            .find(|scope| scope.id == id)
            .ok_or_else(|| Error::NotFound(format!("anonymous scope {id}")))
    }
}

enum StoreState {
    Authoring(Box<Authoring>),
    Sealed(Header),
    Bound(Arc<Shared>),
}

/// A debug-symbol store, either being authored or bound to a symbol file for reading.
///
/// See the [module documentation](crate::symbols::store) for the lifecycle.
pub struct SymbolStore {
    state: StoreState,
}

impl Default for SymbolStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolStore {
    /// Create an empty authoring store with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    /// Create an empty authoring store.
    #[must_use]
    pub fn with_options(options: StoreOptions) -> Self {
        SymbolStore {
            state: StoreState::Authoring(Box::new(Authoring::new(options))),
        }
    }

    /// Bind a store to an existing symbol file.
    ///
    /// Only the preamble and header are read here; everything else is read on demand.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a wrong magic number or damaged header,
    /// [`crate::Error::UnsupportedVersion`] for any version but 50.0, and
    /// [`crate::Error::OutOfBounds`] for a stream too short to hold the header.
    pub fn open<S: SymbolSource + 'static>(source: S) -> Result<Self> {
        Ok(SymbolStore {
            state: StoreState::Bound(Shared::open(Box::new(source))?),
        })
    }

    /// Bind a store to an existing symbol file, checking that it belongs to module `guid`.
    ///
    /// # Errors
    /// As [`SymbolStore::open`], plus [`crate::Error::GuidMismatch`].
    pub fn open_with_guid<S: SymbolSource + 'static>(source: S, guid: uguid::Guid) -> Result<Self> {
        let store = Self::open(source)?;
        let found = store.guid()?;
        if found != guid {
            return Err(Error::GuidMismatch {
                expected: guid,
                found,
            });
        }
        Ok(store)
    }

    /// Memory-map the symbol file at `path` and bind a store to it.
    ///
    /// # Errors
    /// As [`SymbolStore::open`], plus [`crate::Error::FileError`] if the file cannot be mapped.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let physical = Physical::new(path)?;
        Self::open(Cursor::new(physical))
    }

    /// Returns `true` for a store opened over a symbol file.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        matches!(self.state, StoreState::Bound(_))
    }

    /// Returns `true` once an authoring store has been written out.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        matches!(self.state, StoreState::Sealed(_))
    }

    fn authoring(&mut self) -> Result<&mut Authoring> {
        match &mut self.state {
            StoreState::Authoring(authoring) => Ok(authoring.as_mut()),
            StoreState::Sealed(_) => Err(Error::AlreadySealed),
            StoreState::Bound(_) => Err(Error::ReadOnly),
        }
    }

    fn bound(&self) -> Result<&Arc<Shared>> {
        match &self.state {
            StoreState::Bound(shared) => Ok(shared),
            _ => Err(Error::NotBound),
        }
    }

    // ==========================================================================================
    // Authoring
    // ==========================================================================================

    /// Append a source file and return its 1-based index.
    ///
    /// # Errors
    /// Fails if the store is not authoring.
    pub fn add_source(&mut self, mut source: SourceFile) -> Result<u32> {
        let authoring = self.authoring()?;
        let index = crate::file::io::len_u32(authoring.sources.len() + 1)?;
        source.index = index;
        authoring.sources.push(source);
        Ok(index)
    }

    /// Append a compile unit for source file `source` and return its 1-based index.
    ///
    /// # Errors
    /// Fails if the store is not authoring, or with [`crate::Error::OutOfBounds`] for an
    /// unknown source.
    pub fn add_compile_unit(&mut self, source: u32) -> Result<u32> {
        let authoring = self.authoring()?;
        authoring.check_source(source)?;

        let index = crate::file::io::len_u32(authoring.compile_units.len() + 1)?;
        authoring.compile_units.push(CompileUnit::new(index, source));
        Ok(index)
    }

    /// Record that compile unit `compile_unit` includes source file `source`.
    ///
    /// # Errors
    /// Fails if the store is not authoring, or with [`crate::Error::OutOfBounds`] for an
    /// unknown compile unit or source.
    pub fn add_include_file(&mut self, compile_unit: u32, source: u32) -> Result<()> {
        let authoring = self.authoring()?;
        authoring.check_source(source)?;
        authoring
            .compile_unit_mut(compile_unit)?
            .include_files
            .push(source);
        Ok(())
    }

    /// Declare a namespace in `compile_unit` and return its store-wide index.
    ///
    /// `parent` is the index of an earlier namespace, or 0 at top level.
    ///
    /// # Errors
    /// Fails if the store is not authoring, or with [`crate::Error::OutOfBounds`] for an
    /// unknown compile unit or parent.
    pub fn define_namespace(
        &mut self,
        compile_unit: u32,
        name: &str,
        using_clauses: Vec<String>,
        parent: u32,
    ) -> Result<u32> {
        let authoring = self.authoring()?;
        if parent > authoring.last_namespace_index {
            return Err(out_of_bounds_error!());
        }
        authoring.compile_unit_mut(compile_unit)?;

        authoring.last_namespace_index += 1;
        let index = authoring.last_namespace_index;
        authoring
            .compile_unit_mut(compile_unit)?
            .namespaces
            .push(Namespace {
                name: name.to_string(),
                index,
                parent,
                using_clauses,
            });
        Ok(index)
    }

    /// Add a method.
    ///
    /// The method gets its index when the store is sealed, in ascending token order.
    ///
    /// # Errors
    /// Fails if the store is not authoring; with [`crate::Error::Malformed`] if the definition
    /// breaks an entry invariant (see [`MethodDefinition::validate`]); with
    /// [`crate::Error::OutOfBounds`] for an unknown compile unit; and with
    /// [`crate::Error::Duplicate`] for a token that was already defined.
    pub fn define_method(&mut self, definition: MethodDefinition) -> Result<()> {
        let authoring = self.authoring()?;
        definition.validate()?;

        if definition.compile_unit == 0
            || definition.compile_unit as usize > authoring.compile_units.len()
        {
            return Err(out_of_bounds_error!());
        }
        if !authoring.tokens.insert(definition.token) {
            return Err(Error::Duplicate(format!("method {}", definition.token)));
        }

        let options = authoring.options.line_program();
        authoring.methods.push(Method::authoring(definition, options));
        Ok(())
    }

    /// Reserve the next type index, starting at 1.
    ///
    /// # Errors
    /// Fails if the store is not authoring.
    pub fn next_type_index(&mut self) -> Result<u32> {
        let authoring = self.authoring()?;
        authoring.last_type_index += 1;
        Ok(authoring.last_type_index)
    }

    /// Reserve the next method index, starting at 1.
    ///
    /// # Errors
    /// Fails if the store is not authoring.
    pub fn next_method_index(&mut self) -> Result<u32> {
        let authoring = self.authoring()?;
        authoring.last_method_index += 1;
        Ok(authoring.last_method_index)
    }

    /// Reserve the next namespace index, starting at 1.
    ///
    /// Shares its counter with [`SymbolStore::define_namespace`].
    ///
    /// # Errors
    /// Fails if the store is not authoring.
    pub fn next_namespace_index(&mut self) -> Result<u32> {
        let authoring = self.authoring()?;
        authoring.last_namespace_index += 1;
        Ok(authoring.last_namespace_index)
    }

    /// Declare an anonymous scope with a caller-chosen id.
    ///
    /// # Errors
    /// Fails if the store is not authoring, or with [`crate::Error::Duplicate`] for a reused id.
    pub fn define_anonymous_scope(&mut self, id: u32) -> Result<()> {
        let authoring = self.authoring()?;
        if authoring.anonymous_scopes.iter().any(|scope| scope.id == id) {
            return Err(Error::Duplicate(format!("anonymous scope {id}")));
        }
        authoring.anonymous_scopes.push(AnonymousScope::new(id));
        Ok(())
    }

    /// Record a local hoisted into anonymous scope `scope`.
    ///
    /// # Errors
    /// Fails if the store is not authoring, or with [`crate::Error::NotFound`] for an unknown
    /// scope.
    pub fn define_captured_local(
        &mut self,
        scope: u32,
        name: &str,
        captured_name: &str,
    ) -> Result<()> {
        self.authoring()?
            .anonymous_scope_mut(scope)?
            .add_variable(name, captured_name, CapturedKind::Local);
        Ok(())
    }

    /// Record a parameter hoisted into anonymous scope `scope`.
    ///
    /// # Errors
    /// As [`SymbolStore::define_captured_local`].
    pub fn define_captured_parameter(
        &mut self,
        scope: u32,
        name: &str,
        captured_name: &str,
    ) -> Result<()> {
        self.authoring()?
            .anonymous_scope_mut(scope)?
            .add_variable(name, captured_name, CapturedKind::Parameter);
        Ok(())
    }

    /// Record that anonymous scope `scope` captures `this` in field `captured_name`.
    ///
    /// # Errors
    /// As [`SymbolStore::define_captured_local`].
    pub fn define_captured_this(&mut self, scope: u32, captured_name: &str) -> Result<()> {
        self.authoring()?
            .anonymous_scope_mut(scope)?
            .add_variable("this", captured_name, CapturedKind::This);
        Ok(())
    }

    /// Record that anonymous scope `scope` reaches scope `captured_scope` through field
    /// `captured_name`.
    ///
    /// # Errors
    /// As [`SymbolStore::define_captured_local`].
    pub fn define_captured_scope(
        &mut self,
        scope: u32,
        captured_scope: u32,
        captured_name: &str,
    ) -> Result<()> {
        self.authoring()?
            .anonymous_scope_mut(scope)?
            .add_scope(captured_scope, captured_name);
        Ok(())
    }

    /// Write the store to `writer` in one pass and patch the header.
    ///
    /// The file starts at offset 0 of `writer`. On success the store becomes sealed and the
    /// writer is handed back, positioned at the end of the file.
    ///
    /// # Errors
    /// Fails with [`crate::Error::AlreadySealed`] or [`crate::Error::ReadOnly`] if the store is
    /// not authoring, and with the underlying error if writing fails.
    pub fn seal<W: Write + Seek>(&mut self, writer: W, guid: uguid::Guid) -> Result<W> {
        let authoring = self.authoring()?;

        let mut output = Output::new(writer);
        let header = seal::write_symbol_file(authoring, &mut output, guid)?;

        self.state = StoreState::Sealed(header);
        Ok(output.into_inner())
    }

    // ==========================================================================================
    // Reading
    // ==========================================================================================

    /// GUID of the module the symbols belong to.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotBound`] unless the store is bound.
    pub fn guid(&self) -> Result<uguid::Guid> {
        Ok(self.bound()?.preamble.guid)
    }

    /// The file header.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotBound`] while authoring.
    pub fn header(&self) -> Result<Header> {
        match &self.state {
            StoreState::Bound(shared) => Ok(shared.header),
            StoreState::Sealed(header) => Ok(*header),
            StoreState::Authoring(_) => Err(Error::NotBound),
        }
    }

    /// Line-program parameters used for this store.
    #[must_use]
    pub fn line_program_options(&self) -> LineProgramOptions {
        match &self.state {
            StoreState::Authoring(authoring) => authoring.options.line_program(),
            StoreState::Sealed(header) => header.line_program_options().unwrap_or_default(),
            StoreState::Bound(shared) => shared.options,
        }
    }

    /// File flags of this store.
    #[must_use]
    pub fn file_flags(&self) -> FileFlags {
        match &self.state {
            StoreState::Authoring(authoring) => authoring.options.file_flags(),
            StoreState::Sealed(header) => header.file_flags(),
            StoreState::Bound(shared) => shared.header.file_flags(),
        }
    }

    fn count(&self, authoring: impl Fn(&Authoring) -> usize, header: impl Fn(&Header) -> u32) -> u32 {
        match &self.state {
            StoreState::Authoring(state) => u32::try_from(authoring(state)).unwrap_or(u32::MAX),
            StoreState::Sealed(state) => header(state),
            StoreState::Bound(shared) => header(&shared.header),
        }
    }

    /// Number of source files.
    #[must_use]
    pub fn source_count(&self) -> u32 {
        self.count(|a| a.sources.len(), |h| h.source_count)
    }

    /// Number of compile units.
    #[must_use]
    pub fn compile_unit_count(&self) -> u32 {
        self.count(|a| a.compile_units.len(), |h| h.compile_unit_count)
    }

    /// Number of methods.
    #[must_use]
    pub fn method_count(&self) -> u32 {
        self.count(|a| a.methods.len(), |h| h.method_count)
    }

    /// Number of anonymous scopes.
    #[must_use]
    pub fn anonymous_scope_count(&self) -> u32 {
        self.count(|a| a.anonymous_scopes.len(), |h| h.anonymous_scope_count)
    }

    /// Number of type indices reserved while authoring.
    #[must_use]
    pub fn type_count(&self) -> u32 {
        self.count(|a| a.last_type_index as usize, |h| h.type_count)
    }

    /// Source file by 1-based index.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotBound`] unless bound, [`crate::Error::OutOfBounds`] for an
    /// index outside `1..=source_count`.
    pub fn source_file(&self, index: u32) -> Result<Arc<SourceFile>> {
        self.bound()?.source_file(index)
    }

    /// All source files in index order.
    ///
    /// # Errors
    /// As [`SymbolStore::source_file`].
    pub fn sources(&self) -> Result<Vec<Arc<SourceFile>>> {
        let shared = self.bound()?;
        (1..=shared.header.source_count)
            .map(|index| shared.source_file(index))
            .collect()
    }

    /// The first source file named `file_name`.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotFound`] if no source file has that name.
    pub fn find_source(&self, file_name: &str) -> Result<Arc<SourceFile>> {
        let shared = self.bound()?;
        for index in 1..=shared.header.source_count {
            let source = shared.source_file(index)?;
            if source.file_name == file_name {
                return Ok(source);
            }
        }
        Err(Error::NotFound(format!("source file {file_name}")))
    }

    /// Compile unit by 1-based index.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotBound`] unless bound, [`crate::Error::OutOfBounds`] for an
    /// index outside `1..=compile_unit_count`.
    pub fn compile_unit(&self, index: u32) -> Result<Arc<CompileUnit>> {
        self.bound()?.compile_unit(index)
    }

    /// All compile units in index order.
    ///
    /// # Errors
    /// As [`SymbolStore::compile_unit`].
    pub fn compile_units(&self) -> Result<Vec<Arc<CompileUnit>>> {
        let shared = self.bound()?;
        (1..=shared.header.compile_unit_count)
            .map(|index| shared.compile_unit(index))
            .collect()
    }

    /// Method by 1-based index (ascending token order).
    ///
    /// # Errors
    /// Returns [`crate::Error::NotBound`] unless bound, [`crate::Error::OutOfBounds`] for an
    /// index outside `1..=method_count`.
    pub fn method(&self, index: u32) -> Result<Arc<Method>> {
        self.bound()?.method(index)
    }

    /// Method by token.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotBound`] unless bound, [`crate::Error::MethodNotFound`] for an
    /// unknown token.
    pub fn method_by_token(&self, token: Token) -> Result<Arc<Method>> {
        self.bound()?.method_by_token(token)
    }

    /// All methods in index order.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotBound`] unless bound.
    pub fn methods(&self) -> Result<Vec<Arc<Method>>> {
        self.bound()?.methods()
    }

    /// Anonymous scope by id.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotBound`] unless bound, [`crate::Error::NotFound`] for an unknown
    /// id.
    pub fn anonymous_scope(&self, id: u32) -> Result<Arc<AnonymousScope>> {
        self.bound()?.anonymous_scope(id)
    }

    /// All anonymous scopes ordered by id.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotBound`] unless bound.
    pub fn anonymous_scopes(&self) -> Result<Vec<Arc<AnonymousScope>>> {
        self.bound()?.anonymous_scopes()
    }

    /// Read a length-prefixed string at an absolute file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotBound`] unless bound, [`crate::Error::OutOfBounds`] for an
    /// offset past the end of the file.
    pub fn read_string_at(&self, offset: u32) -> Result<String> {
        self.bound()?.read_string_at(offset)
    }
}

impl std::fmt::Debug for SymbolStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            StoreState::Authoring(_) => "Authoring",
            StoreState::Sealed(_) => "Sealed",
            StoreState::Bound(_) => "Bound",
        };
        f.debug_struct("SymbolStore")
            .field("state", &state)
            .field("sources", &self.source_count())
            .field("compile_units", &self.compile_unit_count())
            .field("methods", &self.method_count())
            .finish()
    }
}
