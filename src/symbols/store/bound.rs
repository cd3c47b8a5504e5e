//! Random-access read layer over a sealed symbol file.
//!
//! One parser serves every reader. Each lookup takes the store lock for its whole
//! seek / read / restore sequence, checks the per-kind cache, and on a miss reads the entry and
//! caches it permanently. Entries are handed out as `Arc`s and never change afterwards.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{
    file::{parser::Parser, SymbolSource},
    symbols::{
        entries::{AnonymousScope, CompileUnit, Method, MethodTrailer, SourceFile},
        lineprogram::LineProgramOptions,
        store::header::{Header, Preamble, HEADER_SIZE, PREAMBLE_SIZE},
        token::Token,
    },
    Error, Result,
};

type Source = Parser<Box<dyn SymbolSource>>;

struct MethodIndex {
    ordered: Vec<Arc<Method>>,
    by_token: HashMap<Token, Arc<Method>>,
}

struct BoundState {
    parser: Source,
    sources: HashMap<u32, Arc<SourceFile>>,
    compile_units: HashMap<u32, Arc<CompileUnit>>,
    methods: Option<MethodIndex>,
    anonymous_scopes: Option<HashMap<u32, Arc<AnonymousScope>>>,
}

/// State shared between a bound store and the methods it hands out.
pub(crate) struct Shared {
    pub(crate) preamble: Preamble,
    pub(crate) header: Header,
    pub(crate) options: LineProgramOptions,
    state: Mutex<BoundState>,
}

impl Shared {
    pub(crate) fn open(source: Box<dyn SymbolSource>) -> Result<Arc<Shared>> {
        let mut parser = Parser::new(source);
        parser.seek(0)?;

        let preamble = Preamble::read(&parser.read_bytes(PREAMBLE_SIZE)?)?;
        let header = Header::read(&parser.read_bytes(HEADER_SIZE)?)?;
        let options = header.line_program_options()?;

        let length = parser.len()?;
        if u64::from(header.total_file_size) > length {
            return Err(malformed_error!(
                "Header claims {} bytes but the stream holds {}",
                header.total_file_size,
                length
            ));
        }

        log::debug!(
            "opened symbol file {}: {} sources, {} compile units, {} methods",
            preamble.guid,
            header.source_count,
            header.compile_unit_count,
            header.method_count
        );

        Ok(Arc::new(Shared {
            preamble,
            header,
            options,
            state: Mutex::new(BoundState {
                parser,
                sources: HashMap::new(),
                compile_units: HashMap::new(),
                methods: None,
                anonymous_scopes: None,
            }),
        }))
    }

    /// Run `f` at `offset` under the store lock, restoring the parser position afterwards.
    pub(crate) fn read_at<T, F>(&self, offset: u32, f: F) -> Result<T>
    where
        F: FnOnce(&mut Source) -> Result<T>,
    {
        let mut state = lock!(self.state);
        state.parser.at(u64::from(offset), f)
    }

    pub(crate) fn read_string_at(&self, offset: u32) -> Result<String> {
        let mut state = lock!(self.state);
        state.parser.read_string_at(u64::from(offset))
    }

    pub(crate) fn source_file(&self, index: u32) -> Result<Arc<SourceFile>> {
        let record = self.header.source_record_offset(index)?;

        let mut state = lock!(self.state);
        if let Some(source) = state.sources.get(&index) {
            return Ok(Arc::clone(source));
        }

        log::trace!("reading source file {index}");
        let source = state.parser.at(record, |parser| {
            read_record_index(parser, index)?;
            let data_offset = parser.read_le::<u32>()?;
            parser.seek(u64::from(data_offset))?;
            SourceFile::read(parser, index)
        })?;

        let source = Arc::new(source);
        state.sources.insert(index, Arc::clone(&source));
        Ok(source)
    }

    pub(crate) fn compile_unit(&self, index: u32) -> Result<Arc<CompileUnit>> {
        let record = self.header.compile_unit_record_offset(index)?;

        let mut state = lock!(self.state);
        if let Some(unit) = state.compile_units.get(&index) {
            return Ok(Arc::clone(unit));
        }

        log::trace!("reading compile unit {index}");
        let unit = state.parser.at(record, |parser| {
            read_record_index(parser, index)?;
            let data_offset = parser.read_le::<u32>()?;
            parser.seek(u64::from(data_offset))?;
            CompileUnit::read(parser, index)
        })?;

        let unit = Arc::new(unit);
        state.compile_units.insert(index, Arc::clone(&unit));
        Ok(unit)
    }

    /// Run `f` against the method index, reading the whole method table on first use.
    fn with_methods<T>(self: &Arc<Self>, f: impl FnOnce(&MethodIndex) -> T) -> Result<T> {
        let mut guard = lock!(self.state);
        let state = &mut *guard;

        let methods = match state.methods.take() {
            Some(methods) => methods,
            None => self.read_method_table(&mut state.parser)?,
        };
        let result = f(&methods);
        state.methods = Some(methods);
        Ok(result)
    }

    fn read_method_table(self: &Arc<Self>, parser: &mut Source) -> Result<MethodIndex> {
        log::debug!("reading {} method records", self.header.method_count);

        let count = self.header.method_count;
        let mut ordered = Vec::new();
        let mut by_token = HashMap::new();

        for index in 1..=count {
            let record = self.header.method_record_offset(index)?;
            let method = parser.at(record, |parser| {
                let token = Token::new(parser.read_le::<u32>()?);
                let data_offset = parser.read_le::<u32>()?;
                let line_table_offset = parser.read_le::<u32>()?;

                parser.seek(u64::from(data_offset))?;
                let trailer = MethodTrailer::read(parser)?;

                Ok(Method::bound(
                    token,
                    index,
                    line_table_offset,
                    &trailer,
                    self.options,
                    Arc::downgrade(self),
                ))
            })?;

            let method = Arc::new(method);
            if by_token.insert(method.token(), Arc::clone(&method)).is_some() {
                return Err(malformed_error!(
                    "Method token {} appears twice in the method table",
                    method.token()
                ));
            }
            ordered.push(method);
        }

        Ok(MethodIndex { ordered, by_token })
    }

    pub(crate) fn methods(self: &Arc<Self>) -> Result<Vec<Arc<Method>>> {
        self.with_methods(|methods| methods.ordered.clone())
    }

    pub(crate) fn method(self: &Arc<Self>, index: u32) -> Result<Arc<Method>> {
        let position = usize::try_from(index)
            .ok()
            .and_then(|index| index.checked_sub(1))
            .ok_or(out_of_bounds_error!())?;

        self.with_methods(|methods| methods.ordered.get(position).cloned())?
            .ok_or(out_of_bounds_error!())
    }

    pub(crate) fn method_by_token(self: &Arc<Self>, token: Token) -> Result<Arc<Method>> {
        self.with_methods(|methods| methods.by_token.get(&token).cloned())?
            .ok_or(Error::MethodNotFound(token))
    }

    pub(crate) fn anonymous_scopes(&self) -> Result<Vec<Arc<AnonymousScope>>> {
        let mut scopes = self.with_anonymous_scopes(|scopes| {
            scopes.values().cloned().collect::<Vec<_>>()
        })?;
        scopes.sort_by_key(|scope| scope.id);
        Ok(scopes)
    }

    pub(crate) fn anonymous_scope(&self, id: u32) -> Result<Arc<AnonymousScope>> {
        self.with_anonymous_scopes(|scopes| scopes.get(&id).cloned())?
            .ok_or_else(|| Error::NotFound(format!("anonymous scope {id}")))
    }

    /// Run `f` against the anonymous scopes, reading the whole table on first use.
    fn with_anonymous_scopes<T>(
        &self,
        f: impl FnOnce(&HashMap<u32, Arc<AnonymousScope>>) -> T,
    ) -> Result<T> {
        let mut guard = lock!(self.state);
        let state = &mut *guard;

        let scopes = match state.anonymous_scopes.take() {
            Some(scopes) => scopes,
            None => {
                let count = self.header.anonymous_scope_count;
                log::debug!("reading {count} anonymous scopes");

                let offset = u64::from(self.header.anonymous_scope_table_offset);
                state.parser.at(offset, |parser| {
                    let mut scopes = HashMap::new();
                    for _ in 0..count {
                        let scope = AnonymousScope::read(parser)?;
                        scopes.insert(scope.id, Arc::new(scope));
                    }
                    Ok(scopes)
                })?
            }
        };
        let result = f(&scopes);
        state.anonymous_scopes = Some(scopes);
        Ok(result)
    }
}

fn read_record_index(parser: &mut Source, expected: u32) -> Result<()> {
    let found = parser.read_le::<u32>()?;
    if found != expected {
        return Err(malformed_error!(
            "Table record {} carries index {}",
            expected,
            found
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{io::Cursor, thread};

    use super::*;
    use crate::{
        symbols::{
            entries::CapturedKind,
            store::header::{Header, METHOD_RECORD_SIZE},
        },
        test::sample_bytes,
    };

    fn open(bytes: Vec<u8>) -> Result<Arc<Shared>> {
        Shared::open(Box::new(Cursor::new(bytes)))
    }

    fn header_of(bytes: &[u8]) -> Header {
        Header::read(&bytes[PREAMBLE_SIZE..PREAMBLE_SIZE + HEADER_SIZE]).unwrap()
    }

    #[test]
    fn entries_are_cached() {
        let shared = open(sample_bytes()).unwrap();

        let first = shared.source_file(1).unwrap();
        let second = shared.source_file(1).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.file_name, "Player.cs");

        let unit = shared.compile_unit(1).unwrap();
        assert!(Arc::ptr_eq(&unit, &shared.compile_unit(1).unwrap()));
        assert_eq!(unit.include_files, vec![2]);

        let method = shared.method(1).unwrap();
        assert!(Arc::ptr_eq(&method, &shared.method_by_token(Token::new(10)).unwrap()));
    }

    #[test]
    fn methods_follow_token_order() {
        let shared = open(sample_bytes()).unwrap();

        let tokens: Vec<u32> = shared
            .methods()
            .unwrap()
            .iter()
            .map(|method| method.token().value())
            .collect();
        assert_eq!(tokens, vec![10, 30, 50]);

        let method = shared.method_by_token(Token::new(50)).unwrap();
        assert_eq!(method.index(), 3);
        assert_eq!(method.real_name().unwrap().as_deref(), Some("<Update>b__0"));
    }

    #[test]
    fn lookups_outside_the_tables() {
        let shared = open(sample_bytes()).unwrap();

        assert!(matches!(shared.method(0), Err(Error::OutOfBounds { .. })));
        assert!(matches!(shared.method(4), Err(Error::OutOfBounds { .. })));
        assert!(matches!(shared.source_file(3), Err(Error::OutOfBounds { .. })));
        assert!(matches!(shared.compile_unit(0), Err(Error::OutOfBounds { .. })));
        assert!(matches!(
            shared.method_by_token(Token::new(11)),
            Err(Error::MethodNotFound(token)) if token == Token::new(11)
        ));
        assert!(matches!(shared.anonymous_scope(9), Err(Error::NotFound(_))));
    }

    #[test]
    fn anonymous_scopes_by_id() {
        let shared = open(sample_bytes()).unwrap();

        let ids: Vec<u32> = shared
            .anonymous_scopes()
            .unwrap()
            .iter()
            .map(|scope| scope.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);

        let scope = shared.anonymous_scope(1).unwrap();
        assert_eq!(scope.captured_variable("this").unwrap().kind, CapturedKind::This);
        assert_eq!(scope.captured_scopes[0].scope, 2);
    }

    #[test]
    fn string_at_data_section_start() {
        let bytes = sample_bytes();
        let header = header_of(&bytes);
        let shared = open(bytes).unwrap();

        assert_eq!(
            shared.read_string_at(header.data_section_offset).unwrap(),
            "Player.cs"
        );
    }

    #[test]
    fn record_index_mismatch() {
        let mut bytes = sample_bytes();
        let offset = header_of(&bytes).source_table_offset as usize;
        bytes[offset..offset + 4].copy_from_slice(&7u32.to_le_bytes());

        let shared = open(bytes).unwrap();
        assert!(matches!(shared.source_file(1), Err(Error::Malformed { .. })));
        assert!(shared.source_file(2).is_ok());
    }

    #[test]
    fn duplicate_token_in_method_table() {
        let mut bytes = sample_bytes();
        let offset = header_of(&bytes).method_table_offset as usize;
        let second = offset + METHOD_RECORD_SIZE as usize;
        bytes[second..second + 4].copy_from_slice(&10u32.to_le_bytes());

        let shared = open(bytes).unwrap();
        assert!(matches!(shared.methods(), Err(Error::Malformed { .. })));
    }

    #[test]
    fn truncated_stream() {
        let mut bytes = sample_bytes();
        bytes.pop();
        assert!(matches!(open(bytes), Err(Error::Malformed { .. })));
    }

    #[test]
    fn method_outlives_store() {
        let shared = open(sample_bytes()).unwrap();
        let method = shared.method_by_token(Token::new(10)).unwrap();
        drop(shared);

        assert!(!method.is_line_table_loaded());
        assert!(matches!(method.line_number_table(), Err(Error::NotBound)));
    }

    #[test]
    fn concurrent_readers() {
        let shared = open(sample_bytes()).unwrap();

        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for method in shared.methods().unwrap() {
                        let table = method.line_number_table().unwrap();
                        assert_eq!(
                            table.is_empty(),
                            method.token() == Token::new(30)
                        );
                    }
                    for index in 1..=shared.header.source_count {
                        assert_eq!(shared.source_file(index).unwrap().index, index);
                    }
                    for index in 1..=shared.header.compile_unit_count {
                        assert_eq!(shared.compile_unit(index).unwrap().index, index);
                    }
                    assert_eq!(shared.source_file(2).unwrap().file_name, "Shared.cs");
                    assert_eq!(shared.compile_unit(1).unwrap().include_files, [2]);
                });
            }
        });
    }
}
