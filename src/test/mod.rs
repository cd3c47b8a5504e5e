//! Fixtures shared by the unit tests.

use std::io::Cursor;

use crate::{
    symbols::{
        entries::{CodeBlock, CodeBlockKind, LocalVariable, MethodDefinition, ScopeVariable, SourceFile},
        lineprogram::LineNumberEntry,
    },
    SymbolStore, Token,
};

pub const SAMPLE_GUID: uguid::Guid = uguid::guid!("0c2f7d3e-9a41-4b6e-8d25-71f0e8a9c3b4");

/// An authoring store with two documents, three methods defined out of token order, and one
/// pair of anonymous scopes.
pub fn sample_store() -> SymbolStore {
    let mut store = SymbolStore::new();

    let player = store
        .add_source(SourceFile::with_content("Player.cs", b"class Player {}"))
        .unwrap();
    let shared = store
        .add_source(SourceFile::new("Shared.cs", vec![0xAB; 16]).auto_generated(true))
        .unwrap();
    let unit = store.add_compile_unit(player).unwrap();
    store.add_include_file(unit, shared).unwrap();
    let game = store
        .define_namespace(unit, "Game", vec!["System".into()], 0)
        .unwrap();
    store.add_compile_unit(shared).unwrap();

    store
        .define_method(
            MethodDefinition::new(Token::new(50), unit)
                .with_namespace(game)
                .with_line_numbers(vec![
                    LineNumberEntry::new(player, 10, 0, false).with_column(5),
                    LineNumberEntry::new(player, 11, 6, false).with_column(9),
                ])
                .with_real_name("<Update>b__0"),
        )
        .unwrap();

    store
        .define_method(
            MethodDefinition::new(Token::new(10), unit)
                .with_namespace(game)
                .with_locals(vec![
                    LocalVariable::new(0, "speed", 0),
                    LocalVariable::new(1, "target", 1),
                ])
                .with_code_blocks(vec![CodeBlock::new(1, -1, CodeBlockKind::Lexical, 4, 30)])
                .with_scope_variables(vec![ScopeVariable::new(1, 1)])
                .with_line_numbers(vec![
                    LineNumberEntry::new(player, 20, 0, false).with_end(20, 30),
                    LineNumberEntry::new(player, 0xFEEFEE, 4, true),
                    LineNumberEntry::new(shared, 3, 12, false),
                ]),
        )
        .unwrap();

    store
        .define_method(MethodDefinition::new(Token::new(30), unit))
        .unwrap();

    store.define_anonymous_scope(1).unwrap();
    store.define_captured_local(1, "target", "target").unwrap();
    store.define_captured_this(1, "<>4__this").unwrap();
    store.define_captured_scope(1, 2, "CS$<>8__locals1").unwrap();
    store.define_anonymous_scope(2).unwrap();
    store.define_captured_parameter(2, "delta", "delta").unwrap();

    store
}

/// The sealed bytes of [`sample_store`].
pub fn sample_bytes() -> Vec<u8> {
    sample_store()
        .seal(Cursor::new(Vec::new()), SAMPLE_GUID)
        .unwrap()
        .into_inner()
}

/// A store bound to [`sample_bytes`].
pub fn open_sample() -> SymbolStore {
    SymbolStore::open(Cursor::new(sample_bytes())).unwrap()
}
