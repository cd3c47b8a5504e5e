//! Benchmarks for line-number programs and bound-store lookups.
//!
//! - Encoding a method's sequence points into opcodes
//! - Decoding the opcodes back into a table
//! - Offset lookup in a decoded table
//! - Cold and warm method lookups in a bound store

extern crate symstore;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use std::{hint::black_box, io::Cursor};
use symstore::{
    symbols::lineprogram::{decode, encode, LineNumberEntry, LineNumberTable, LineProgramOptions},
    Parser, SymbolStore, SymbolWriter, Token,
};

/// A statement every 3-9 bytes, lines mostly ascending with the odd jump back.
fn sequence_points(count: u32) -> Vec<LineNumberEntry> {
    let mut offset = 0;
    let mut row = 100;
    (0..count)
        .map(|index| {
            offset += 3 + index % 7;
            row += match index % 11 {
                0 => -6,
                5 => 14,
                _ => 1,
            };
            LineNumberEntry::new(1 + index / 200, row, offset, index % 37 == 0)
                .with_column(5 + (index % 4) as i32 * 4)
        })
        .collect()
}

/// Benchmark encoding 1000 sequence points with columns.
fn bench_encode(c: &mut Criterion) {
    let entries = sequence_points(1000);
    let options = LineProgramOptions::default();

    c.bench_function("lineprogram_encode_1000", |b| {
        b.iter(|| {
            let bytes = encode(black_box(&entries), &options, true, false).unwrap();
            black_box(bytes)
        });
    });
}

/// Benchmark decoding 1000 sequence points with columns.
fn bench_decode(c: &mut Criterion) {
    let options = LineProgramOptions::default();
    let bytes = encode(&sequence_points(1000), &options, true, false).unwrap();

    c.bench_function("lineprogram_decode_1000", |b| {
        b.iter(|| {
            let mut parser = Parser::new(Cursor::new(black_box(bytes.as_slice())));
            black_box(decode(&mut parser, &options, true, false).unwrap())
        });
    });
}

/// Benchmark finding the statement that covers an offset.
fn bench_find(c: &mut Criterion) {
    let table = LineNumberTable::new(sequence_points(1000));

    c.bench_function("lineprogram_find", |b| {
        b.iter(|| black_box(table.find(black_box(3000))));
    });
}

fn sample_file(methods: u32) -> Vec<u8> {
    let mut writer = SymbolWriter::new();
    let document = writer.define_document("Bench.cs", vec![]).unwrap();
    for method in 1..=methods {
        writer.open_method(Token::new(0x0600_0000 | method), document.compile_unit, 0);
        for entry in sequence_points(20) {
            writer.mark_sequence_point(entry.offset, 1, entry.row, entry.column, false);
        }
        writer.close_method().unwrap();
    }
    writer
        .write_symbol_file(Cursor::new(Vec::new()), uguid::Guid::ZERO)
        .unwrap()
        .into_inner()
}

/// Benchmark the first lookup in a freshly bound store, which reads the method table.
fn bench_cold_lookup(c: &mut Criterion) {
    let bytes = sample_file(500);

    c.bench_function("store_cold_method_lookup", |b| {
        b.iter_batched(
            || SymbolStore::open(Cursor::new(bytes.clone())).unwrap(),
            |store| {
                let method = store.method_by_token(Token::new(0x0600_00FA)).unwrap();
                black_box(method.line_number_table().unwrap())
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark a lookup whose method and line table are already cached.
fn bench_warm_lookup(c: &mut Criterion) {
    let store = SymbolStore::open(Cursor::new(sample_file(500))).unwrap();
    let token = Token::new(0x0600_00FA);
    store.method_by_token(token).unwrap().line_number_table().unwrap();

    c.bench_function("store_warm_method_lookup", |b| {
        b.iter(|| {
            let method = store.method_by_token(black_box(token)).unwrap();
            black_box(method.line_number_table().unwrap())
        });
    });
}

criterion_group!(
    benches,
    bench_encode,
    bench_decode,
    bench_find,
    bench_cold_lookup,
    bench_warm_lookup
);
criterion_main!(benches);
