//! Row codec benchmarks
//!
//! Measures row construction, envelope parsing and per-field access, the
//! operations on every scan and mutation path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use rowtree::encoding::{Charset, FieldType};
use rowtree::types::Value;
use rowtree::{FieldDef, RowData, RowDef};

fn bench_def() -> Arc<RowDef> {
    Arc::new(RowDef::new(
        1,
        vec![
            FieldDef::new("id", FieldType::Int { width: 8, signed: true }),
            FieldDef::new("flag", FieldType::Bool),
            FieldDef::new(
                "name",
                FieldType::Varchar {
                    max_chars: 32,
                    charset: Charset::Utf8,
                },
            ),
            FieldDef::new("score", FieldType::Float8),
        ],
    ))
}

fn bench_values() -> Vec<Value<'static>> {
    vec![
        Value::Int(123_456_789),
        Value::Bool(true),
        Value::from("benchmark subject".to_string()),
        Value::Float(0.25),
    ]
}

fn bench_create_row(c: &mut Criterion) {
    let row_def = bench_def();
    let values = bench_values();
    let mut group = c.benchmark_group("create_row");

    group.bench_function("reused_buffer", |b| {
        let mut row = RowData::with_capacity(256);
        b.iter(|| {
            row.create_row(black_box(&row_def), black_box(&values), false)
                .unwrap();
        });
    });

    group.bench_function("growing_buffer", |b| {
        b.iter(|| {
            let mut row = RowData::new(Vec::new());
            row.create_row(black_box(&row_def), black_box(&values), true)
                .unwrap();
            black_box(row.row_size());
        });
    });

    group.finish();
}

fn bench_parse_and_access(c: &mut Criterion) {
    let row_def = bench_def();
    let mut row = RowData::with_capacity(256);
    row.create_row(&row_def, &bench_values(), false).unwrap();
    row.seal();
    row.prepare_row(0).unwrap();

    let mut group = c.benchmark_group("access");

    group.bench_function("prepare_row", |b| {
        b.iter(|| {
            black_box(row.prepare_row(black_box(0)).unwrap());
        });
    });

    group.bench_function("field_location", |b| {
        b.iter(|| {
            black_box(row_def.field_location(&row, black_box(2)).unwrap());
        });
    });

    group.bench_function("field_value_int", |b| {
        b.iter(|| {
            black_box(row.field_value(&row_def, black_box(0)).unwrap());
        });
    });

    group.bench_function("field_value_text", |b| {
        b.iter(|| {
            black_box(row.field_value(&row_def, black_box(2)).unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_create_row, bench_parse_and_access);
criterion_main!(benches);
