use std::sync::Arc;

use bitpacket::{FieldSpec, Record, Schema, SchemaBuilder};
use criterion::{Criterion, criterion_group, criterion_main};

/// Alternates 5-bit and 11-bit fields so every pair shares a packed slot.
fn gen_schema(field_count: usize) -> Arc<Schema> {
    let mut builder = SchemaBuilder::new("Bench");

    for i in 0..field_count {
        let bits = if i % 2 == 0 { 5 } else { 11 };
        builder
            .add_field(FieldSpec::unsigned(&format!("f{}", i), bits))
            .unwrap();
    }
    builder.add_field(FieldSpec::rest("tail")).unwrap();

    builder.finish().unwrap()
}

fn gen_packet(total_bits: usize) -> Vec<u8> {
    let total_bytes = total_bits.div_ceil(8);
    let mut data = Vec::with_capacity(total_bytes);

    // Deterministic but non-trivial pattern
    for i in 0..total_bytes {
        data.push((i * 31 % 256) as u8);
    }

    data
}

fn bench_record_parse(c: &mut Criterion) {
    for &field_count in &[2usize, 10, 50, 100] {
        let schema = gen_schema(field_count);
        let packet = gen_packet(schema.bit_length());
        let mut record = Record::new(schema);

        c.bench_function(&format!("parse_{}_fields", field_count), |b| {
            b.iter(|| {
                record.parse(&packet).unwrap();
            })
        });

        c.bench_function(&format!("serialize_{}_fields", field_count), |b| {
            b.iter(|| record.to_bytes())
        });
    }
}

fn bench_array_access(c: &mut Criterion) {
    let element = FieldSpec::composite("")
        .with_field(FieldSpec::pad(3))
        .and_then(|cf| cf.with_field(FieldSpec::unsigned("cnt", 5)))
        .and_then(|cf| cf.with_field(FieldSpec::signed("num", 32)))
        .unwrap();
    let mut builder = SchemaBuilder::new("Rows");
    builder
        .add_field(FieldSpec::array("rows", 64).with_field(element).unwrap())
        .unwrap();
    let mut record = Record::new(builder.finish().unwrap());

    c.bench_function("array_of_composites_set", |b| {
        b.iter(|| {
            let mut rows = record.array_mut("rows").unwrap();
            for i in 0..64 {
                rows.composite_mut(i).unwrap().set("num", -i as i64).unwrap();
            }
        })
    });
}

criterion_group!(benches, bench_record_parse, bench_array_access);
criterion_main!(benches);
