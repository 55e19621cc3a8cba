//! Benchmarks for method body processing.
//!
//! Covers the four paths a body takes through the library:
//! - decoding a `code_item` with its try table and debug program
//! - encoding after an edit, which runs the label and debug row update walks
//! - rendering as text
//! - assembling text

extern crate dexscope;

use criterion::{criterion_group, criterion_main, Criterion};
use dexscope::prelude::*;
use std::hint::black_box;

/// Builds a `code_item` of `blocks` repetitions of
/// `const/4 v0, 1 ; if-eqz v0, +3 ; nop ; nop`, ending in `return-void`, with one try item
/// per block and a debug program with one line per block.
fn synthetic_body(blocks: u16) -> (Vec<u8>, Vec<u8>) {
    let mut units = Vec::new();
    for _ in 0..blocks {
        units.extend([0x1012, 0x0038, 0x0003, 0x0000, 0x0000]);
    }
    units.push(0x000e);
    let catch = u32::from(blocks) * 5;

    let mut code = Vec::new();
    code.extend(1u16.to_le_bytes());
    code.extend(0u16.to_le_bytes());
    code.extend(0u16.to_le_bytes());
    code.extend(blocks.to_le_bytes());
    code.extend(0u32.to_le_bytes());
    code.extend((units.len() as u32).to_le_bytes());
    for unit in &units {
        code.extend(unit.to_le_bytes());
    }
    if units.len() % 2 != 0 {
        code.extend([0, 0]);
    }
    for block in 0..u32::from(blocks) {
        code.extend((block * 5).to_le_bytes());
        code.extend(5u16.to_le_bytes());
        code.extend(1u16.to_le_bytes());
    }
    // one shared list: a catch-all at the return-void
    code.push(1);
    code.push(0);
    let mut value = catch;
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            code.push(byte);
            break;
        }
        code.push(byte | 0x80);
    }

    // line_start 1, then advance(0, +1) for the first block and advance(10 bytes, +1) after
    let mut debug = vec![1, 0, 9 + 5];
    debug.extend(std::iter::repeat(9 + 5 + 15 * 5).take(usize::from(blocks) - 1));
    debug.push(0);

    (code, debug)
}

fn bench_decode(c: &mut Criterion) {
    let (code, debug) = synthetic_body(1000);

    c.bench_function("body_decode", |b| {
        b.iter(|| {
            let body =
                MethodBody::from(black_box(&code), Some(black_box(&debug)), BodyConfig::default())
                    .unwrap();
            black_box(body)
        });
    });
}

fn bench_decode_minimal(c: &mut Criterion) {
    let (code, debug) = synthetic_body(1000);

    c.bench_function("body_decode_minimal", |b| {
        b.iter(|| {
            let body =
                MethodBody::from(black_box(&code), Some(black_box(&debug)), BodyConfig::minimal())
                    .unwrap();
            black_box(body)
        });
    });
}

fn bench_edit_encode(c: &mut Criterion) {
    let (code, debug) = synthetic_body(1000);

    c.bench_function("body_insert_encode", |b| {
        b.iter(|| {
            let mut body = MethodBody::from(&code, Some(&debug), BodyConfig::default()).unwrap();
            body.insert(1, Instruction::new(vec![0x0000]).unwrap()).unwrap();
            let encoded = body.encode().unwrap();
            let debug = body.encode_debug_info().unwrap();
            black_box((encoded, debug))
        });
    });
}

fn bench_render(c: &mut Criterion) {
    let (code, debug) = synthetic_body(1000);
    let ids = Identifiers::new();
    let mut body = MethodBody::from(&code, Some(&debug), BodyConfig::default()).unwrap();

    c.bench_function("body_render", |b| {
        b.iter(|| black_box(body.render(black_box(&ids)).unwrap()));
    });
}

fn bench_parse(c: &mut Criterion) {
    let (code, debug) = synthetic_body(1000);
    let mut ids = Identifiers::new();
    let text = MethodBody::from(&code, Some(&debug), BodyConfig::default())
        .unwrap()
        .render(&ids)
        .unwrap();

    c.bench_function("body_parse", |b| {
        b.iter(|| {
            let body =
                MethodBody::parse(black_box(&text), &mut ids, BodyConfig::default()).unwrap();
            black_box(body)
        });
    });
}

criterion_group!(
    benches,
    bench_decode,
    bench_decode_minimal,
    bench_edit_encode,
    bench_render,
    bench_parse
);
criterion_main!(benches);
