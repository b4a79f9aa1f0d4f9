//! Benchmarks chunk Lox (Criterion).
//!
//! Suites :
//!   - chunk/write        → N octets écrits (croissance 8 → 16 → 32 …)
//!   - chunk/add_constant → N constantes dans le pool
//!   - chunk/disassemble  → listing texte d'un chunk de N instructions
//!   - chunk/budget       → écriture via `BudgetAllocator` (coût de la comptabilité)
//!
//! Criterion :
//!   CRIT_SAMPLES (def=50) | CRIT_WARMUP_MS (def=300) | CRIT_MEASURE_MS (def=1200)

use std::hint::black_box;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lox_core::prelude::*;

const SIZES: [usize; 4] = [64, 1_024, 16_384, 262_144];

fn env_u64(k: &str, d: u64) -> u64 {
    std::env::var(k).ok().and_then(|s| s.parse().ok()).unwrap_or(d)
}

fn configured() -> Criterion {
    Criterion::default()
        .sample_size(usize::try_from(env_u64("CRIT_SAMPLES", 50)).unwrap_or(50))
        .warm_up_time(Duration::from_millis(env_u64("CRIT_WARMUP_MS", 300)))
        .measurement_time(Duration::from_millis(env_u64("CRIT_MEASURE_MS", 1_200)))
}

/// Chunk "réaliste" : CONSTANT/NEGATE/ADD en boucle, 8 octets par ligne.
fn sample_chunk(instructions: usize) -> Chunk {
    let mut chunk = Chunk::new();
    let idx = chunk.add_constant(Value::Number(1.5)).or_abort();
    let idx = u8::try_from(idx).unwrap_or_default();
    for i in 0..instructions {
        let line = u32::try_from(i / 8).unwrap_or(u32::MAX);
        match i % 3 {
            0 => {
                chunk.write_op(OpCode::Constant, line).or_abort();
                chunk.write(idx, line).or_abort();
            }
            1 => chunk.write_op(OpCode::Negate, line).or_abort(),
            _ => chunk.write_op(OpCode::Add, line).or_abort(),
        }
    }
    chunk
}

fn bench_write(c: &mut Criterion) {
    let mut g = c.benchmark_group("chunk/write");
    for n in SIZES {
        g.throughput(Throughput::Bytes(n as u64));
        g.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mut chunk = Chunk::new();
                for i in 0..n {
                    chunk.write(black_box(OpCode::Return.into()), black_box(u32::try_from(i).unwrap_or(0))).or_abort();
                }
                chunk
            });
        });
    }
    g.finish();
}

fn bench_add_constant(c: &mut Criterion) {
    let mut g = c.benchmark_group("chunk/add_constant");
    for n in [16usize, 256, 4_096] {
        g.throughput(Throughput::Elements(n as u64));
        g.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mut chunk = Chunk::new();
                for i in 0..n {
                    #[allow(clippy::cast_precision_loss)]
                    let v = Value::Number(i as f64);
                    black_box(chunk.add_constant(v).or_abort());
                }
                chunk
            });
        });
    }
    g.finish();
}

fn bench_disassemble(c: &mut Criterion) {
    let mut g = c.benchmark_group("chunk/disassemble");
    for n in [64usize, 1_024, 16_384] {
        let chunk = sample_chunk(n);
        g.throughput(Throughput::Bytes(chunk.len() as u64));
        g.bench_with_input(BenchmarkId::from_parameter(n), &chunk, |b, chunk| {
            b.iter(|| disassemble_to_string(black_box(chunk), "bench"));
        });
    }
    g.finish();
}

fn bench_budget(c: &mut Criterion) {
    let mut g = c.benchmark_group("chunk/budget");
    let n = 16_384;
    g.throughput(Throughput::Bytes(n as u64));
    g.bench_function("unlimited", |b| {
        b.iter(|| {
            let mut chunk = Chunk::with_allocator(BudgetAllocator::unlimited());
            for i in 0..n {
                chunk.write(OpCode::Nil.into(), u32::try_from(i).unwrap_or(0)).or_abort();
            }
            black_box(chunk.allocator().peak())
        });
    });
    g.finish();
}

criterion_group! {
    name = benches;
    config = configured();
    targets = bench_write, bench_add_constant, bench_disassemble, bench_budget
}
criterion_main!(benches);
