//! Benchmarks for the cseval evaluator.
//!
//! Run with: `cargo bench` in the core/ directory.
//!
//! Benchmark groups:
//! 1. eval_only: pure evaluation of an expression compiled once
//! 2. full_pipeline: parse + bind + lower + run together (for comparison)
//! 3. member_calls: null-conditional chains and method calls on strings

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use cseval_core::api::{Engine, EngineOptions};
use cseval_core::types::Type;
use cseval_core::values::Value;

/// Generate an arithmetic expression like "1 + 1 + 1 + ... + 1" with `n` additions.
fn generate_arithmetic_chain(n: usize) -> String {
    let mut expr = String::from("x");
    for _ in 0..n {
        expr.push_str(" + 1");
    }
    expr
}

/// Benchmark: Pure evaluation performance (compiled once, run many times).
fn bench_eval_only(c: &mut Criterion) {
    let mut group = c.benchmark_group("eval_only");
    let engine = Engine::new(EngineOptions::default(), |_| {});

    for size in [100, 200, 400, 800, 3200] {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let source = generate_arithmetic_chain(size);
            let expr = engine
                .compile(&source, &[("x", Type::INT32)])
                .expect("Compilation failed");
            let args = [Value::Int32(1)];

            b.iter(|| black_box(expr.run(black_box(&args)).expect("Eval failed")));
        });
    }

    group.finish();
}

/// Benchmark: Full pipeline (parse + bind + lower + run).
///
/// Compare with eval_only to see how much of the time goes to compilation.
fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_pipeline");
    let engine = Engine::new(EngineOptions::default(), |_| {});

    for size in [100, 200, 400] {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let source = generate_arithmetic_chain(size);
            let args = [Value::Int32(1)];

            b.iter(|| {
                let expr = engine
                    .compile(black_box(&source), &[("x", Type::INT32)])
                    .expect("Compilation failed");
                black_box(expr.run(&args).expect("Eval failed"))
            });
        });
    }

    group.finish();
}

/// Benchmark: member access, method dispatch and lifted operators.
fn bench_member_calls(c: &mut Criterion) {
    let mut group = c.benchmark_group("member_calls");
    let engine = Engine::new(EngineOptions::default(), |_| {});

    let cases = [
        ("null_conditional", "s?.Trim().ToUpper().Length ?? -1"),
        ("string_methods", "s.Substring(1, 3).Replace(\"b\", \"x\") + s.IndexOf('c')"),
        ("math", "Math.Max(Math.Abs(-s.Length), 3) * 2"),
    ];

    for (name, source) in cases {
        let expr = engine
            .compile(source, &[("s", Type::String)])
            .expect("Compilation failed");
        let args = [Value::string("  abcdef  ")];
        group.bench_function(name, |b| {
            b.iter(|| black_box(expr.run(black_box(&args)).expect("Eval failed")));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_eval_only, bench_full_pipeline, bench_member_calls);
criterion_main!(benches);
