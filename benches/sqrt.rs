use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

mod common;
use common::render_fresh;

const DIGITS: &[u32] = &[64, 256, 1024, 4096];

fn bench_sqrt_digits(c: &mut Criterion) {
    let mut group = c.benchmark_group("sqrt/digits");
    group.sample_size(10);

    for &digits in DIGITS {
        group.bench_with_input(BenchmarkId::from_parameter(digits), &digits, |b, &digits| {
            b.iter(|| black_box(render_fresh("sqrt(2)", digits)))
        });
    }

    group.finish();
}

fn bench_nested_roots(c: &mut Criterion) {
    let mut group = c.benchmark_group("sqrt/nested");
    group.sample_size(10);

    group.bench_function("sqrt_sqrt_2", |b| {
        b.iter(|| black_box(render_fresh("sqrt(sqrt(2))", 256)))
    });
    group.bench_function("silver_ratio", |b| {
        b.iter(|| black_box(render_fresh("1 + sqrt(2)", 256)))
    });

    group.finish();
}

criterion_group!(benches, bench_sqrt_digits, bench_nested_roots);
criterion_main!(benches);
