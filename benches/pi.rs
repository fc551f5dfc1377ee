use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

mod common;
use common::render_fresh;

const DIGITS: &[u32] = &[64, 256, 1024, 4096];

fn bench_pi_digits(c: &mut Criterion) {
    let mut group = c.benchmark_group("pi/digits");
    group.sample_size(10);

    for &digits in DIGITS {
        group.bench_with_input(BenchmarkId::from_parameter(digits), &digits, |b, &digits| {
            b.iter(|| black_box(render_fresh("pi", digits)))
        });
    }

    group.finish();
}

fn bench_pi_arithmetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("pi/arithmetic");
    group.sample_size(10);

    group.bench_function("2pi", |b| {
        b.iter(|| black_box(render_fresh("2*pi", 256)))
    });
    group.bench_function("sin_half_pi", |b| {
        b.iter(|| black_box(render_fresh("sin(0.5*pi)", 64)))
    });

    group.finish();
}

criterion_group!(benches, bench_pi_digits, bench_pi_arithmetic);
criterion_main!(benches);
