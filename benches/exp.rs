use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

mod common;
use common::render_fresh;

const DIGITS: &[u32] = &[64, 256, 1024];

fn bench_exp_digits(c: &mut Criterion) {
    let mut group = c.benchmark_group("exp/digits");
    group.sample_size(10);

    for &digits in DIGITS {
        group.bench_with_input(BenchmarkId::from_parameter(digits), &digits, |b, &digits| {
            b.iter(|| black_box(render_fresh("exp(100)", digits)))
        });
    }

    group.finish();
}

fn bench_log_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("exp/round_trip");
    group.sample_size(10);

    group.bench_function("ln_exp_1000", |b| {
        b.iter(|| black_box(render_fresh("ln(exp(1000))", 0)))
    });
    group.bench_function("pow", |b| {
        b.iter(|| black_box(render_fresh("pow(2, 0.5)", 64)))
    });

    group.finish();
}

criterion_group!(benches, bench_exp_digits, bench_log_round_trip);
criterion_main!(benches);
