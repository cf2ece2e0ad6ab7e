/*!
 * Predicate and Gate Benchmarks
 *
 * Symmetry check across input lengths, and uncontended gate round trips
 */

use batchgate::{is_symmetric, Gate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_symmetry(c: &mut Criterion) {
    let mut group = c.benchmark_group("is_symmetric");

    for len in [8usize, 32, 127] {
        let half: String = "abcdefghij".chars().cycle().take(len / 2).collect();
        let symmetric: String = half.chars().chain(half.chars().rev()).collect();
        let mut asymmetric = symmetric.clone();
        asymmetric.push('z');

        group.bench_with_input(BenchmarkId::new("match", len), &symmetric, |b, text| {
            b.iter(|| is_symmetric(black_box(text)))
        });
        group.bench_with_input(BenchmarkId::new("mismatch", len), &asymmetric, |b, text| {
            b.iter(|| is_symmetric(black_box(text)))
        });
    }

    group.finish();
}

fn bench_gate_round_trip(c: &mut Criterion) {
    let dir = std::env::temp_dir().join(format!("batchgate-bench-{}.gate", std::process::id()));
    let gate = Gate::open(&dir).unwrap();

    c.bench_function("gate_acquire_release", |b| {
        b.iter(|| {
            let guard = gate.acquire().unwrap();
            guard.release().unwrap();
        })
    });

    std::fs::remove_file(&dir).ok();
}

criterion_group!(benches, bench_symmetry, bench_gate_round_trip);
criterion_main!(benches);
