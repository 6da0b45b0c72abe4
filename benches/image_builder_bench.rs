// Image builder benchmark - rasterization time per event at different batch sizes
//
// Run with: cargo bench --bench image_builder_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use jet_image_tagging::{Constituent, ImageBuilder, ImageConfig, Jet};

/// Jet with `n` constituents spread over the image window (deterministic pattern)
fn synthetic_jet(n: usize, seed: u64) -> Jet {
    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((state >> 33) as f64 / (1u64 << 31) as f64) * 2.4 - 1.2
    };
    let constituents = (0..n)
        .map(|_| Constituent::new(5.0, 0.3 + next(), 1.0 + next()))
        .collect();
    Jet::new(500.0, 0.3, 1.0).with_constituents(constituents)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("image_builder");
    let builder = ImageBuilder::new(ImageConfig::default()).unwrap();

    for batch in [1usize, 4, 10] {
        let jets: Vec<Jet> = (0..batch).map(|i| synthetic_jet(100, i as u64)).collect();
        group.bench_with_input(BenchmarkId::new("224x224x3", batch), &jets, |b, jets| {
            b.iter(|| {
                let tensor = builder.build(black_box(jets));
                black_box(tensor);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build);
criterion_main!(benches);
