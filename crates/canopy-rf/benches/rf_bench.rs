//! Criterion benchmarks for canopy-rf: training, batched prediction and LOOCV.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use canopy_rf::{LeaveOneOut, RandomForestConfig};

/// Expression-like matrix: few samples, many genes, 3 informative genes.
fn make_expression(
    n_samples: usize,
    n_genes: usize,
    n_classes: usize,
    seed: u64,
) -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let class = i % n_classes;
        labels.push(class);
        let row: Vec<f64> = (0..n_genes)
            .map(|g| {
                let base = if g < 3 { class as f64 * 3.0 } else { 0.0 };
                base + rng.r#gen::<f64>() * 0.5
            })
            .collect();
        features.push(row);
    }
    let names: Vec<String> = (0..n_genes).map(|g| format!("GENE_{g}")).collect();
    (features, labels, names)
}

fn bench_rf_train(c: &mut Criterion) {
    let (features, labels, names) = make_expression(72, 2000, 2, 42);
    let cfg = RandomForestConfig::new(100).unwrap().with_seed(42);

    c.bench_function("rf_train_72x2000_100trees", |b| {
        b.iter(|| cfg.fit(&features, &labels, &names).unwrap());
    });
}

fn bench_rf_predict_batch(c: &mut Criterion) {
    let (features, labels, names) = make_expression(500, 50, 5, 42);
    let cfg = RandomForestConfig::new(50).unwrap().with_seed(42);
    let forest = cfg.fit(&features, &labels, &names).unwrap().into_forest();

    c.bench_function("rf_predict_batch_500x50_50trees", |b| {
        b.iter(|| forest.predict_batch(&features).unwrap());
    });
}

fn bench_loocv(c: &mut Criterion) {
    let (features, labels, names) = make_expression(24, 500, 2, 42);
    let cfg = RandomForestConfig::new(20).unwrap().with_seed(42);

    c.bench_function("rf_loocv_24x500_20trees", |b| {
        b.iter(|| LeaveOneOut.evaluate(&cfg, &features, &labels, &names).unwrap());
    });
}

criterion_group!(benches, bench_rf_train, bench_rf_predict_batch, bench_loocv);
criterion_main!(benches);
