use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ppml_core::{fedavg, ModelUpdate, PrivacyBudgetManager, SecretSharingEngine, SecureAggregator};

fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");

    for &n_clients in &[10, 50, 100] {
        for &n_params in &[1_000usize, 100_000] {
            let updates: Vec<ModelUpdate> = (0..n_clients)
                .map(|i| {
                    let w = (0..n_params)
                        .map(|j| ((i * n_params + j) as f64).sin())
                        .collect();
                    ModelUpdate::new().with_vector("weights", w)
                })
                .collect();

            let id = format!("{}c_{}p", n_clients, n_params);

            group.bench_with_input(BenchmarkId::new("fedavg", &id), &updates, |b, updates| {
                b.iter(|| fedavg(updates, None).unwrap())
            });
        }
    }
    group.finish();
}

fn bench_secure(c: &mut Criterion) {
    let mut group = c.benchmark_group("secure");

    for &(n_parties, threshold) in &[(3usize, 2usize), (5, 3), (10, 6)] {
        let agg = SecureAggregator::new(SecretSharingEngine::with_seed(1), n_parties, threshold)
            .unwrap();
        for &n_values in &[100usize, 10_000] {
            let values: Vec<f64> = (0..n_values).map(|i| (i as f64).cos()).collect();
            let id = format!("{}of{}_{}v", threshold, n_parties, n_values);

            group.bench_with_input(BenchmarkId::new("secure_sum", &id), &values, |b, values| {
                b.iter(|| agg.secure_sum(values).unwrap())
            });
            group.bench_with_input(
                BenchmarkId::new("secure_variance", &id),
                &values,
                |b, values| b.iter(|| agg.secure_variance(values).unwrap()),
            );
        }
    }
    group.finish();
}

fn bench_noise(c: &mut Criterion) {
    let mut group = c.benchmark_group("noise");

    for &n_values in &[1_000usize, 100_000] {
        let values: Vec<f64> = (0..n_values).map(|i| i as f64).collect();

        group.bench_with_input(BenchmarkId::new("laplace", n_values), &values, |b, values| {
            let dp = PrivacyBudgetManager::with_seed(1e12, 7).unwrap();
            b.iter(|| dp.add_noise_batch(values, 0.1, 1.0, None).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("gaussian", n_values), &values, |b, values| {
            let dp = PrivacyBudgetManager::with_seed(1e12, 7).unwrap();
            b.iter(|| dp.add_noise_batch(values, 0.1, 1.0, Some(1e-5)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_aggregation, bench_secure, bench_noise);
criterion_main!(benches);
