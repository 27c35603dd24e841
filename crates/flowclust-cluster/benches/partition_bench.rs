//! Criterion benchmarks for flowclust-cluster: partition fits per mode and a metric sweep.

use criterion::{Criterion, criterion_group, criterion_main};

use flowclust_cluster::{ClusterConfig, InitStrategy, MedoidUpdate, Mode, SweepConfig};
use flowclust_metric::{DataMatrix, Metric};

/// 100 2-D lines of 32 points: five families of sine curves at different offsets.
fn make_cluster_data() -> DataMatrix {
    let offsets = [0.0, 5.0, 10.0, 15.0, 20.0];
    let mut rows = Vec::new();
    for &offset in &offsets {
        for j in 0..20 {
            let row: Vec<f64> = (0..32)
                .flat_map(|i| {
                    let t = i as f64 * 0.1;
                    [t, t.sin() + offset + j as f64 * 0.01]
                })
                .collect();
            rows.push(row);
        }
    }
    DataMatrix::from_rows(rows, 2).unwrap()
}

fn bench_kmeans_fit(c: &mut Criterion) {
    let data = make_cluster_data();
    let cfg = ClusterConfig::new(5, Metric::Euclidean)
        .unwrap()
        .with_init(InitStrategy::FarthestSampling)
        .with_distance_cache(false);

    c.bench_function("kmeans_fit_100x32_k5", |b| {
        b.iter(|| cfg.fit(&data).unwrap());
    });
}

fn bench_sample_medoid_fit(c: &mut Criterion) {
    let data = make_cluster_data();
    let cfg = ClusterConfig::new(5, Metric::Hausdorff)
        .unwrap()
        .with_mode(Mode::KMedoids(MedoidUpdate::Sample))
        .with_distance_cache(false);

    c.bench_function("sample_medoid_fit_100x32_k5_hausdorff", |b| {
        b.iter(|| cfg.fit(&data).unwrap());
    });
}

fn bench_geometric_median_fit(c: &mut Criterion) {
    let data = make_cluster_data();
    let cfg = ClusterConfig::new(5, Metric::Euclidean)
        .unwrap()
        .with_mode(Mode::KMedoids(MedoidUpdate::GeometricMedian))
        .with_distance_cache(false);

    c.bench_function("geometric_median_fit_100x32_k5", |b| {
        b.iter(|| cfg.fit(&data).unwrap());
    });
}

fn bench_metric_sweep(c: &mut Criterion) {
    let data = make_cluster_data();
    let cfg = SweepConfig::new(5, SweepConfig::default_metrics())
        .unwrap()
        .with_max_iter(10);

    c.bench_function("sweep_default_metrics_100x32_k5", |b| {
        b.iter(|| cfg.fit(&data, None).unwrap());
    });
}

criterion_group!(
    benches,
    bench_kmeans_fit,
    bench_sample_medoid_fit,
    bench_geometric_median_fit,
    bench_metric_sweep
);
criterion_main!(benches);
