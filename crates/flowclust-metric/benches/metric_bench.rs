//! Criterion benchmarks for flowclust-metric: context preparation, pairwise matrices and
//! principal component fits.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use flowclust_metric::{DataMatrix, Dissimilarity, Metric, MetricContext, PrincipalComponents};

/// `n` 3-D helices of 32 points with varying pitch.
fn make_lines(n: usize) -> DataMatrix {
    let rows = (0..n)
        .map(|i| {
            let pitch = 0.05 + i as f64 * 0.01;
            (0..32)
                .flat_map(|t| {
                    let t = t as f64 * 0.2;
                    [t.cos(), t.sin(), t * pitch]
                })
                .collect()
        })
        .collect();
    DataMatrix::from_rows(rows, 3).unwrap()
}

fn bench_prepare(c: &mut Criterion) {
    let data = make_lines(200);
    let mut group = c.benchmark_group("prepare");
    for metric in [Metric::RotationBhattacharyya, Metric::DirectionDistribution, Metric::Entropy] {
        group.bench_with_input(BenchmarkId::from_parameter(metric.name()), &metric, |b, &m| {
            b.iter(|| MetricContext::prepare(&data, m));
        });
    }
    group.finish();
}

fn bench_pairwise(c: &mut Criterion) {
    let data = make_lines(100);
    let mut group = c.benchmark_group("pairwise_100x32");
    for metric in [
        Metric::Euclidean,
        Metric::PiecewiseAngle,
        Metric::Hausdorff,
        Metric::Procrustes,
        Metric::Signature,
    ] {
        let ctx = MetricContext::prepare(&data, metric);
        let d = Dissimilarity::new(&data, &ctx).unwrap();
        group.bench_function(BenchmarkId::from_parameter(metric.name()), |b| {
            b.iter(|| d.pairwise());
        });
    }
    group.finish();
}

fn bench_principal_components(c: &mut Criterion) {
    let mut group = c.benchmark_group("principal_components");
    // 200 rows of 96 columns take the covariance path, 50 rows the Gram path
    for n in [200, 50] {
        let data = make_lines(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &data, |b, data| {
            b.iter(|| PrincipalComponents::fit(data, 0.9).unwrap().project(data).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_prepare, bench_pairwise, bench_principal_components);
criterion_main!(benches);
