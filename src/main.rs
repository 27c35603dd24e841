use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use flowclust_cluster::{
    ClusterConfig, ClusteringResult, InitStrategy, MatrixCache, MedoidUpdate, MetricSummary, Mode,
    SweepConfig,
};
use flowclust_io::{DirMatrixCache, ExperimentName, LineReader, Padding, ResultWriter, pad};
use flowclust_metric::{DataMatrix, Metric};

#[derive(Parser)]
#[command(name = "flowclust")]
#[command(about = "Partition-based clustering of flow lines under pluggable dissimilarity metrics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of worker threads
    #[arg(long, default_value_t = 8, global = true)]
    threads: usize,
}

/// Input, clustering and output parameters shared by every subcommand.
#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Path to the line file (one line per record, comma or whitespace separated)
    #[arg(long)]
    data: PathBuf,

    /// Point dimension (coordinates per point)
    #[arg(long, default_value_t = 3)]
    dimension: usize,

    /// Number of clusters
    #[arg(long)]
    k: usize,

    /// Center update: "kmeans", "kmedoids" (sample medoid) or "geometric-median"
    #[arg(long, default_value = "kmeans")]
    mode: String,

    /// Initialization: "random" (1), "samples" (2) or "farthest" (3)
    #[arg(long, default_value = "samples")]
    init: String,

    /// How uneven lines are brought to a common length: "fill" or "resample"
    #[arg(long, default_value = "fill")]
    padding: String,

    /// Points per line after padding (defaults to the longest line)
    #[arg(long)]
    max_elements: Option<usize>,

    /// Maximum assignment-update iterations
    #[arg(long, default_value_t = 20)]
    max_iter: usize,

    /// Relative change of the center displacement that counts as converged
    #[arg(long, default_value_t = 0.01)]
    tol: f64,

    /// Directory holding cached distance matrices
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Evaluate without a full distance matrix and skip the cache
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: String,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Cluster lines under one dissimilarity metric
    Cluster {
        /// Metric index (0-16) or name, e.g. "13" or "hausdorff"
        #[arg(long, default_value = "0")]
        metric: String,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Cluster lines under several metrics and report them side by side
    Sweep {
        /// Comma-separated metric indices or names (defaults to 0,1,2,4,12,14,15,16)
        #[arg(long)]
        metrics: Option<String>,

        /// Skip the principal component K-means baseline
        #[arg(long)]
        no_pca: bool,

        /// Fraction of variance the baseline's principal components retain
        #[arg(long, default_value = "0.9")]
        pca_variance: f64,

        #[command(flatten)]
        run: RunArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct ClusterOutput {
    experiment: String,
    metric: usize,
    metric_name: &'static str,
    k: usize,
    n_lines: usize,
    n_groups: usize,
    iterations: usize,
    converged: bool,
    entropy: Option<f64>,
    mean_silhouette: Option<f64>,
    closest_rotation: Option<f64>,
    furthest_rotation: f64,
    cluster_sizes: Vec<usize>,
    output: PathBuf,
}

#[derive(Serialize)]
struct SweepOutput {
    experiment: String,
    k: usize,
    n_lines: usize,
    baseline: Option<SweepRowOutput>,
    metrics: Vec<SweepRowOutput>,
    output: PathBuf,
}

#[derive(Serialize)]
struct SweepRowOutput {
    metric: usize,
    metric_name: &'static str,
    principal_components: Option<usize>,
    n_groups: usize,
    entropy: Option<f64>,
    mean_silhouette: Option<f64>,
    validity: Option<f64>,
    closest_rotation: Option<f64>,
    furthest_rotation: f64,
}

impl From<MetricSummary> for SweepRowOutput {
    fn from(s: MetricSummary) -> Self {
        Self {
            metric: s.metric.index(),
            metric_name: s.metric.name(),
            principal_components: s.principal_components,
            n_groups: s.n_groups,
            entropy: s.entropy,
            mean_silhouette: s.mean_silhouette,
            validity: s.validity,
            closest_rotation: s.closest_rotation,
            furthest_rotation: s.furthest_rotation,
        }
    }
}

fn parse_metric(s: &str) -> Result<Metric> {
    let s = s.trim();
    if let Ok(index) = s.parse::<usize>() {
        return Metric::from_index(index).map_err(Into::into);
    }
    Metric::ALL
        .into_iter()
        .find(|m| m.name() == s)
        .with_context(|| format!("unknown metric: {s} (expected 0-16 or a metric name)"))
}

fn parse_mode(s: &str) -> Result<Mode> {
    match s {
        "kmeans" => Ok(Mode::KMeans),
        "kmedoids" => Ok(Mode::KMedoids(MedoidUpdate::Sample)),
        "geometric-median" => Ok(Mode::KMedoids(MedoidUpdate::GeometricMedian)),
        other => anyhow::bail!(
            "unknown mode: {other} (expected kmeans, kmedoids, or geometric-median)"
        ),
    }
}

fn parse_init_strategy(s: &str) -> Result<InitStrategy> {
    match s {
        "random" | "1" => Ok(InitStrategy::RandomPositions),
        "samples" | "2" => Ok(InitStrategy::FromSamples),
        "farthest" | "3" => Ok(InitStrategy::FarthestSampling),
        other => anyhow::bail!("unknown init strategy: {other} (expected random, samples, or farthest)"),
    }
}

fn parse_padding(s: &str) -> Result<Padding> {
    match s {
        "fill" => Ok(Padding::Fill),
        "resample" => Ok(Padding::Resample),
        other => anyhow::bail!("unknown padding: {other} (expected fill or resample)"),
    }
}

fn load_data(run: &RunArgs) -> Result<DataMatrix> {
    let padding = parse_padding(&run.padding)?;
    let lines = LineReader::new(&run.data, run.dimension)
        .read()
        .context("failed to read line file")?;
    let data = pad(&lines, padding, run.max_elements).context("failed to pad lines")?;
    info!(n_lines = data.rows(), n_points = data.n_points(), "data matrix ready");
    Ok(data)
}

fn open_cache(run: &RunArgs) -> Result<Option<DirMatrixCache>> {
    match (&run.cache_dir, run.no_cache) {
        (Some(dir), false) => Ok(Some(
            DirMatrixCache::new(dir).context("failed to open matrix cache")?,
        )),
        _ => Ok(None),
    }
}

fn cluster_output(
    experiment: String,
    k: usize,
    result: &ClusteringResult,
    output: PathBuf,
) -> ClusterOutput {
    ClusterOutput {
        experiment,
        metric: result.metric.index(),
        metric_name: result.metric.name(),
        k,
        n_lines: result.labels.len(),
        n_groups: result.n_groups(),
        iterations: result.iterations,
        converged: result.converged,
        entropy: result.entropy,
        mean_silhouette: result.evaluation.as_ref().map(|e| e.silhouette.mean_score),
        closest_rotation: result.rotation.closest,
        furthest_rotation: result.rotation.furthest,
        cluster_sizes: result.sizes.clone(),
        output,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    rayon::ThreadPoolBuilder::new()
        .num_threads(cli.threads)
        .build_global()
        .context("failed to configure thread pool")?;
    info!(threads = cli.threads, "thread pool configured");

    match cli.command {
        Command::Cluster { metric, run } => {
            let metric = parse_metric(&metric)?;
            let experiment_name = ExperimentName::new(run.experiment.clone())?;
            let data = load_data(&run)?;
            let cache = open_cache(&run)?;

            let config = ClusterConfig::new(run.k, metric)?
                .with_mode(parse_mode(&run.mode)?)
                .with_init(parse_init_strategy(&run.init)?)
                .with_seed(cli.seed)
                .with_max_iter(run.max_iter)
                .with_tol(run.tol)
                .with_distance_cache(!run.no_cache);

            let result = match &cache {
                Some(cache) => config.fit_with_cache(&data, cache),
                None => config.fit(&data),
            }
            .context("clustering failed")?;

            let writer = ResultWriter::new(&run.output_dir, experiment_name)?;
            let path = writer.write_cluster(&result)?;

            let output = cluster_output(run.experiment, run.k, &result, path);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Sweep { metrics, no_pca, pca_variance, run } => {
            let metrics = match metrics {
                Some(list) => list.split(',').map(parse_metric).collect::<Result<Vec<_>>>()?,
                None => SweepConfig::default_metrics(),
            };
            let experiment_name = ExperimentName::new(run.experiment.clone())?;
            let data = load_data(&run)?;
            let cache = open_cache(&run)?;

            let config = SweepConfig::new(run.k, metrics)?
                .with_mode(parse_mode(&run.mode)?)
                .with_init(parse_init_strategy(&run.init)?)
                .with_seed(cli.seed)
                .with_max_iter(run.max_iter)
                .with_tol(run.tol)
                .with_distance_cache(!run.no_cache)
                .with_pca_baseline(!no_pca)
                .with_pca_variance(pca_variance);

            let result = config
                .fit(&data, cache.as_ref().map(|c| c as &dyn MatrixCache))
                .context("metric sweep failed")?;

            let writer = ResultWriter::new(&run.output_dir, experiment_name)?;
            for run_result in result.baseline.iter().chain(&result.results) {
                writer.write_cluster(run_result)?;
            }
            let path = writer.write_sweep(run.k, &result)?;

            let output = SweepOutput {
                experiment: run.experiment,
                k: run.k,
                n_lines: data.rows(),
                baseline: result.baseline_summary().map(SweepRowOutput::from),
                metrics: result.summaries().into_iter().map(SweepRowOutput::from).collect(),
                output: path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
