use anyhow::{Context, Result};
use clap::Parser;
use color_segment::{ClusterResult, DEFAULT_MAX_ITER, DEFAULT_SEED, QuantizeOptions, load, quantize_with};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Split images into k color clusters, one output image per cluster.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// One or more input image paths
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Number of color clusters (1-256)
    #[arg(short = 'k', long, default_value_t = 5)]
    n_colors: usize,

    /// Seed for centroid initialisation
    #[arg(short, long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Maximum k-means iterations per run
    #[arg(long, default_value_t = DEFAULT_MAX_ITER)]
    max_iter: usize,

    /// Number of seeded runs; the tightest clustering is kept
    #[arg(long, default_value_t = 1)]
    n_init: usize,

    /// Output directory
    #[arg(short = 'd', long, default_value = ".")]
    out_dir: PathBuf,

    /// Print a JSON summary per input instead of a text line
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "segment_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).without_time())
        .init();

    let args = Args::parse();
    let options = QuantizeOptions::new()
        .seed(args.seed)
        .max_iter(args.max_iter)
        .n_init(args.n_init);

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating output directory {}", args.out_dir.display()))?;

    for input in &args.inputs {
        tracing::info!(input = %input.display(), k = args.n_colors, "segmenting");

        let img = load(input).with_context(|| format!("loading {}", input.display()))?;
        let result = quantize_with(img, args.n_colors, &options).context("color clustering failed")?;

        if !result.converged() {
            tracing::warn!(iterations = result.iterations(), "k-means stopped at the iteration cap");
        }

        let written = write_outputs(input, &args.out_dir, &result)?;
        tracing::info!(files = written.len(), inertia = result.inertia(), "done");

        if args.json {
            println!("{}", summary_json(input, &result, &written));
        } else {
            println!(
                "{}: {} clusters [{}] in {} iterations",
                input.display(),
                result.k(),
                result.palette_hex().join(", "),
                result.iterations()
            );
        }
    }

    Ok(())
}

/// Save `<stem>_original.png` and `<stem>_cluster_<n>.png` (n from 1).
fn write_outputs(input: &Path, out_dir: &Path, result: &ClusterResult) -> Result<Vec<PathBuf>> {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let mut written = Vec::with_capacity(result.k() + 1);

    let original = out_dir.join(format!("{stem}_original.png"));
    result
        .original()
        .save(&original)
        .with_context(|| format!("writing {}", original.display()))?;
    written.push(original);

    for (i, cluster) in result.clusters().iter().enumerate() {
        let path = out_dir.join(format!("{stem}_cluster_{}.png", i + 1));
        cluster.save(&path).with_context(|| format!("writing {}", path.display()))?;
        tracing::debug!(path = %path.display(), "saved cluster");
        written.push(path);
    }

    Ok(written)
}

fn summary_json(input: &Path, result: &ClusterResult, written: &[PathBuf]) -> serde_json::Value {
    let (width, height) = result.original().dimensions();
    json!({
        "input": input.display().to_string(),
        "width": width,
        "height": height,
        "k": result.k(),
        "palette": result.palette_hex(),
        "sizes": result.cluster_sizes(),
        "iterations": result.iterations(),
        "converged": result.converged(),
        "inertia": result.inertia(),
        "outputs": written.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
    })
}
