use anyhow::Context;
use balltrack::batch::run_batch;
use balltrack::config::AnnotatorConfig;
use balltrack::cv::OpenCvBackend;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Draws the ball trajectory onto every video of a folder and writes a
/// per-frame detection log next to it.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// folder with .mp4/.mov inputs
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// folder for annotated videos
    #[arg(long)]
    results: Option<PathBuf>,

    /// folder for CSV detection logs
    #[arg(long)]
    annotations: Option<PathBuf>,

    /// folder with `<video stem>.dets` detector dumps (defaults to the input folder)
    #[arg(short, long)]
    detections: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("balltrack=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AnnotatorConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AnnotatorConfig::default(),
    };

    if let Some(dir) = args.input {
        config.batch.input_dir = dir;
    }
    if let Some(dir) = args.results {
        config.batch.results_dir = dir;
    }
    if let Some(dir) = args.annotations {
        config.batch.annotations_dir = dir;
    }

    let dumps = args
        .detections
        .unwrap_or_else(|| config.batch.input_dir.clone());
    let mut backend = OpenCvBackend::new(dumps);

    let report = run_batch(&config, &mut backend)
        .with_context(|| format!("processing {}", config.batch.input_dir.display()))?;

    info!(
        completed = report.completed(),
        skipped = report.skipped(),
        failed = report.failed(),
        "all videos processed"
    );

    Ok(())
}
