//! Corpus analysis CLI
//!
//! Runs the whole pipeline and prints the report:
//! - Load and normalize the corpus
//! - Build TF-IDF and count matrices
//! - Reduce with truncated SVD and sweep the cluster count
//! - Fit the topic model and project to 2-D

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use std::path::PathBuf;
use topic_clustering::Pipeline;

#[derive(Parser)]
#[command(name = "analyze_corpus")]
#[command(about = "Cluster and topic-model a labelled text corpus", long_about = None)]
struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Corpus directory with one sub-directory per category
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// JSON dataset file
    #[arg(long, conflicts_with = "corpus")]
    dataset: Option<PathBuf>,

    /// Seed for every randomized step
    #[arg(short, long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut pipeline = match &cli.config {
        Some(path) => Pipeline::from_config_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Pipeline::default(),
    };

    let config = pipeline.config_mut();
    if let Some(dir) = cli.corpus {
        config.corpus.directory = Some(dir);
        config.corpus.dataset = None;
    }
    if let Some(path) = cli.dataset {
        config.corpus.directory = None;
        config.corpus.dataset = Some(path);
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    env_logger::Builder::from_env(Env::default().default_filter_or(config.logging.level.as_str()))
        .init();

    let corpus = pipeline.load_corpus().context("failed to load corpus")?;
    let report = pipeline.run(corpus)?;

    println!("{}", report);
    Ok(())
}
