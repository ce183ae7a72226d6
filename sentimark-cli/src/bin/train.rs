use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sentimark_engine::{LineCorpus, MarkovClassifier, ModelConfig, Settings, Smoothing, logging};

/// Train a Markov-chain sentiment classifier and save it as a snapshot.
///
/// Each input file holds one review per line. Hyperparameters not given on
/// the command line come from the settings file.
#[derive(Parser, Debug)]
#[command(name = "sentimark-train")]
#[command(about = "Train a Markov-chain sentiment classifier")]
struct Cli {
    /// Markov order: number of preceding tokens per transition
    #[arg(short = 'k', long)]
    order: Option<usize>,

    /// Smoothing: laplace, backoff or sgts
    #[arg(short, long)]
    smoothing: Option<Smoothing>,

    /// Per-step backoff discount in (0, 1] (backoff smoothing only)
    #[arg(long)]
    discount: Option<f64>,

    /// Output snapshot file
    #[arg(short, long)]
    file: PathBuf,

    /// Positive training reviews
    #[arg(short, long)]
    pos: PathBuf,

    /// Negative training reviews
    #[arg(short, long)]
    neg: PathBuf,

    /// Settings file (defaults to the user config file)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::resolve(cli.config.as_deref()).context("failed to load settings")?;
    logging::init(&settings.logging.filter);

    let training = &settings.training;
    let config = ModelConfig::new(
        cli.order.unwrap_or(training.order),
        cli.smoothing.unwrap_or(training.smoothing),
    )
    .with_backoff_discount(cli.discount.unwrap_or(training.backoff_discount));
    config.validate()?;

    eprintln!(
        "Training order-{} {} classifier from {:?} and {:?}...",
        config.order, config.smoothing, cli.pos, cli.neg
    );
    let classifier =
        MarkovClassifier::train(config, &LineCorpus::new(&cli.pos), &LineCorpus::new(&cli.neg))
            .context("training failed")?;

    eprintln!("Saving to {:?}...", cli.file);
    classifier
        .save(&cli.file)
        .with_context(|| format!("failed to save model to {:?}", cli.file))?;

    eprintln!("Done.");
    Ok(())
}
