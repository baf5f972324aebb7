use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::Context;

use dna_risk::pipeline::{self, TrainingConfig};
use dna_risk::telemetry;

#[derive(Parser)]
#[command(author, version, about = "Train the disease-risk model", long_about = None)]
struct Cli {
    /// Training dataset (CSV)
    #[arg(short = 'i', long = "input", value_name = "DATASET", default_value = "data/dna.csv")]
    input: PathBuf,

    /// Directory receiving model.json and model_meta.json
    #[arg(short = 'o', long = "output", value_name = "DIR", default_value = "model")]
    output: PathBuf,

    /// Seed of the train/test split and of the forest
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Share of rows held out for evaluation
    #[arg(long, default_value_t = 0.3)]
    test_ratio: f64,

    /// Number of trees in the forest
    #[arg(long, default_value_t = 200)]
    trees: usize,

    /// Maximum tree depth, unbounded when omitted
    #[arg(long)]
    max_depth: Option<usize>,

    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();
    telemetry::init(args.verbose)?;

    let mut config = TrainingConfig {
        dataset: args.input,
        output_dir: args.output,
        test_ratio: args.test_ratio,
        seed: args.seed,
        ..Default::default()
    };
    config.forest.num_trees = args.trees;
    config.forest.max_depth = args.max_depth;
    config.forest.seed = args.seed;

    let outcome = pipeline::train(&config).with_context(|| {
        format!(
            "Could not train a model from {}.",
            config.dataset.display()
        )
    })?;

    println!("Accuracy: {:.4}\n", outcome.report.accuracy);
    println!("{}", outcome.report);
    println!("Model written to {}", config.artifact_path().display());
    println!("Metrics written to {}", config.metrics_path().display());

    Ok(())
}
