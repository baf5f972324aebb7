use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::Context;

use dna_risk::{ModelArtifact, telemetry};
use risk_forest::Node;

#[derive(Parser)]
#[command(author, version, about = "Describe a trained model artifact", long_about = None)]
struct Cli {
    /// Model artifact
    #[arg(short = 'm', long = "model", value_name = "MODEL_FILE", default_value = "model/model.json")]
    model: PathBuf,

    /// Also print every node of the forest
    #[arg(long)]
    nodes: bool,

    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();
    telemetry::init(args.verbose)?;

    let artifact = ModelArtifact::load(&args.model).context("Could not load model artifact.")?;
    let forest = artifact.model();

    let branches = forest
        .nodes()
        .iter()
        .filter(|n| matches!(n, Node::Branch(_)))
        .count();
    let leaves = forest.nodes().len() - branches;

    println!(
        "--- Forest ---\nTrees: {} | Features: {} | Classes: {}\nNodes: {} | Branches: {} , leaves: {}\n--------------\n",
        forest.num_trees(),
        forest.num_features(),
        forest.num_classes(),
        forest.nodes().len(),
        branches,
        leaves
    );

    println!("{}", serde_json::to_string_pretty(&artifact.metadata())?);

    if args.nodes {
        println!("\n{forest}");
    }

    Ok(())
}
