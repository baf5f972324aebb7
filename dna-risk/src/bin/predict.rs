use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::{Context, eyre};

use dna_risk::{PredictionRequest, PredictionService, telemetry};

#[derive(Parser)]
#[command(author, version, about = "Predict disease risk for one sample", long_about = None)]
struct Cli {
    /// Model artifact
    #[arg(
        short = 'm',
        long = "model",
        value_name = "MODEL_FILE",
        env = "DNA_RISK_MODEL",
        default_value = "model/model.json"
    )]
    model: PathBuf,

    /// JSON request; read from stdin when omitted
    #[arg(short = 'r', long = "request", value_name = "REQUEST_FILE")]
    request: Option<PathBuf>,

    /// Print the model metadata instead of predicting
    #[arg(long)]
    metadata: bool,

    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();
    telemetry::init(args.verbose)?;

    let service = PredictionService::new(&args.model);

    if args.metadata {
        let metadata = service.metadata().context("Could not load model artifact.")?;
        println!("{}", serde_json::to_string_pretty(&metadata)?);
        return Ok(());
    }

    let body = match &args.request {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Could not read request file {}.", path.display()))?,
        None => {
            let mut body = String::new();
            io::stdin().read_to_string(&mut body)?;
            body
        }
    };
    let request: PredictionRequest =
        serde_json::from_str(&body).context("Malformed prediction request.")?;

    let response = service.predict(&request).map_err(|e| {
        let kind = if e.kind().is_client_error() {
            "rejected request"
        } else {
            "prediction failed"
        };
        eyre!("{kind}: {e}")
    })?;

    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
