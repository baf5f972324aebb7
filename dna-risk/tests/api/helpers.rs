use std::path::Path;

use color_eyre::Result;

use dna_risk::pipeline::{self, TrainingConfig, TrainingOutcome};
use dna_risk::{PredictionRequest, RawValue};

pub const DATASET: &str = "./tests/test-data/dna.csv";

/// A fast configuration writing into `output_dir`
pub fn small_config(output_dir: impl AsRef<Path>, seed: u64) -> TrainingConfig {
    let mut config = TrainingConfig {
        dataset: DATASET.into(),
        output_dir: output_dir.as_ref().to_path_buf(),
        seed,
        ..Default::default()
    };
    config.forest.num_trees = 25;
    config.forest.seed = seed;
    config
}

pub fn train_into(output_dir: impl AsRef<Path>, seed: u64) -> Result<TrainingOutcome> {
    Ok(pipeline::train(&small_config(output_dir, seed))?)
}

/// A sample that looks like the high-risk rows of the fixture
pub fn high_risk_request() -> PredictionRequest {
    PredictionRequest {
        gc_content: 66.0,
        at_content: 34.0,
        num_a: 16,
        num_t: 18,
        num_c: 36,
        num_g: 34,
        kmer_3_freq: 0.135,
        mutation_flag: 1,
        class_label: RawValue::from("high"),
    }
}

/// Sample `S001` of the fixture
pub fn first_sample_request() -> PredictionRequest {
    PredictionRequest {
        gc_content: 40.0,
        at_content: 60.0,
        num_a: 18,
        num_t: 30,
        num_c: 15,
        num_g: 17,
        kmer_3_freq: 0.0291,
        mutation_flag: 0,
        class_label: RawValue::from("low"),
    }
}
