use std::fs;

use color_eyre::Result;
use tempfile::tempdir;

use dna_risk::pipeline::{self, METRICS_FILE};
use dna_risk::{Error, ErrorKind, FEATURE_COLUMNS, ModelArtifact, ValidationError};

use crate::helpers::{small_config, train_into};

#[test]
fn training_writes_artifact_and_metrics() -> Result<()> {
    let dir = tempdir()?;
    let config = small_config(dir.path(), 42);

    let outcome = pipeline::train(&config)?;

    let loaded = ModelArtifact::load(config.artifact_path())?;
    assert_eq!(loaded, outcome.artifact);

    let meta: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join(METRICS_FILE))?)?;
    assert_eq!(meta["target"], "Disease_Risk");
    assert_eq!(meta["test_rows"], 18);
    assert_eq!(meta["train_rows"], 42);
    assert!(meta["classification_report"]["classes"]["High"].is_object());

    Ok(())
}

#[test]
fn artifact_lists_features_in_training_order() -> Result<()> {
    let dir = tempdir()?;
    let outcome = train_into(dir.path(), 42)?;

    assert_eq!(outcome.artifact.features().names(), FEATURE_COLUMNS);
    assert_eq!(outcome.artifact.target(), "Disease_Risk");
    assert_eq!(outcome.artifact.classes(), ["High", "Low", "Medium"]);

    Ok(())
}

#[test]
fn separable_fixture_is_learned() -> Result<()> {
    let dir = tempdir()?;
    let outcome = train_into(dir.path(), 42)?;

    assert!(
        outcome.report.accuracy >= 0.8,
        "accuracy {}",
        outcome.report.accuracy
    );

    Ok(())
}

#[test]
fn same_seed_reproduces_the_run() -> Result<()> {
    let first_dir = tempdir()?;
    let second_dir = tempdir()?;

    let first = train_into(first_dir.path(), 7)?;
    let second = train_into(second_dir.path(), 7)?;

    assert_eq!(first.partition, second.partition);
    assert_eq!(first.report, second.report);
    assert_eq!(first.artifact, second.artifact);

    Ok(())
}

#[test]
fn different_seeds_hold_out_different_rows() -> Result<()> {
    let first_dir = tempdir()?;
    let second_dir = tempdir()?;

    let first = train_into(first_dir.path(), 1)?;
    let second = train_into(second_dir.path(), 2)?;

    assert_eq!(first.partition.test.len(), second.partition.test.len());
    assert_ne!(first.partition.test, second.partition.test);

    Ok(())
}

#[test]
fn missing_columns_fail_before_anything_is_written() -> Result<()> {
    let dir = tempdir()?;
    let dataset = dir.path().join("partial.csv");
    fs::write(
        &dataset,
        "Sample_ID,GC_Content,AT_Content,Num_A,Num_T,Num_C,Num_G,kmer_3_freq,Class_Label,Disease_Risk\n\
         S1,40.0,60.0,1,2,3,4,0.02,low,Low\n\
         S2,60.0,40.0,4,3,2,1,0.12,high,High\n",
    )?;
    let mut config = small_config(dir.path().join("model"), 42);
    config.dataset = dataset;

    let err = pipeline::train(&config).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(matches!(
        err,
        Error::Validation(ValidationError::MissingColumns { ref columns })
            if columns == &["Mutation_Flag"]
    ));
    assert!(!config.artifact_path().exists());
    assert!(!config.metrics_path().exists());

    Ok(())
}
