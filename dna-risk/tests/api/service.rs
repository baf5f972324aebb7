use std::fs;
use std::sync::Arc;
use std::thread;

use color_eyre::Result;
use tempfile::tempdir;

use dna_risk::{Error, ErrorKind, ModelArtifact, PredictionService};

use crate::helpers::{high_risk_request, small_config, train_into};

#[test]
fn missing_artifact_is_a_configuration_error_every_time() -> Result<()> {
    let dir = tempdir()?;
    let service = PredictionService::new(dir.path().join("model.json"));

    for _ in 0..3 {
        let err = service.predict(&high_risk_request()).unwrap_err();
        assert!(matches!(err, Error::ArtifactMissing { .. }));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
    assert!(PredictionService::open(dir.path().join("model.json")).is_err());

    Ok(())
}

#[test]
fn artifact_is_loaded_on_first_use() -> Result<()> {
    let dir = tempdir()?;
    let config = small_config(dir.path(), 42);
    train_into(dir.path(), 42)?;

    let service = PredictionService::new(config.artifact_path());
    assert!(!service.is_loaded());

    let metadata = service.metadata()?;

    assert!(service.is_loaded());
    assert_eq!(
        metadata.classes.as_deref(),
        Some(&["High", "Low", "Medium"].map(String::from)[..])
    );
    assert_eq!(metadata.feature_label_to_int["Class_Label"].len(), 3);

    Ok(())
}

#[test]
fn high_risk_sample_is_predicted_high() -> Result<()> {
    let dir = tempdir()?;
    let config = small_config(dir.path(), 42);
    train_into(dir.path(), 42)?;
    let service = PredictionService::open(config.artifact_path())?;

    let response = service.predict(&high_risk_request())?;

    assert_eq!(response.prediction, "High");
    assert_eq!(response.class_index, Some(0));
    assert_eq!(
        response.classes,
        Some(vec!["High".to_string(), "Low".to_string(), "Medium".to_string()])
    );

    Ok(())
}

#[test]
fn predictions_are_deterministic() -> Result<()> {
    let dir = tempdir()?;
    let outcome = train_into(dir.path(), 42)?;
    let service = PredictionService::with_artifact(dir.path().join("model.json"), outcome.artifact);

    let first = service.predict(&high_risk_request())?;
    for _ in 0..5 {
        assert_eq!(service.predict(&high_risk_request())?, first);
    }

    Ok(())
}

#[test]
fn foreign_class_list_is_an_internal_inconsistency() -> Result<()> {
    let dir = tempdir()?;
    let config = small_config(dir.path(), 42);
    train_into(dir.path(), 42)?;

    let path = config.artifact_path();
    let mut json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    json["classes"] = serde_json::json!(["unrelated"]);
    fs::write(&path, serde_json::to_string(&json)?)?;

    let service = PredictionService::new(&path);
    service.metadata()?;
    let err = service.predict(&high_risk_request()).unwrap_err();

    assert!(matches!(err, Error::InternalInconsistency { .. }));
    assert_eq!(err.kind(), ErrorKind::Internal);

    Ok(())
}

#[test]
fn replace_and_reload_swap_the_whole_artifact() -> Result<()> {
    let dir = tempdir()?;
    let config = small_config(dir.path(), 42);
    train_into(dir.path(), 42)?;
    let service = PredictionService::open(config.artifact_path())?;
    let before = service.artifact()?;

    let other_dir = tempdir()?;
    let other = train_into(other_dir.path(), 9)?.artifact;

    let replaced = service.replace(other.clone());
    assert!(Arc::ptr_eq(&replaced, &service.artifact()?));
    assert_eq!(*service.artifact()?, other);

    // Callers holding the old artifact keep a complete copy of it
    assert_eq!(*before, ModelArtifact::load(config.artifact_path())?);

    service.replace((*before).clone());
    other.save(config.artifact_path())?;
    let reloaded = service.reload()?;
    assert_eq!(*reloaded, other);
    assert!(Arc::ptr_eq(&reloaded, &service.artifact()?));

    Ok(())
}

#[test]
fn concurrent_predictions_survive_a_replacement() -> Result<()> {
    let dir = tempdir()?;
    let outcome = train_into(dir.path(), 42)?;
    let replacement = outcome.artifact.clone();
    let service = PredictionService::with_artifact(dir.path().join("model.json"), outcome.artifact);
    let expected = service.predict(&high_risk_request())?;

    thread::scope(|s| {
        let readers = (0..8)
            .map(|_| {
                s.spawn(|| {
                    (0..20)
                        .map(|_| service.predict(&high_risk_request()))
                        .collect::<Vec<_>>()
                })
            })
            .collect::<Vec<_>>();

        s.spawn(|| service.replace(replacement));

        for reader in readers {
            for response in reader.join().unwrap() {
                assert_eq!(response.unwrap(), expected);
            }
        }
    });

    Ok(())
}

#[test]
fn concurrent_first_calls_share_one_load() -> Result<()> {
    let dir = tempdir()?;
    let config = small_config(dir.path(), 42);
    train_into(dir.path(), 42)?;
    let service = PredictionService::new(config.artifact_path());

    let loaded = thread::scope(|s| {
        let handles = (0..8)
            .map(|_| s.spawn(|| service.artifact()))
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Result<Vec<_>, _>>()
    })?;

    assert!(service.is_loaded());
    let first = &loaded[0];
    assert!(loaded.iter().all(|artifact| Arc::ptr_eq(artifact, first)));
    assert!(Arc::ptr_eq(first, &service.artifact()?));

    Ok(())
}
