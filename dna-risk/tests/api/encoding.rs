use color_eyre::Result;
use tempfile::tempdir;

use dna_risk::features::DROPPED_COLUMNS;
use dna_risk::{Dataset, Error, ErrorKind, PredictionService, RawValue, ValidationError};

use crate::helpers::{DATASET, first_sample_request, high_risk_request, train_into};

#[test]
fn class_labels_map_in_sorted_order() -> Result<()> {
    let dir = tempdir()?;
    let outcome = train_into(dir.path(), 42)?;

    let mapping = &outcome.artifact.mappings()["Class_Label"];

    assert_eq!(mapping.get("high"), Some(0));
    assert_eq!(mapping.get("low"), Some(1));
    assert_eq!(mapping.get("medium"), Some(2));
    assert_eq!(outcome.artifact.mappings().len(), 1);

    Ok(())
}

#[test]
fn request_encodes_like_its_training_row() -> Result<()> {
    let dir = tempdir()?;
    let outcome = train_into(dir.path(), 42)?;
    let encoder = outcome.artifact.encoder();

    let mut dataset = Dataset::read(DATASET)?;
    dataset.drop_columns(&DROPPED_COLUMNS);
    let matrix = encoder.encode_dataset(&dataset)?;

    let request = first_sample_request();
    let row = encoder.encode_named(|feature| request.value(feature))?;

    assert_eq!(row, matrix[0]);

    Ok(())
}

#[test]
fn positional_and_named_requests_agree() -> Result<()> {
    let dir = tempdir()?;
    let outcome = train_into(dir.path(), 42)?;
    let request = high_risk_request();
    let values = outcome
        .artifact
        .features()
        .iter()
        .map(|feature| request.value(feature).unwrap())
        .collect::<Vec<_>>();

    let service = PredictionService::with_artifact(dir.path().join("model.json"), outcome.artifact);

    assert_eq!(service.predict(&request)?, service.predict_row(&values)?);

    Ok(())
}

#[test]
fn unknown_category_is_a_validation_error() -> Result<()> {
    let dir = tempdir()?;
    let outcome = train_into(dir.path(), 42)?;
    let service = PredictionService::with_artifact(dir.path().join("model.json"), outcome.artifact);

    let mut request = high_risk_request();
    request.class_label = RawValue::from("critical");
    let err = service.predict(&request).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(
        err.as_validation(),
        Some(&ValidationError::UnknownCategory {
            feature: "Class_Label".to_string(),
            value: "critical".to_string()
        })
    );
    assert_eq!(
        err.as_validation().and_then(ValidationError::field),
        Some("Class_Label")
    );

    Ok(())
}

#[test]
fn integer_class_label_is_not_a_known_category() -> Result<()> {
    let dir = tempdir()?;
    let outcome = train_into(dir.path(), 42)?;
    let service = PredictionService::with_artifact(dir.path().join("model.json"), outcome.artifact);

    let mut request = high_risk_request();
    request.class_label = RawValue::Int(0);

    assert!(matches!(
        service.predict(&request),
        Err(Error::Validation(ValidationError::UnknownCategory { .. }))
    ));

    Ok(())
}
