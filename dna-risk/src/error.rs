use std::path::PathBuf;

use thiserror::Error;

/// Input problems the caller can fix. Every variant names the offending
/// field, value or row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required columns in dataset: {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("{feature}: value {value:?} is not a known category")]
    UnknownCategory { feature: String, value: String },

    #[error("{feature}: value {value:?} is not numeric")]
    NotNumeric { feature: String, value: String },

    #[error("{feature}: value is missing")]
    MissingField { feature: String },

    #[error("expected {expected} feature values, got {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("row {row}: target {target} is missing")]
    MissingTarget { row: usize, target: String },

    #[error("{rows} rows cannot be split into train and held-out partitions")]
    TooFewRows { rows: usize },
}

impl ValidationError {
    /// The feature or column this error is about, if it concerns exactly one
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::UnknownCategory { feature, .. }
            | ValidationError::NotNumeric { feature, .. }
            | ValidationError::MissingField { feature } => Some(feature.as_str()),
            ValidationError::MissingTarget { target, .. } => Some(target.as_str()),
            ValidationError::MissingColumns { columns } if columns.len() == 1 => {
                Some(columns[0].as_str())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("model artifact not found at {}; train the model first", .path.display())]
    ArtifactMissing { path: PathBuf },

    #[error("model artifact at {} is unusable: {reason}", .path.display())]
    ArtifactUnreadable { path: PathBuf, reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("predicted label {label:?} is not in the artifact's class list {classes:?}")]
    InternalInconsistency { label: String, classes: Vec<String> },

    #[error("estimator failure: {0}")]
    Estimator(#[from] risk_forest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of an [`Error`] for whoever serves the result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The artifact is absent or unusable; an operator has to retrain
    Configuration,
    /// The caller sent something that can be corrected
    Validation,
    /// Server-side failure, including artifacts that contradict themselves
    Internal,
}

impl ErrorKind {
    pub fn is_client_error(self) -> bool {
        self == ErrorKind::Validation
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ArtifactMissing { .. } | Error::ArtifactUnreadable { .. } => {
                ErrorKind::Configuration
            }
            Error::Validation(_) => ErrorKind::Validation,
            Error::InternalInconsistency { .. }
            | Error::Estimator(_)
            | Error::Io(_)
            | Error::Csv(_)
            | Error::Json(_) => ErrorKind::Internal,
        }
    }

    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Error::Validation(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_name_their_field() {
        let err = ValidationError::UnknownCategory {
            feature: "Class_Label".to_string(),
            value: "critical".to_string(),
        };

        assert_eq!(err.field(), Some("Class_Label"));
        assert_eq!(
            err.to_string(),
            "Class_Label: value \"critical\" is not a known category"
        );
    }

    #[test]
    fn missing_columns_are_listed() {
        let err = ValidationError::MissingColumns {
            columns: vec!["Num_G".to_string(), "Disease_Risk".to_string()],
        };

        assert_eq!(
            err.to_string(),
            "missing required columns in dataset: Num_G, Disease_Risk"
        );
        assert_eq!(err.field(), None);
    }

    #[test]
    fn kinds_separate_configuration_from_validation() {
        let missing = Error::ArtifactMissing {
            path: PathBuf::from("model.json"),
        };
        let invalid = Error::from(ValidationError::MissingField {
            feature: "Num_A".to_string(),
        });
        let inconsistent = Error::InternalInconsistency {
            label: "High".to_string(),
            classes: vec![],
        };

        assert_eq!(missing.kind(), ErrorKind::Configuration);
        assert_eq!(invalid.kind(), ErrorKind::Validation);
        assert_eq!(inconsistent.kind(), ErrorKind::Internal);
        assert!(invalid.kind().is_client_error());
        assert!(!missing.kind().is_client_error());
    }
}
