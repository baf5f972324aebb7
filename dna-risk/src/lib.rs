//! Disease-risk prediction from derived DNA sequence features.
//!
//! Training turns a CSV dataset into a [`ModelArtifact`]; the
//! [`PredictionService`] serves metadata and predictions from it. Both sides
//! encode feature values through [`encoding::encode_value`].

pub mod artifact;
pub mod dataset;
pub mod encoding;
pub mod error;
pub mod features;
pub mod metrics;
pub mod pipeline;
pub mod service;
pub mod telemetry;
pub mod value;

pub use artifact::{ModelArtifact, ModelMetadata};
pub use dataset::Dataset;
pub use encoding::{CategoricalMapping, Encoder, FeatureMappings};
pub use error::{Error, ErrorKind, Result, ValidationError};
pub use features::{FEATURE_COLUMNS, FeatureSpec, TARGET_COLUMN};
pub use pipeline::{TrainingConfig, TrainingOutcome};
pub use service::{PredictionRequest, PredictionResponse, PredictionService};
pub use value::RawValue;
