//! Serving side: metadata and single-row prediction over the current
//! artifact.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::artifact::{ModelArtifact, ModelMetadata};
use crate::error::{Error, Result};
use crate::value::RawValue;

/// One row of raw feature values, as a client sends it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(rename = "GC_Content")]
    pub gc_content: f64,
    #[serde(rename = "AT_Content")]
    pub at_content: f64,
    #[serde(rename = "Num_A")]
    pub num_a: i64,
    #[serde(rename = "Num_T")]
    pub num_t: i64,
    #[serde(rename = "Num_C")]
    pub num_c: i64,
    #[serde(rename = "Num_G")]
    pub num_g: i64,
    pub kmer_3_freq: f64,
    #[serde(rename = "Mutation_Flag")]
    pub mutation_flag: i64,
    /// An integer or a label such as `"medium"`
    #[serde(rename = "Class_Label")]
    pub class_label: RawValue,
}

impl PredictionRequest {
    /// The value sent for `feature`, `None` for names this request does not
    /// carry
    pub fn value(&self, feature: &str) -> Option<RawValue> {
        let value: RawValue = match feature {
            "GC_Content" => self.gc_content.into(),
            "AT_Content" => self.at_content.into(),
            "Num_A" => self.num_a.into(),
            "Num_T" => self.num_t.into(),
            "Num_C" => self.num_c.into(),
            "Num_G" => self.num_g.into(),
            "kmer_3_freq" => self.kmer_3_freq.into(),
            "Mutation_Flag" => self.mutation_flag.into(),
            "Class_Label" => self.class_label.clone(),
            _ => return None,
        };
        Some(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: String,
    pub class_index: Option<usize>,
    pub classes: Option<Vec<String>>,
}

/// Hands out the current [`ModelArtifact`] to concurrent callers.
///
/// The artifact is loaded on first use (or up front with [`open`]) and is
/// only ever replaced as a whole. Every call works on the `Arc` it took at
/// its start, so a concurrent replacement never mixes two artifacts within
/// one request.
///
/// [`open`]: PredictionService::open
#[derive(Debug)]
pub struct PredictionService {
    path: PathBuf,
    current: RwLock<Option<Arc<ModelArtifact>>>,
}

impl PredictionService {
    /// A service that loads `path` on first use
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(None),
        }
    }

    /// A service with the artifact at `path` loaded right away
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let service = Self::new(path);
        service.artifact()?;
        Ok(service)
    }

    /// A service already serving `artifact`; `path` is used by [`reload`].
    ///
    /// [`reload`]: PredictionService::reload
    pub fn with_artifact(path: impl Into<PathBuf>, artifact: ModelArtifact) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(Some(Arc::new(artifact))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// The artifact currently serving requests, loading it if needed
    pub fn artifact(&self) -> Result<Arc<ModelArtifact>> {
        let current = self.current.read().clone();
        if let Some(artifact) = current {
            return Ok(artifact);
        }

        // Only one caller at a time holds the upgradable guard, so concurrent
        // first calls deserialize once
        let guard = self.current.upgradable_read();
        if let Some(artifact) = guard.as_ref() {
            return Ok(Arc::clone(artifact));
        }

        let artifact = Arc::new(ModelArtifact::load(&self.path)?);
        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        *guard = Some(Arc::clone(&artifact));

        Ok(artifact)
    }

    /// Read the artifact from disk again and swap it in
    pub fn reload(&self) -> Result<Arc<ModelArtifact>> {
        let artifact = Arc::new(ModelArtifact::load(&self.path)?);
        self.swap(Arc::clone(&artifact));
        info!(path = %self.path.display(), "reloaded model artifact");
        Ok(artifact)
    }

    /// Swap in an artifact that is already in memory
    pub fn replace(&self, artifact: ModelArtifact) -> Arc<ModelArtifact> {
        let artifact = Arc::new(artifact);
        self.swap(Arc::clone(&artifact));
        info!("replaced model artifact");
        artifact
    }

    fn swap(&self, artifact: Arc<ModelArtifact>) {
        *self.current.write() = Some(artifact);
    }

    pub fn metadata(&self) -> Result<ModelMetadata> {
        Ok(self.artifact()?.metadata())
    }

    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        let artifact = self.artifact()?;
        let row = artifact
            .encoder()
            .encode_named(|feature| request.value(feature))?;
        decide(&artifact, &row)
    }

    /// Predict from values given in the artifact's feature order
    pub fn predict_row(&self, values: &[RawValue]) -> Result<PredictionResponse> {
        let artifact = self.artifact()?;
        let row = artifact.encoder().encode_row(values)?;
        decide(&artifact, &row)
    }
}

/// Run the estimator and map its class id back onto the artifact's class
/// list
fn decide(artifact: &ModelArtifact, row: &[f32]) -> Result<PredictionResponse> {
    let inconsistent = |label: String| Error::InternalInconsistency {
        label,
        classes: artifact.classes().to_vec(),
    };

    let class = artifact.model().predict(row)?;
    let label = artifact
        .model()
        .class_label(class)
        .ok_or_else(|| inconsistent(format!("#{class}")))?;
    let class_index = artifact
        .classes()
        .iter()
        .position(|c| c == label)
        .ok_or_else(|| inconsistent(label.to_string()))?;

    debug!(?row, prediction = label, class_index, "predicted");

    Ok(PredictionResponse {
        prediction: label.to_string(),
        class_index: Some(class_index),
        classes: Some(artifact.classes().to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_fields_use_column_names() {
        let json = r#"{
            "GC_Content": 52.5, "AT_Content": 47.5,
            "Num_A": 12, "Num_T": 11, "Num_C": 13, "Num_G": 14,
            "kmer_3_freq": 0.25, "Mutation_Flag": 1, "Class_Label": "medium"
        }"#;

        let request: PredictionRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.value("GC_Content"), Some(RawValue::Float(52.5)));
        assert_eq!(request.value("Num_G"), Some(RawValue::Int(14)));
        assert_eq!(request.value("Class_Label"), Some(RawValue::from("medium")));
        assert_eq!(request.value("Disease_Risk"), None);
    }

    #[test]
    fn class_label_accepts_integers() {
        let json = r#"{
            "GC_Content": 50, "AT_Content": 50,
            "Num_A": 1, "Num_T": 1, "Num_C": 1, "Num_G": 1,
            "kmer_3_freq": 0.1, "Mutation_Flag": 0, "Class_Label": 2
        }"#;

        let request: PredictionRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.class_label, RawValue::Int(2));
        assert_eq!(request.gc_content, 50.0);
    }

    #[test]
    fn unloaded_service_reports_missing_artifact_on_every_call() {
        let service = PredictionService::new("/nonexistent/model.json");

        assert!(!service.is_loaded());
        for _ in 0..2 {
            let err = service.metadata().unwrap_err();
            assert!(matches!(err, Error::ArtifactMissing { .. }));
        }
        assert!(!service.is_loaded());
    }
}
