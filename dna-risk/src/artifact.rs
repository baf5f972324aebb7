use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use risk_forest::Forest;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::encoding::{Encoder, FeatureMappings};
use crate::error::{Error, Result};
use crate::features::FeatureSpec;

/// Version of the on-disk artifact layout
pub const FORMAT_VERSION: u32 = 1;

pub const ARTIFACT_FILE: &str = "model.json";

/// Everything needed to feed the trained estimator exactly the way it was
/// trained. Never modified after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    format_version: u32,
    model: Forest,
    features: FeatureSpec,
    target: String,
    classes: Vec<String>,
    feature_label_to_int: FeatureMappings,
}

/// The part of an artifact a caller needs to build a valid request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub features: FeatureSpec,
    pub target: String,
    pub classes: Option<Vec<String>>,
    pub feature_label_to_int: FeatureMappings,
}

impl ModelArtifact {
    pub fn new(
        model: Forest,
        features: FeatureSpec,
        target: impl Into<String>,
        classes: Vec<String>,
        feature_label_to_int: FeatureMappings,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            model,
            features,
            target: target.into(),
            classes,
            feature_label_to_int,
        }
    }

    pub fn model(&self) -> &Forest {
        &self.model
    }

    pub fn features(&self) -> &FeatureSpec {
        &self.features
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn mappings(&self) -> &FeatureMappings {
        &self.feature_label_to_int
    }

    /// An encoder bound to this artifact's feature order and mappings
    pub fn encoder(&self) -> Encoder<'_> {
        Encoder::new(&self.features, &self.feature_label_to_int)
    }

    pub fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            features: self.features.clone(),
            target: self.target.clone(),
            classes: Some(self.classes.clone()),
            feature_label_to_int: self.feature_label_to_int.clone(),
        }
    }

    /// Structural checks on a deserialized artifact. The class list is not
    /// compared with the estimator's here, prediction reports that mismatch.
    fn check(&self) -> Result<(), String> {
        if self.format_version != FORMAT_VERSION {
            return Err(format!(
                "format version {} is not supported (expected {FORMAT_VERSION})",
                self.format_version
            ));
        }

        self.model.validate().map_err(|e| e.to_string())?;

        if self.features.len() != self.model.num_features() {
            return Err(format!(
                "{} features listed but the estimator expects {}",
                self.features.len(),
                self.model.num_features()
            ));
        }

        if let Some(feature) = self
            .feature_label_to_int
            .keys()
            .find(|f| self.features.position(f).is_none())
        {
            return Err(format!("mapping for unknown feature {feature}"));
        }

        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::ArtifactMissing {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let unreadable = |reason: String| Error::ArtifactUnreadable {
            path: path.to_path_buf(),
            reason,
        };

        let artifact: ModelArtifact =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| unreadable(e.to_string()))?;
        artifact.check().map_err(unreadable)?;

        info!(
            path = %path.display(),
            trees = artifact.model.num_trees(),
            classes = artifact.classes.len(),
            "loaded model artifact"
        );

        Ok(artifact)
    }

    /// Write the artifact next to `path` and move it into place, so readers
    /// only ever see a complete file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = staging_path(path);
        let mut writer = BufWriter::new(fs::File::create(&tmp)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        drop(writer);

        fs::rename(&tmp, path)?;
        info!(path = %path.display(), "saved model artifact");

        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
