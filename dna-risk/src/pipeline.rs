//! Training: dataset in, artifact and metrics report out.

use std::fs;
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use risk_forest::{Forest, ForestConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::artifact::{ARTIFACT_FILE, ModelArtifact};
use crate::dataset::Dataset;
use crate::encoding::{Encoder, FeatureMappings, build_mappings};
use crate::error::{Result, ValidationError};
use crate::features::{DROPPED_COLUMNS, FeatureSpec, TARGET_COLUMN};
use crate::metrics::ClassificationReport;

pub const METRICS_FILE: &str = "model_meta.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub dataset: PathBuf,
    /// Directory receiving the artifact and the metrics report
    pub output_dir: PathBuf,
    /// Share of rows held out for evaluation, rounded up
    pub test_ratio: f64,
    /// Seed of the train/held-out permutation
    pub seed: u64,
    pub forest: ForestConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("data/dna.csv"),
            output_dir: PathBuf::from("model"),
            test_ratio: 0.3,
            seed: 42,
            forest: ForestConfig::default(),
        }
    }
}

impl TrainingConfig {
    pub fn artifact_path(&self) -> PathBuf {
        self.output_dir.join(ARTIFACT_FILE)
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.output_dir.join(METRICS_FILE)
    }
}

/// Row indices of the two halves of the dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `rows` indices with `seed` and hold out the first
/// `ceil(rows * test_ratio)` of them
pub fn split_rows(rows: usize, test_ratio: f64, seed: u64) -> Result<Partition, ValidationError> {
    let n_test = (rows as f64 * test_ratio).ceil() as usize;
    if n_test == 0 || n_test >= rows {
        return Err(ValidationError::TooFewRows { rows });
    }

    let mut indices = (0..rows).collect::<Vec<_>>();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));

    let train = indices.split_off(n_test);
    Ok(Partition {
        train,
        test: indices,
    })
}

/// The human-readable record written next to the artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub accuracy: f64,
    pub classification_report: ClassificationReport,
    pub features: FeatureSpec,
    pub target: String,
    pub feature_label_to_int: FeatureMappings,
    pub seed: u64,
    pub test_ratio: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub report: ClassificationReport,
    pub partition: Partition,
}

impl TrainingOutcome {
    pub fn metrics_report(&self, config: &TrainingConfig) -> MetricsReport {
        MetricsReport {
            accuracy: self.report.accuracy,
            classification_report: self.report.clone(),
            features: self.artifact.features().clone(),
            target: self.artifact.target().to_string(),
            feature_label_to_int: self.artifact.mappings().clone(),
            seed: config.seed,
            test_ratio: config.test_ratio,
            train_rows: self.partition.train.len(),
            test_rows: self.partition.test.len(),
        }
    }
}

/// Read the configured dataset, fit a model on it and persist the results
pub fn train(config: &TrainingConfig) -> Result<TrainingOutcome> {
    let dataset = Dataset::read(&config.dataset)?;
    let outcome = fit(dataset, &FeatureSpec::default(), TARGET_COLUMN, config)?;
    persist(&outcome, config)?;
    Ok(outcome)
}

/// Fit and evaluate a model on an in-memory dataset
pub fn fit(
    mut dataset: Dataset,
    spec: &FeatureSpec,
    target: &str,
    config: &TrainingConfig,
) -> Result<TrainingOutcome> {
    let dropped = dataset.drop_columns(&DROPPED_COLUMNS);
    if !dropped.is_empty() {
        info!(columns = ?dropped, "dropped columns the model does not use");
    }

    dataset.require_columns(spec.iter().chain([target]))?;

    let mappings = build_mappings(&dataset, spec);
    let matrix = Encoder::new(spec, &mappings).encode_dataset(&dataset)?;
    info!(
        rows = matrix.len(),
        features = spec.len(),
        categorical = mappings.len(),
        "encoded training matrix"
    );

    let classes = target_classes(&dataset, target);
    let targets = encode_targets(&dataset, target, &classes)?;

    let partition = split_rows(dataset.len(), config.test_ratio, config.seed)?;
    let pick = |rows: &[usize]| -> (Vec<Vec<f32>>, Vec<u32>) {
        rows.iter()
            .map(|&row| (matrix[row].clone(), targets[row]))
            .unzip()
    };
    let (train_x, train_y) = pick(&partition.train);
    let (test_x, test_y) = pick(&partition.test);

    info!(
        train = train_y.len(),
        test = test_y.len(),
        trees = config.forest.num_trees,
        "fitting forest"
    );
    let model = Forest::fit(&train_x, &train_y, classes.clone(), &config.forest)?;

    let predicted = test_x
        .iter()
        .map(|row| model.predict(row))
        .collect::<Result<Vec<_>, _>>()?;
    let report = ClassificationReport::new(&test_y, &predicted, &classes);
    info!(accuracy = report.accuracy, "evaluated on held-out rows");

    let artifact = ModelArtifact::new(model, spec.clone(), target, classes, mappings);

    Ok(TrainingOutcome {
        artifact,
        report,
        partition,
    })
}

/// Write the artifact and the metrics report into the output directory
pub fn persist(outcome: &TrainingOutcome, config: &TrainingConfig) -> Result<()> {
    outcome.artifact.save(config.artifact_path())?;
    write_metrics(&outcome.metrics_report(config), config.metrics_path())
}

fn write_metrics(report: &MetricsReport, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, serde_json::to_string_pretty(report)?)?;
    info!(path = %path.display(), "saved metrics report");
    Ok(())
}

/// Distinct target labels: numeric order for a numeric column, lexicographic
/// otherwise
fn target_classes(dataset: &Dataset, target: &str) -> Vec<String> {
    let mut classes = dataset.distinct_labels(target);
    if dataset.is_numeric(target) {
        classes.sort_by(|a, b| {
            let a = a.parse::<f64>().unwrap_or(f64::NAN);
            let b = b.parse::<f64>().unwrap_or(f64::NAN);
            a.total_cmp(&b)
        });
    }
    classes
}

fn encode_targets(
    dataset: &Dataset,
    target: &str,
    classes: &[String],
) -> Result<Vec<u32>, ValidationError> {
    let Some(cells) = dataset.column(target) else {
        return Err(ValidationError::MissingColumns {
            columns: vec![target.to_string()],
        });
    };

    cells
        .enumerate()
        .map(|(row, cell)| {
            let missing = || ValidationError::MissingTarget {
                row,
                target: target.to_string(),
            };
            let label = cell.ok_or_else(missing)?;
            let class = classes.iter().position(|c| c == label).ok_or_else(missing)?;
            Ok(class as u32)
        })
        .collect()
}
