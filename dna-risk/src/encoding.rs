//! Categorical mappings and the feature encoder.
//!
//! The same [`encode_value`] turns CSV cells into the training matrix and
//! request values into inference vectors, so both sides of the model see
//! identical codes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::ValidationError;
use crate::features::FeatureSpec;
use crate::value::RawValue;

/// Label to code table of one categorical feature.
///
/// Codes run from 0 in ascending label order, so the table only depends on
/// the set of labels it was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoricalMapping(BTreeMap<String, u32>);

impl CategoricalMapping {
    pub fn from_labels<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        let mut labels = labels.into_iter().map(Into::into).collect::<Vec<String>>();
        labels.sort();
        labels.dedup();

        Self(
            labels
                .into_iter()
                .enumerate()
                .map(|(code, label)| (label, code as u32))
                .collect(),
        )
    }

    pub fn get(&self, label: &str) -> Option<u32> {
        self.0.get(label).copied()
    }

    /// Resolve a raw value: first as a label, then by its textual form
    pub fn lookup(&self, value: &RawValue) -> Option<u32> {
        value
            .as_label()
            .and_then(|label| self.get(label))
            .or_else(|| self.get(&value.to_text()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(label, &code)| (label.as_str(), code))
    }
}

/// Mapping of every categorical feature, keyed by feature name. Features
/// without an entry are numeric.
pub type FeatureMappings = BTreeMap<String, CategoricalMapping>;

/// Build a mapping for every feature of `spec` whose column in `dataset` is
/// not numeric
pub fn build_mappings(dataset: &Dataset, spec: &FeatureSpec) -> FeatureMappings {
    spec.iter()
        .filter(|feature| dataset.column_index(feature).is_some() && !dataset.is_numeric(feature))
        .map(|feature| {
            let mapping = CategoricalMapping::from_labels(dataset.distinct_labels(feature));
            debug!(feature, categories = mapping.len(), "built categorical mapping");
            (feature.to_string(), mapping)
        })
        .collect()
}

/// Encode one value of `feature` into model input.
///
/// Without a mapping the value must be numeric and passes through. With a
/// mapping the value must resolve to one of its labels.
pub fn encode_value(
    feature: &str,
    mapping: Option<&CategoricalMapping>,
    value: &RawValue,
) -> Result<f32, ValidationError> {
    match mapping {
        Some(mapping) => mapping
            .lookup(value)
            .map(|code| code as f32)
            .ok_or_else(|| ValidationError::UnknownCategory {
                feature: feature.to_string(),
                value: value.to_text(),
            }),
        None => value
            .as_number()
            .map(model_input)
            .ok_or_else(|| ValidationError::NotNumeric {
                feature: feature.to_string(),
                value: value.to_text(),
            }),
    }
}

/// The only place numbers are narrowed to the estimator's precision
fn model_input(value: f64) -> f32 {
    value as f32
}

/// Encodes whole rows in the column order of a [`FeatureSpec`]
#[derive(Debug, Clone, Copy)]
pub struct Encoder<'a> {
    spec: &'a FeatureSpec,
    mappings: &'a FeatureMappings,
}

impl<'a> Encoder<'a> {
    pub fn new(spec: &'a FeatureSpec, mappings: &'a FeatureMappings) -> Self {
        Self { spec, mappings }
    }

    /// Encode values given positionally, in feature order
    pub fn encode_row(&self, values: &[RawValue]) -> Result<Vec<f32>, ValidationError> {
        if values.len() != self.spec.len() {
            return Err(ValidationError::FieldCount {
                expected: self.spec.len(),
                found: values.len(),
            });
        }

        self.spec
            .iter()
            .zip(values)
            .map(|(feature, value)| encode_value(feature, self.mappings.get(feature), value))
            .collect()
    }

    /// Encode values looked up by feature name
    pub fn encode_named<F>(&self, value_of: F) -> Result<Vec<f32>, ValidationError>
    where
        F: Fn(&str) -> Option<RawValue>,
    {
        self.spec
            .iter()
            .map(|feature| {
                let value = value_of(feature).ok_or_else(|| ValidationError::MissingField {
                    feature: feature.to_string(),
                })?;
                encode_value(feature, self.mappings.get(feature), &value)
            })
            .collect()
    }

    /// Encode every row of a dataset. Missing cells become `NaN`.
    pub fn encode_dataset(&self, dataset: &Dataset) -> Result<Vec<Vec<f32>>, ValidationError> {
        dataset.require_columns(self.spec.iter())?;

        let columns = self
            .spec
            .iter()
            .filter_map(|feature| {
                let idx = dataset.column_index(feature)?;
                Some((feature, idx, self.mappings.get(feature)))
            })
            .collect::<Vec<_>>();

        (0..dataset.len())
            .map(|row| {
                columns
                    .iter()
                    .map(|&(feature, idx, mapping)| match dataset.cell(row, idx) {
                        Some(text) => encode_value(feature, mapping, &RawValue::from(text)),
                        None => Ok(f32::NAN),
                    })
                    .collect::<Result<Vec<f32>, _>>()
            })
            .collect()
    }
}
