use std::fmt;

use serde::{Deserialize, Serialize};

/// The nine derived sequence features, in model column order
pub const FEATURE_COLUMNS: [&str; 9] = [
    "GC_Content",
    "AT_Content",
    "Num_A",
    "Num_T",
    "Num_C",
    "Num_G",
    "kmer_3_freq",
    "Mutation_Flag",
    "Class_Label",
];

pub const TARGET_COLUMN: &str = "Disease_Risk";

/// Identifier and free-text columns the raw dataset carries but the model
/// never sees
pub const DROPPED_COLUMNS: [&str; 3] = ["Sample_ID", "Sequence", "Sequence_Length"];

/// Ordered list of feature names. The position of a name is the column it
/// occupies in every encoded feature vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSpec(Vec<String>);

impl FeatureSpec {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self::new(FEATURE_COLUMNS)
    }
}

impl fmt::Display for FeatureSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}
