use std::fmt;

use serde::{Deserialize, Serialize};

/// One feature value as it arrives, before encoding.
///
/// Requests carry typed JSON values, while training cells are read out of a
/// CSV file as text. Both end up here so they go through the same encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawValue {
    /// The value as a category label, without any conversion. Only text is a
    /// label as-is.
    pub fn as_label(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            RawValue::Int(_) | RawValue::Float(_) => None,
        }
    }

    /// Textual form used as the second lookup key: `3`, `1.0`, `0.25`, or the
    /// text itself.
    pub fn to_text(&self) -> String {
        match self {
            RawValue::Int(i) => i.to_string(),
            // Debug keeps the trailing `.0` on integral floats
            RawValue::Float(f) => format!("{f:?}"),
            RawValue::Text(s) => s.clone(),
        }
    }

    /// Numeric reading of the value, parsing text
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Int(i) => Some(*i as f64),
            RawValue::Float(f) => Some(*f),
            RawValue::Text(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Int(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}
