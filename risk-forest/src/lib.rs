pub mod forest;
pub mod train;

pub use forest::{Branch, Forest, Leaf, Node};
pub use train::{ForestConfig, MaxFeatures};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("cannot fit a forest on an empty training set")]
    EmptyTrainingSet,
    #[error("expected {expected} features, got {found}")]
    FeatureCountMismatch { expected: usize, found: usize },
    #[error("{rows} training rows but {targets} targets")]
    TargetCountMismatch { rows: usize, targets: usize },
    #[error("target class {class} is out of range for {num_classes} classes")]
    UnknownClass { class: u32, num_classes: usize },
    #[error("invalid forest configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("malformed forest: {0}")]
    MalformedForest(&'static str),
}
