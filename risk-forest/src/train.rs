//! Seeded random forest training.
//!
//! Trees are grown with the CART algorithm on Gini impurity, each on a
//! bootstrap sample of the training rows and trying a random subset of the
//! features at every split. All randomness comes from a single generator
//! seeded from [`ForestConfig::seed`], so the same data and configuration
//! always produce the same forest.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Error;
use crate::forest::{Branch, Forest, Leaf, Node};

/// How many features are tried when looking for the best split of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    All,
    Sqrt,
    Count(usize),
}

impl MaxFeatures {
    fn resolve(self, num_features: usize) -> usize {
        let count = match self {
            MaxFeatures::All => num_features,
            MaxFeatures::Sqrt => (num_features as f64).sqrt() as usize,
            MaxFeatures::Count(count) => count,
        };
        count.clamp(1, num_features.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub num_trees: usize,
    /// `None` grows every tree until its leaves are pure
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            num_trees: 200,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestConfig {
    fn check(&self) -> Result<(), Error> {
        if self.num_trees == 0 {
            return Err(Error::InvalidConfig("num_trees must be at least 1"));
        }
        if self.min_samples_leaf == 0 {
            return Err(Error::InvalidConfig("min_samples_leaf must be at least 1"));
        }
        if self.min_samples_split < 2 {
            return Err(Error::InvalidConfig("min_samples_split must be at least 2"));
        }
        Ok(())
    }
}

impl Forest {
    /// Fit a forest on an encoded feature matrix.
    ///
    /// `targets[i]` is the index into `classes` of row `i`'s label.
    pub fn fit(
        features: &[Vec<f32>],
        targets: &[u32],
        classes: Vec<String>,
        config: &ForestConfig,
    ) -> Result<Self, Error> {
        config.check()?;

        if features.is_empty() {
            return Err(Error::EmptyTrainingSet);
        }
        if features.len() != targets.len() {
            return Err(Error::TargetCountMismatch {
                rows: features.len(),
                targets: targets.len(),
            });
        }

        let num_features = features[0].len();
        if let Some(row) = features.iter().find(|r| r.len() != num_features) {
            return Err(Error::FeatureCountMismatch {
                expected: num_features,
                found: row.len(),
            });
        }
        if let Some(&class) = targets.iter().find(|&&t| t as usize >= classes.len()) {
            return Err(Error::UnknownClass {
                class,
                num_classes: classes.len(),
            });
        }

        let builder = TreeBuilder {
            features,
            targets,
            num_features,
            num_classes: classes.len(),
            config,
        };

        let mut rng = StdRng::seed_from_u64(config.seed);
        let num_rows = features.len();

        let mut trees = Vec::with_capacity(config.num_trees);
        for tree_idx in 0..config.num_trees {
            let samples: Vec<usize> = if config.bootstrap {
                (0..num_rows).map(|_| rng.gen_range(0..num_rows)).collect()
            } else {
                (0..num_rows).collect()
            };

            let nodes = builder.build(&samples, &mut rng);
            debug!(tree = tree_idx, nodes = nodes.len(), "grew tree");
            trees.push(nodes);
        }

        Forest::from_trees(trees, num_features, classes)
    }
}

struct Split {
    feature: usize,
    threshold: f32,
    impurity: f64,
}

struct TreeBuilder<'a> {
    features: &'a [Vec<f32>],
    targets: &'a [u32],
    num_features: usize,
    num_classes: usize,
    config: &'a ForestConfig,
}

impl TreeBuilder<'_> {
    /// Grow one tree. The root ends up at index 0 and child pointers index
    /// into the returned vec.
    fn build(&self, samples: &[usize], rng: &mut StdRng) -> Vec<Node> {
        let mut nodes = Vec::new();
        self.build_node(samples, 0, &mut nodes, rng);
        nodes
    }

    fn build_node(
        &self,
        samples: &[usize],
        depth: usize,
        nodes: &mut Vec<Node>,
        rng: &mut StdRng,
    ) -> u32 {
        let current_idx = nodes.len() as u32;

        let counts = self.class_counts(samples);
        let leaf = Node::Leaf(Leaf {
            prediction: majority(&counts),
        });

        let at_max_depth = self.config.max_depth.is_some_and(|max| depth >= max);
        let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        if at_max_depth || is_pure || samples.len() < self.config.min_samples_split {
            nodes.push(leaf);
            return current_idx;
        }

        let Some(split) = self.find_best_split(samples, &counts, rng) else {
            nodes.push(leaf);
            return current_idx;
        };

        let (left, right) = self.split_samples(samples, split.feature, split.threshold);

        // Reserve space for the current node, pointers are filled in below
        nodes.push(Node::Branch(Branch {
            split_with: split.feature as u32,
            split_at: split.threshold,
            left: 0,
            right: 0,
        }));

        let left_idx = self.build_node(&left, depth + 1, nodes, rng);
        let right_idx = self.build_node(&right, depth + 1, nodes, rng);

        if let Node::Branch(branch) = &mut nodes[current_idx as usize] {
            branch.left = left_idx;
            branch.right = right_idx;
        }

        current_idx
    }

    fn class_counts(&self, samples: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.num_classes];
        for &idx in samples {
            counts[self.targets[idx] as usize] += 1;
        }
        counts
    }

    /// Draw the features to try for one node, without replacement
    fn candidate_features(&self, rng: &mut StdRng) -> Vec<usize> {
        let count = self.config.max_features.resolve(self.num_features);
        let mut features: Vec<usize> = (0..self.num_features).collect();
        for i in 0..count {
            let j = rng.gen_range(i..features.len());
            features.swap(i, j);
        }
        features.truncate(count);
        features
    }

    /// Exhaustive search over the midpoints between consecutive distinct
    /// values of each candidate feature. Missing values always go right.
    fn find_best_split(
        &self,
        samples: &[usize],
        parent_counts: &[usize],
        rng: &mut StdRng,
    ) -> Option<Split> {
        let total = samples.len();
        let parent_impurity = gini(parent_counts, total);
        let min_leaf = self.config.min_samples_leaf;

        let mut best: Option<Split> = None;

        for feature in self.candidate_features(rng) {
            let mut present: Vec<(f32, u32)> = samples
                .iter()
                .map(|&idx| (self.features[idx][feature], self.targets[idx]))
                .filter(|(value, _)| !value.is_nan())
                .collect();
            if present.len() < 2 {
                continue;
            }
            present.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_counts = vec![0; self.num_classes];
            let mut right_counts = parent_counts.to_vec();

            for k in 0..present.len() - 1 {
                let (value, class) = present[k];
                left_counts[class as usize] += 1;
                right_counts[class as usize] -= 1;

                let next = present[k + 1].0;
                if value == next {
                    continue;
                }

                let n_left = k + 1;
                let n_right = total - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let impurity = (n_left as f64 * gini(&left_counts, n_left)
                    + n_right as f64 * gini(&right_counts, n_right))
                    / total as f64;

                if impurity + 1e-12 < parent_impurity
                    && best.as_ref().is_none_or(|b| impurity < b.impurity)
                {
                    best = Some(Split {
                        feature,
                        threshold: midpoint(value, next),
                        impurity,
                    });
                }
            }
        }

        best
    }

    fn split_samples(
        &self,
        samples: &[usize],
        feature: usize,
        threshold: f32,
    ) -> (Vec<usize>, Vec<usize>) {
        samples
            .iter()
            .copied()
            .partition(|&idx| self.features[idx][feature] <= threshold)
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

fn majority(counts: &[usize]) -> u32 {
    let mut best = 0;
    for (class, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = class;
        }
    }
    best as u32
}

/// Split point between two consecutive sorted values. Falls back to the lower
/// value when f32 rounding would put the midpoint onto the upper one.
fn midpoint(low: f32, high: f32) -> f32 {
    let mid = low + (high - low) / 2.0;
    if mid >= high { low } else { mid }
}
