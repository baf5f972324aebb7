use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Held-out evaluation of a classifier.
///
/// Classes that neither occur in the truth nor get predicted are left out,
/// and undefined ratios (no predictions, no support) count as 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub classes: BTreeMap<String, ClassMetrics>,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    /// `truth` and `predicted` hold indices into `classes` and have the same
    /// length
    pub(crate) fn new(truth: &[u32], predicted: &[u32], classes: &[String]) -> Self {
        assert_eq!(truth.len(), predicted.len());

        let mut per_class = BTreeMap::new();
        for (class, label) in classes.iter().enumerate() {
            let class = class as u32;
            let support = truth.iter().filter(|&&t| t == class).count();
            let predicted_count = predicted.iter().filter(|&&p| p == class).count();
            if support == 0 && predicted_count == 0 {
                continue;
            }

            let true_positives = truth
                .iter()
                .zip(predicted)
                .filter(|&(&t, &p)| t == class && p == class)
                .count();

            let precision = ratio(true_positives, predicted_count);
            let recall = ratio(true_positives, support);
            per_class.insert(
                label.clone(),
                ClassMetrics {
                    precision,
                    recall,
                    f1_score: f1(precision, recall),
                    support,
                },
            );
        }

        let total = truth.len();
        let n = per_class.len().max(1) as f64;
        let macro_avg = ClassMetrics {
            precision: per_class.values().map(|m| m.precision).sum::<f64>() / n,
            recall: per_class.values().map(|m| m.recall).sum::<f64>() / n,
            f1_score: per_class.values().map(|m| m.f1_score).sum::<f64>() / n,
            support: total,
        };

        let weight = |f: fn(&ClassMetrics) -> f64| {
            if total == 0 {
                return 0.0;
            }
            per_class
                .values()
                .map(|m| f(m) * m.support as f64)
                .sum::<f64>()
                / total as f64
        };
        let weighted_avg = ClassMetrics {
            precision: weight(|m| m.precision),
            recall: weight(|m| m.recall),
            f1_score: weight(|m| m.f1_score),
            support: total,
        };

        Self {
            accuracy: accuracy(truth, predicted),
            classes: per_class,
            macro_avg,
            weighted_avg,
        }
    }
}

pub fn accuracy(truth: &[u32], predicted: &[u32]) -> f64 {
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    ratio(correct, truth.len())
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .keys()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max("weighted avg".len());

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}\n",
            "", "precision", "recall", "f1-score", "support"
        )?;

        let row = |f: &mut fmt::Formatter<'_>, label: &str, m: &ClassMetrics| {
            writeln!(
                f,
                "{label:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.precision, m.recall, m.f1_score, m.support
            )
        };

        for (label, metrics) in &self.classes {
            row(f, label, metrics)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        row(f, "macro avg", &self.macro_avg)?;
        row(f, "weighted avg", &self.weighted_avg)
    }
}
