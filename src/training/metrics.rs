//! Classification metrics for trained models.
//!
//! ## Metrics Overview
//!
//! | Metric    | What it measures                                   | Range   |
//! |-----------|----------------------------------------------------|---------|
//! | precision | Fraction of predicted positives that are correct   | 0.0-1.0 |
//! | recall    | Fraction of true positives that were found         | 0.0-1.0 |
//! | f1-score  | Harmonic mean of precision and recall              | 0.0-1.0 |
//! | support   | Number of true samples                             | count   |
//! | accuracy  | Fraction of exact label matches                    | 0.0-1.0 |
//!
//! Per-class scores are averaged weighted by each class's true support.
//! A ratio with a zero denominator scores 0.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// Scores for a single class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
    pub support: usize,
}

/// Weighted-average metrics over all classes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
    pub support: usize,
    pub accuracy: f64,
}

impl ClassificationMetrics {
    /// Flat `name -> value` view, as recorded on a training run.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("precision".to_string(), self.precision),
            ("recall".to_string(), self.recall),
            ("f1-score".to_string(), self.f1_score),
            ("support".to_string(), self.support as f64),
            ("accuracy".to_string(), self.accuracy),
        ])
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "precision" => Some(self.precision),
            "recall" => Some(self.recall),
            "f1-score" | "f1_score" | "f1" => Some(self.f1_score),
            "support" => Some(self.support as f64),
            "accuracy" => Some(self.accuracy),
            _ => None,
        }
    }
}

/// Per-class report, keyed by label in sorted order.
pub fn classification_report<S: AsRef<str>>(
    y_true: &[S],
    y_pred: &[S],
) -> Result<BTreeMap<String, ClassReport>> {
    ensure!(
        y_true.len() == y_pred.len(),
        "label length mismatch: {} true vs {} predicted",
        y_true.len(),
        y_pred.len()
    );

    let labels: BTreeSet<&str> = y_true
        .iter()
        .chain(y_pred.iter())
        .map(|label| label.as_ref())
        .collect();

    let mut report = BTreeMap::new();
    for label in labels {
        let mut tp = 0usize;
        let mut predicted = 0usize;
        let mut actual = 0usize;
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            let (t, p) = (t.as_ref() == label, p.as_ref() == label);
            tp += usize::from(t && p);
            predicted += usize::from(p);
            actual += usize::from(t);
        }

        let precision = ratio(tp, predicted);
        let recall = ratio(tp, actual);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        report.insert(
            label.to_string(),
            ClassReport {
                precision,
                recall,
                f1_score,
                support: actual,
            },
        );
    }
    Ok(report)
}

/// Weighted precision, recall and f1 plus accuracy.
pub fn eval_classification_metrics<S: AsRef<str>>(
    y_true: &[S],
    y_pred: &[S],
) -> Result<ClassificationMetrics> {
    ensure!(!y_true.is_empty(), "cannot evaluate metrics on zero samples");
    let report = classification_report(y_true, y_pred)?;

    let total = y_true.len();
    let weighted = |score: &dyn Fn(&ClassReport) -> f64| -> f64 {
        report
            .values()
            .map(|class| score(class) * class.support as f64)
            .sum::<f64>()
            / total as f64
    };

    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t.as_ref() == p.as_ref())
        .count();

    Ok(ClassificationMetrics {
        precision: weighted(&|c: &ClassReport| c.precision),
        recall: weighted(&|c: &ClassReport| c.recall),
        f1_score: weighted(&|c: &ClassReport| c.f1_score),
        support: total,
        accuracy: ratio(correct, total),
    })
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_perfect_predictions() {
        let y = ["a", "b", "a", "c"];
        let metrics = eval_classification_metrics(&y, &y).unwrap();
        assert_eq!(metrics.precision, 1.0);
        assert_eq!(metrics.recall, 1.0);
        assert_eq!(metrics.f1_score, 1.0);
        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(metrics.support, 4);
    }

    #[test]
    fn test_weighted_average() {
        let y_true = ["0", "0", "0", "1"];
        let y_pred = ["0", "0", "1", "1"];
        let report = classification_report(&y_true, &y_pred).unwrap();

        assert!(approx(report["0"].precision, 1.0));
        assert!(approx(report["0"].recall, 2.0 / 3.0));
        assert!(approx(report["1"].precision, 0.5));
        assert!(approx(report["1"].recall, 1.0));

        let metrics = eval_classification_metrics(&y_true, &y_pred).unwrap();
        // (1.0 * 3 + 0.5 * 1) / 4
        assert!(approx(metrics.precision, 0.875));
        assert!(approx(metrics.recall, 0.75));
        assert!(approx(metrics.accuracy, 0.75));
    }

    #[test]
    fn test_zero_division_scores_zero() {
        // "b" is never predicted; "c" never occurs
        let y_true = ["a", "b"];
        let y_pred = ["a", "c"];
        let report = classification_report(&y_true, &y_pred).unwrap();
        assert_eq!(report["b"].precision, 0.0);
        assert_eq!(report["c"].recall, 0.0);
        assert_eq!(report["c"].support, 0);
        assert_eq!(report["c"].f1_score, 0.0);
    }

    #[test]
    fn test_length_mismatch_errors() {
        assert!(eval_classification_metrics(&["a"], &["a", "b"]).is_err());
        let empty: [&str; 0] = [];
        assert!(eval_classification_metrics(&empty, &empty).is_err());
    }

    #[test]
    fn test_map_uses_report_names() {
        let metrics = eval_classification_metrics(&["x", "y"], &["x", "x"]).unwrap();
        let map = metrics.to_map();
        assert!(map.contains_key("f1-score"));
        assert_eq!(map["support"], 2.0);
        assert_eq!(metrics.get("f1"), Some(metrics.f1_score));
        assert_eq!(metrics.get("auc"), None);

        let json = serde_json::to_value(&metrics).unwrap();
        assert!(json.get("f1-score").is_some());
    }
}
