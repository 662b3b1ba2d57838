//! Evaluation of held-out predictions
//!
//! TVL is the positive class, Academic the negative; the convention is a
//! constant of the crate, not an accident of label ordering. All functions
//! are pure: they never mutate the trained model and can be called
//! repeatedly on the same predictions.

use serde::Serialize;

use super::error::PipelineError;
use super::model::TrainedModel;
use super::schema::{GradeBoundary, Track};

/// Confusion matrix with explicit row/column labels. Rows are actual
/// classes, columns predicted classes, both in code order
/// [Academic, TVL].
#[derive(Debug, Clone, Serialize)]
pub struct ConfusionMatrix {
    pub actual_labels: Vec<String>,
    pub predicted_labels: Vec<String>,
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    fn build(y_true: &[Track], y_pred: &[Track]) -> ConfusionMatrix {
        let mut counts = vec![vec![0usize; 2]; 2];
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            counts[t.code() as usize][p.code() as usize] += 1;
        }

        ConfusionMatrix {
            actual_labels: Track::ALL
                .iter()
                .map(|t| format!("Actual: {}", t))
                .collect(),
            predicted_labels: Track::ALL
                .iter()
                .map(|t| format!("Predicted: {}", t))
                .collect(),
            counts,
        }
    }

    pub fn count(&self, actual: Track, predicted: Track) -> usize {
        self.counts[actual.code() as usize][predicted.code() as usize]
    }

    /// Actual class counts (row sums), in code order.
    pub fn row_totals(&self) -> Vec<usize> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    /// Predicted class counts (column sums), in code order.
    pub fn column_totals(&self) -> Vec<usize> {
        (0..self.counts[0].len())
            .map(|j| self.counts.iter().map(|row| row[j]).sum())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.row_totals().iter().sum()
    }
}

/// Precision/recall/F1/support for one report row.
#[derive(Debug, Clone, Serialize)]
pub struct ClassMetrics {
    pub class: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class report plus macro/weighted aggregates and overall accuracy.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub per_class: Vec<ClassMetrics>,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub accuracy: f64,
}

/// One point on the ROC curve, swept from the highest threshold down.
#[derive(Debug, Clone, Serialize)]
pub struct RocPoint {
    pub false_positive_rate: f64,
    pub true_positive_rate: f64,
    pub threshold: f64,
}

/// Read-only snapshot of a model's held-out performance.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub boundary: GradeBoundary,
    pub accuracy: f64,
    pub error_rate: f64,
    /// Positive-class (TVL) precision.
    pub precision: f64,
    /// Positive-class (TVL) recall.
    pub recall: f64,
    /// `None` when the held-out truth contains a single class — AUC is not
    /// applicable rather than an error.
    pub auc: Option<f64>,
    pub confusion: ConfusionMatrix,
    pub report: ClassificationReport,
    /// `None` exactly when `auc` is.
    pub roc_curve: Option<Vec<RocPoint>>,
}

/// Evaluate held-out predictions against the truth.
///
/// `y_true`, `y_pred`, and `y_prob` must be aligned with the model's
/// held-out partition; `y_prob` is the predicted probability of TVL.
pub fn evaluate(
    y_true: &[Track],
    y_pred: &[Track],
    y_prob: &[f64],
    model: &TrainedModel,
) -> Result<EvaluationResult, PipelineError> {
    debug_assert_eq!(y_true.len(), y_pred.len());
    debug_assert_eq!(y_true.len(), y_prob.len());

    let confusion = ConfusionMatrix::build(y_true, y_pred);
    let total = confusion.total();

    let tp = confusion.count(Track::Tvl, Track::Tvl);
    let fp = confusion.count(Track::Academic, Track::Tvl);
    let fn_ = confusion.count(Track::Tvl, Track::Academic);
    let tn = confusion.count(Track::Academic, Track::Academic);

    let accuracy = if total == 0 {
        0.0
    } else {
        (tp + tn) as f64 / total as f64
    };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);

    let report = classification_report(&confusion, accuracy);

    let roc = roc_points(y_true, y_prob);
    let (roc_curve, auc) = match roc {
        Some((points, auc)) => (Some(points), Some(auc)),
        None => (None, None),
    };

    Ok(EvaluationResult {
        boundary: model.boundary,
        accuracy,
        error_rate: 1.0 - accuracy,
        precision,
        recall,
        auc,
        confusion,
        report,
        roc_curve,
    })
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn classification_report(confusion: &ConfusionMatrix, accuracy: f64) -> ClassificationReport {
    let row_totals = confusion.row_totals();
    let col_totals = confusion.column_totals();
    let total: usize = row_totals.iter().sum();

    let per_class: Vec<ClassMetrics> = Track::ALL
        .iter()
        .map(|track| {
            let i = track.code() as usize;
            let tp = confusion.counts[i][i];
            let precision = ratio(tp, col_totals[i]);
            let recall = ratio(tp, row_totals[i]);
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            ClassMetrics {
                class: track.as_str().to_string(),
                precision,
                recall,
                f1,
                support: row_totals[i],
            }
        })
        .collect();

    let k = per_class.len() as f64;
    let macro_avg = ClassMetrics {
        class: "macro avg".to_string(),
        precision: per_class.iter().map(|c| c.precision).sum::<f64>() / k,
        recall: per_class.iter().map(|c| c.recall).sum::<f64>() / k,
        f1: per_class.iter().map(|c| c.f1).sum::<f64>() / k,
        support: total,
    };

    let weight = |f: fn(&ClassMetrics) -> f64| {
        if total == 0 {
            0.0
        } else {
            per_class
                .iter()
                .map(|c| f(c) * c.support as f64)
                .sum::<f64>()
                / total as f64
        }
    };
    let weighted_avg = ClassMetrics {
        class: "weighted avg".to_string(),
        precision: weight(|c| c.precision),
        recall: weight(|c| c.recall),
        f1: weight(|c| c.f1),
        support: total,
    };

    ClassificationReport {
        per_class,
        macro_avg,
        weighted_avg,
        accuracy,
    }
}

/// ROC sweep over the distinct probability thresholds, highest first, plus
/// trapezoidal AUC. Tied probabilities move as one group, so a constant
/// probability output yields the two endpoints and an AUC of exactly 0.5.
///
/// Returns `None` when the truth contains a single class.
fn roc_points(y_true: &[Track], y_prob: &[f64]) -> Option<(Vec<RocPoint>, f64)> {
    let pos = y_true.iter().filter(|t| **t == Track::Tvl).count();
    let neg = y_true.len() - pos;
    if pos == 0 || neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..y_true.len()).collect();
    order.sort_by(|&a, &b| {
        y_prob[b]
            .partial_cmp(&y_prob[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut points = vec![RocPoint {
        false_positive_rate: 0.0,
        true_positive_rate: 0.0,
        threshold: f64::INFINITY,
    }];

    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut i = 0;
    while i < order.len() {
        let threshold = y_prob[order[i]];
        while i < order.len() && y_prob[order[i]] == threshold {
            if y_true[order[i]] == Track::Tvl {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        points.push(RocPoint {
            false_positive_rate: fp as f64 / neg as f64,
            true_positive_rate: tp as f64 / pos as f64,
            threshold,
        });
    }

    let auc = points
        .windows(2)
        .map(|w| {
            (w[1].false_positive_rate - w[0].false_positive_rate)
                * (w[1].true_positive_rate + w[0].true_positive_rate)
                / 2.0
        })
        .sum();

    Some((points, auc))
}
