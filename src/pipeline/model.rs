//! Per-grade-boundary logistic classifier training
//!
//! Rows with incomplete history for the requested horizon are dropped, the
//! remainder is split 80/20 with a fixed seed, features are standardized
//! with training-partition statistics, and an L2-regularized logistic
//! classifier is fit by batch gradient descent. The whole path is
//! deterministic: repeated runs on the same table produce bit-identical
//! held-out predictions.
//!
//! Sign convention: a positive coefficient pushes the prediction toward TVL
//! (the label coded 1); a negative one toward Academic.

use std::collections::BTreeMap;

use faer::Mat;
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use super::error::PipelineError;
use super::schema::{
    self, GradeBoundary, Track, GENDER_COLUMN, SPLIT_SEED, TEST_FRACTION,
};

/// L2 penalty strength (the inverse of scikit-learn's default C = 1.0).
const L2_LAMBDA: f64 = 1.0;

/// Gradient max-norm below which the fit is considered converged.
const CONVERGENCE_TOL: f64 = 1e-6;

/// Floor for the iteration cap; larger tables get rows / 2.
const MIN_ITERATIONS: usize = 1000;

/// A single feature's signed weight.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureCoefficient {
    pub feature: String,
    /// Positive pushes toward TVL, negative toward Academic.
    pub coefficient: f64,
}

/// Prediction counts and percentages over the held-out partition.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionSummary {
    pub counts: BTreeMap<String, usize>,
    pub percentages: BTreeMap<String, f64>,
    pub total: usize,
}

/// A fitted classifier for one grade boundary, owning its held-out
/// partition. Created fresh on every training invocation; never persisted.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub boundary: GradeBoundary,
    pub features: Vec<String>,
    pub balanced: bool,
    /// Signed weights aligned with `features`, in standardized feature space.
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Sorted gender classes backing the integer codes, when gender is a
    /// feature.
    pub gender_classes: Option<Vec<String>>,
    /// Held-out rows in the original (unstandardized) feature space.
    pub x_test: Vec<Vec<f64>>,
    pub y_test: Vec<Track>,
    pub y_pred: Vec<Track>,
    /// P(track = TVL) per held-out row.
    pub y_prob: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

impl TrainedModel {
    /// Prediction frequency per label over the held-out partition.
    pub fn prediction_summary(&self) -> PredictionSummary {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for track in Track::ALL {
            counts.insert(track.as_str().to_string(), 0);
        }
        for pred in &self.y_pred {
            *counts.get_mut(pred.as_str()).expect("all tracks present") += 1;
        }

        let total = self.y_pred.len();
        let percentages = counts
            .iter()
            .map(|(label, count)| {
                let pct = if total == 0 {
                    0.0
                } else {
                    *count as f64 / total as f64 * 100.0
                };
                (label.clone(), pct)
            })
            .collect();

        PredictionSummary {
            counts,
            percentages,
            total,
        }
    }

    /// Coefficients paired with their feature names.
    pub fn coefficient_table(&self) -> Vec<FeatureCoefficient> {
        self.features
            .iter()
            .zip(self.coefficients.iter())
            .map(|(feature, coefficient)| FeatureCoefficient {
                feature: feature.clone(),
                coefficient: *coefficient,
            })
            .collect()
    }

    /// Held-out values of one feature, in original units.
    pub fn feature_column(&self, feature: &str) -> Option<Vec<f64>> {
        let idx = self.features.iter().position(|f| f == feature)?;
        Some(self.x_test.iter().map(|row| row[idx]).collect())
    }
}

/// Train a logistic classifier for one grade boundary on the given features.
///
/// With `balance` set, classes are reweighted as n/(2·n_class) in the loss so
/// the minority track is not drowned by the majority track; reweighting
/// keeps the run deterministic without a second RNG stream.
pub fn train_model(
    df: &DataFrame,
    features: &[String],
    target: &str,
    boundary: GradeBoundary,
    balance: bool,
) -> Result<TrainedModel, PipelineError> {
    if features.is_empty() {
        return Err(PipelineError::NoFeatures { boundary });
    }

    // Pull the feature columns, label-encoding the categorical demographic.
    let mut columns: Vec<Vec<Option<f64>>> = Vec::with_capacity(features.len());
    let mut gender_classes = None;
    for feature in features {
        let col = df.column(feature)?;
        if feature == GENDER_COLUMN {
            let (codes, classes) = schema::encode_categorical(col)?;
            gender_classes = Some(classes);
            columns.push(codes);
        } else {
            columns.push(schema::column_to_f64(col)?);
        }
    }
    let tracks = schema::encode_tracks(df.column(target)?)?;

    // Students with incomplete history for this horizon are excluded entirely.
    let mut rows: Vec<Vec<f64>> = Vec::new();
    let mut labels: Vec<Track> = Vec::new();
    for i in 0..df.height() {
        let track = match tracks[i] {
            Some(t) => t,
            None => continue,
        };
        let row: Option<Vec<f64>> = columns.iter().map(|c| c[i]).collect();
        if let Some(row) = row {
            rows.push(row);
            labels.push(track);
        }
    }

    let n = rows.len();
    if n < 2 {
        return Err(PipelineError::InsufficientData {
            boundary,
            reason: format!("only {} complete row(s) after filtering", n),
        });
    }

    // Deterministic 80/20 split: seeded shuffle, ceiling test size.
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(SPLIT_SEED);
    indices.shuffle(&mut rng);
    let test_len = ((n as f64) * TEST_FRACTION).ceil() as usize;
    let (test_idx, train_idx) = indices.split_at(test_len);

    check_class_counts(boundary, "training", train_idx, &labels)?;
    check_class_counts(boundary, "held-out", test_idx, &labels)?;

    let d = features.len();

    // Standardize with training-partition statistics only.
    let (means, stds) = train_statistics(train_idx, &rows, d);
    let x_train = standardized_matrix(train_idx, &rows, &means, &stds);
    let x_test = standardized_matrix(test_idx, &rows, &means, &stds);
    let y_train: Vec<f64> = train_idx.iter().map(|&i| labels[i].code()).collect();

    // Optional class reweighting; weights sum to the training row count
    // either way.
    let sample_weights: Vec<f64> = if balance {
        let pos = y_train.iter().filter(|&&y| y == 1.0).count() as f64;
        let neg = y_train.len() as f64 - pos;
        let total = y_train.len() as f64;
        y_train
            .iter()
            .map(|&y| if y == 1.0 { total / (2.0 * pos) } else { total / (2.0 * neg) })
            .collect()
    } else {
        vec![1.0; y_train.len()]
    };

    let max_iterations = MIN_ITERATIONS.max(n / 2);
    let fit = fit_logistic(&x_train, &y_train, &sample_weights, max_iterations);

    // Predict the held-out partition.
    let n_test = test_idx.len();
    let z = x_test.as_ref() * &fit.weights;
    let mut y_prob = Vec::with_capacity(n_test);
    let mut y_pred = Vec::with_capacity(n_test);
    for i in 0..n_test {
        let p = sigmoid(z[(i, 0)] + fit.intercept);
        y_prob.push(p);
        y_pred.push(if p >= 0.5 { Track::Tvl } else { Track::Academic });
    }

    let coefficients: Vec<f64> = (0..d).map(|j| fit.weights[(j, 0)]).collect();
    let x_test_raw: Vec<Vec<f64>> = test_idx.iter().map(|&i| rows[i].clone()).collect();
    let y_test: Vec<Track> = test_idx.iter().map(|&i| labels[i]).collect();

    Ok(TrainedModel {
        boundary,
        features: features.to_vec(),
        balanced: balance,
        coefficients,
        intercept: fit.intercept,
        gender_classes,
        x_test: x_test_raw,
        y_test,
        y_pred,
        y_prob,
        iterations: fit.iterations,
        converged: fit.converged,
    })
}

struct LogisticFit {
    weights: Mat<f64>,
    intercept: f64,
    iterations: usize,
    converged: bool,
}

/// Batch gradient descent on the weighted, L2-regularized logistic loss.
/// The intercept is unpenalized. Step size is 1/L for a bound L on the loss
/// curvature over standardized features, so the descent is monotone.
fn fit_logistic(
    x: &Mat<f64>,
    y: &[f64],
    sample_weights: &[f64],
    max_iterations: usize,
) -> LogisticFit {
    let n = x.nrows();
    let d = x.ncols();
    let n_f = n as f64;
    let step = 1.0 / (0.25 * (d as f64 + 1.0) + L2_LAMBDA);

    let mut weights = Mat::<f64>::zeros(d, 1);
    let mut intercept = 0.0;
    let mut converged = false;
    let mut iterations = 0;

    for _ in 0..max_iterations {
        iterations += 1;

        let z = x.as_ref() * &weights;
        let mut residual = Mat::<f64>::zeros(n, 1);
        let mut grad_intercept = 0.0;
        for i in 0..n {
            let p = sigmoid(z[(i, 0)] + intercept);
            let r = sample_weights[i] * (p - y[i]) / n_f;
            residual[(i, 0)] = r;
            grad_intercept += r;
        }

        let mut gradient = x.transpose() * &residual;
        let mut max_grad = grad_intercept.abs();
        for j in 0..d {
            gradient[(j, 0)] += L2_LAMBDA / n_f * weights[(j, 0)];
            max_grad = max_grad.max(gradient[(j, 0)].abs());
        }

        if max_grad < CONVERGENCE_TOL {
            converged = true;
            break;
        }

        for j in 0..d {
            weights[(j, 0)] -= step * gradient[(j, 0)];
        }
        intercept -= step * grad_intercept;
    }

    LogisticFit {
        weights,
        intercept,
        iterations,
        converged,
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Per-feature mean and standard deviation over the training rows. Constant
/// features keep a divisor of 1 so they standardize to zero.
fn train_statistics(train_idx: &[usize], rows: &[Vec<f64>], d: usize) -> (Vec<f64>, Vec<f64>) {
    let n = train_idx.len() as f64;
    let mut means = vec![0.0; d];
    for &i in train_idx {
        for j in 0..d {
            means[j] += rows[i][j];
        }
    }
    for mean in means.iter_mut() {
        *mean /= n;
    }

    let mut stds = vec![0.0; d];
    for &i in train_idx {
        for j in 0..d {
            stds[j] += (rows[i][j] - means[j]).powi(2);
        }
    }
    for std in stds.iter_mut() {
        *std = (*std / n).sqrt();
        if *std == 0.0 {
            *std = 1.0;
        }
    }

    (means, stds)
}

fn standardized_matrix(
    idx: &[usize],
    rows: &[Vec<f64>],
    means: &[f64],
    stds: &[f64],
) -> Mat<f64> {
    let d = means.len();
    let mut m = Mat::<f64>::zeros(idx.len(), d);
    for (r, &i) in idx.iter().enumerate() {
        for j in 0..d {
            m[(r, j)] = (rows[i][j] - means[j]) / stds[j];
        }
    }
    m
}

/// Both partitions need at least two examples of each class.
fn check_class_counts(
    boundary: GradeBoundary,
    partition: &str,
    idx: &[usize],
    labels: &[Track],
) -> Result<(), PipelineError> {
    for track in Track::ALL {
        let count = idx.iter().filter(|&&i| labels[i] == track).count();
        if count < 2 {
            return Err(PipelineError::InsufficientData {
                boundary,
                reason: format!(
                    "{} partition has {} example(s) of class {}",
                    partition, count, track
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_bounds() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(40.0) > 0.999_999);
        assert!(sigmoid(-40.0) < 1e-6);
    }

    #[test]
    fn test_train_statistics_constant_feature() {
        let rows = vec![vec![5.0, 1.0], vec![5.0, 3.0], vec![5.0, 5.0]];
        let idx = [0, 1, 2];
        let (means, stds) = train_statistics(&idx, &rows, 2);
        assert_eq!(means[0], 5.0);
        assert_eq!(stds[0], 1.0); // constant column: divisor floored at 1
        assert!(stds[1] > 0.0);
    }

    #[test]
    fn test_fit_learns_a_separating_direction() {
        // y = 1 iff x > 0; the single weight must come out positive.
        let n = 40;
        let mut x = Mat::<f64>::zeros(n, 1);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let v = if i % 2 == 0 { 1.0 } else { -1.0 };
            x[(i, 0)] = v;
            y.push(if v > 0.0 { 1.0 } else { 0.0 });
        }
        let weights = vec![1.0; n];

        let fit = fit_logistic(&x, &y, &weights, 2000);
        assert!(fit.weights[(0, 0)] > 0.5, "weight = {}", fit.weights[(0, 0)]);
    }
}
