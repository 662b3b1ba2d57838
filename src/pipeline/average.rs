//! Average-grade model variant
//!
//! Instead of the screened per-grade columns, this entry point trains on one
//! cumulative average per subject over grades 7..=g (`avg_math_g9` is the
//! mean of `g7_math`, `g8_math`, `g9_math`). Useful as a coarser, always-
//! available baseline when individual grade columns are sparse.

use polars::prelude::*;

use super::error::PipelineError;
use super::model::{train_model, TrainedModel};
use super::schema::{self, GradeBoundary, Track, SUBJECTS};

/// Outcome of the average-grade variant for one boundary.
#[derive(Debug, Clone)]
pub struct AverageModelOutcome {
    pub features: Vec<String>,
    pub model: TrainedModel,
    /// The track predicted for the majority of held-out students. Ties
    /// resolve to Academic (code order).
    pub majority_track: Track,
}

/// Build the per-subject cumulative-average columns for one boundary.
///
/// Returns a frame holding the average columns plus the target, and the
/// average column names in subject order. Subjects with no grade columns in
/// the table are skipped; rows average over their non-null values only.
pub fn average_feature_frame(
    df: &DataFrame,
    target: &str,
    boundary: GradeBoundary,
) -> Result<(DataFrame, Vec<String>), PipelineError> {
    let height = df.height();
    let mut columns: Vec<Column> = Vec::new();
    let mut avg_names: Vec<String> = Vec::new();

    for subject in SUBJECTS {
        let mut subject_columns: Vec<Vec<Option<f64>>> = Vec::new();
        for level in boundary.levels() {
            let name = format!("{}{}", schema::grade_prefix(level), subject);
            if df.get_column_names().iter().any(|c| c.as_str() == name) {
                subject_columns.push(schema::column_to_f64(df.column(&name)?)?);
            }
        }
        if subject_columns.is_empty() {
            continue;
        }

        let mut averages: Vec<Option<f64>> = Vec::with_capacity(height);
        for i in 0..height {
            let values: Vec<f64> = subject_columns.iter().filter_map(|c| c[i]).collect();
            if values.is_empty() {
                averages.push(None);
            } else {
                averages.push(Some(values.iter().sum::<f64>() / values.len() as f64));
            }
        }

        let avg_name = format!("avg_{}_g{}", subject, boundary.level());
        columns.push(Column::new(avg_name.clone().into(), averages));
        avg_names.push(avg_name);
    }

    if avg_names.is_empty() {
        return Err(PipelineError::NoFeatures { boundary });
    }

    columns.push(df.column(target)?.clone());
    let frame = DataFrame::new(columns)?;

    Ok((frame, avg_names))
}

/// Train the average-grade variant for one boundary through the standard
/// trainer, so split, standardization, and fit semantics stay identical.
pub fn train_average_model(
    df: &DataFrame,
    target: &str,
    boundary: GradeBoundary,
    balance: bool,
) -> Result<AverageModelOutcome, PipelineError> {
    let (frame, features) = average_feature_frame(df, target, boundary)?;
    let model = train_model(&frame, &features, target, boundary, balance)?;

    let summary = model.prediction_summary();
    let mut majority_track = Track::Academic;
    let mut best = 0usize;
    for track in Track::ALL {
        let count = summary.counts.get(track.as_str()).copied().unwrap_or(0);
        if count > best {
            best = count;
            majority_track = track;
        }
    }

    Ok(AverageModelOutcome {
        features,
        model,
        majority_track,
    })
}
