//! Descriptive statistics over a model's held-out predictions
//!
//! Presentation-facing summaries: per-subject grade statistics grouped by
//! predicted track, and the gender distribution per predicted track. Data
//! only; rendering lives in the report module.

use std::collections::BTreeMap;

use serde::Serialize;

use super::model::TrainedModel;
use super::schema::{Track, AGE_COLUMN, GENDER_COLUMN};

/// Min/max/mean/median/count of one subject feature for one predicted track.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectStat {
    pub feature: String,
    pub track: Track,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub count: usize,
}

/// Grade statistics for every subject feature (demographics excluded),
/// grouped by predicted track. Empty groups are skipped.
pub fn subject_statistics(model: &TrainedModel) -> Vec<SubjectStat> {
    let mut stats = Vec::new();

    for feature in &model.features {
        if feature == AGE_COLUMN || feature == GENDER_COLUMN {
            continue;
        }
        let values = match model.feature_column(feature) {
            Some(v) => v,
            None => continue,
        };

        for track in Track::ALL {
            let group: Vec<f64> = values
                .iter()
                .zip(model.y_pred.iter())
                .filter(|(_, pred)| **pred == track)
                .map(|(v, _)| *v)
                .collect();
            if group.is_empty() {
                continue;
            }

            let min = group.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = group.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let mean = group.iter().sum::<f64>() / group.len() as f64;

            stats.push(SubjectStat {
                feature: feature.clone(),
                track,
                min,
                max,
                mean,
                median: median(&group),
                count: group.len(),
            });
        }
    }

    stats
}

/// Gender counts per predicted track, decoded through the model's gender
/// classes. `None` when gender was not among the trained features.
pub fn gender_distribution(
    model: &TrainedModel,
) -> Option<BTreeMap<String, BTreeMap<String, usize>>> {
    let classes = model.gender_classes.as_ref()?;
    let codes = model.feature_column(GENDER_COLUMN)?;

    let mut distribution: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for (code, pred) in codes.iter().zip(model.y_pred.iter()) {
        let gender = classes
            .get(*code as usize)
            .cloned()
            .unwrap_or_else(|| format!("{}", code));
        let by_track = distribution.entry(gender).or_default();
        *by_track.entry(pred.as_str().to_string()).or_insert(0) += 1;
    }

    Some(distribution)
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
