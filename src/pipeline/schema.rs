//! Student table schema: tracks, grade boundaries, and column conventions.
//!
//! Encodings that the rest of the pipeline relies on are fixed here as
//! explicit constants rather than inferred from label sort order: Academic is
//! coded 0, TVL is coded 1, and TVL is the positive class for
//! precision/recall.

use std::fmt;
use std::str::FromStr;

use polars::prelude::*;
use serde::Serialize;

use super::error::PipelineError;

/// Subject columns recorded per grade level, in table order.
pub const SUBJECTS: [&str; 8] = [
    "filipino", "english", "math", "science", "ap", "tle", "mapeh", "esp",
];

/// Grade levels covered by the junior high records.
pub const GRADE_LEVELS: [u8; 4] = [7, 8, 9, 10];

/// Default target column.
pub const TARGET_COLUMN: &str = "track";

/// Demographic predictor columns.
pub const AGE_COLUMN: &str = "age";
pub const GENDER_COLUMN: &str = "gender";

/// Fixed significance threshold for feature screening. A predictor is
/// significant iff its p-value is strictly below this value.
pub const SIGNIFICANCE_ALPHA: f64 = 0.05;

/// Seed for the train/test shuffle. Repeated runs on the same table must
/// produce the same split.
pub const SPLIT_SEED: u64 = 42;

/// Fraction of rows held out for evaluation (ceiling when fractional).
pub const TEST_FRACTION: f64 = 0.2;

/// Binary outcome label: the Senior High School track a student belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Track {
    Academic,
    #[serde(rename = "TVL")]
    Tvl,
}

impl Track {
    /// The positive class for precision/recall and the probability output.
    pub const POSITIVE: Track = Track::Tvl;

    /// Both tracks in code order (Academic = 0, TVL = 1).
    pub const ALL: [Track; 2] = [Track::Academic, Track::Tvl];

    pub fn as_str(&self) -> &'static str {
        match self {
            Track::Academic => "Academic",
            Track::Tvl => "TVL",
        }
    }

    /// Numeric code used by the classifier: Academic = 0.0, TVL = 1.0.
    pub fn code(&self) -> f64 {
        match self {
            Track::Academic => 0.0,
            Track::Tvl => 1.0,
        }
    }

    /// Parse a raw label. Anything outside the Academic/TVL pair is a
    /// `LabelMismatch`.
    pub fn from_label(label: &str) -> Result<Track, PipelineError> {
        match label {
            "Academic" => Ok(Track::Academic),
            "TVL" => Ok(Track::Tvl),
            other => Err(PipelineError::LabelMismatch {
                label: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The cumulative horizon of grade levels (7 through the wrapped level)
/// included in one training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GradeBoundary(u8);

impl GradeBoundary {
    /// Create a boundary for a final grade level in 7..=10.
    pub fn new(level: u8) -> Option<GradeBoundary> {
        if GRADE_LEVELS.contains(&level) {
            Some(GradeBoundary(level))
        } else {
            None
        }
    }

    /// All four boundaries in increasing order.
    pub fn all() -> Vec<GradeBoundary> {
        GRADE_LEVELS.iter().map(|&g| GradeBoundary(g)).collect()
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    /// Source grade levels folded into this boundary: 7..=level.
    pub fn levels(&self) -> impl Iterator<Item = u8> {
        7..=self.0
    }
}

impl fmt::Display for GradeBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G{}", self.0)
    }
}

impl FromStr for GradeBoundary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level: u8 = s
            .parse()
            .map_err(|_| format!("'{}' is not a valid grade level", s))?;
        GradeBoundary::new(level)
            .ok_or_else(|| format!("grade level must be one of 7, 8, 9, 10 (got {})", level))
    }
}

/// Column-name prefix for one grade level's subject columns.
pub fn grade_prefix(level: u8) -> String {
    format!("g{}_", level)
}

/// Candidate predictor columns for one grade level: every column carrying
/// that grade's prefix (in table order), then `age`, then `gender`, when
/// present. Columns absent from the table are silently excluded.
pub fn candidate_predictors(df: &DataFrame, level: u8) -> Vec<String> {
    let prefix = grade_prefix(level);
    let mut candidates: Vec<String> = df
        .get_column_names()
        .iter()
        .filter(|name| name.starts_with(&prefix))
        .map(|name| name.to_string())
        .collect();

    for demo in [AGE_COLUMN, GENDER_COLUMN] {
        if df.get_column_names().iter().any(|c| c.as_str() == demo) {
            candidates.push(demo.to_string());
        }
    }

    candidates
}

/// Decode the target column into typed tracks, preserving nulls.
pub fn encode_tracks(col: &Column) -> Result<Vec<Option<Track>>, PipelineError> {
    let labels = column_to_strings(col)?;
    labels
        .into_iter()
        .map(|opt| opt.as_deref().map(Track::from_label).transpose())
        .collect()
}

/// Cast a numeric column to f64 values, preserving nulls.
pub fn column_to_f64(col: &Column) -> Result<Vec<Option<f64>>, PipelineError> {
    let float_col = col.cast(&DataType::Float64)?;
    Ok(float_col.f64()?.into_iter().collect())
}

/// Label-encode a categorical column: distinct values sorted, codes assigned
/// in that order. Deterministic for a given table regardless of row order.
///
/// Returns the per-row codes (nulls preserved) and the sorted class list, so
/// codes can be decoded later.
pub fn encode_categorical(col: &Column) -> Result<(Vec<Option<f64>>, Vec<String>), PipelineError> {
    // Already-numeric columns are re-coded by sorted distinct value so codes
    // always index 0..classes.len().
    if col.dtype().is_primitive_numeric() {
        let raw = column_to_f64(col)?;
        let mut distinct: Vec<f64> = raw.iter().flatten().copied().collect();
        distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        distinct.dedup();

        let codes = raw
            .iter()
            .map(|opt| {
                opt.map(|v| {
                    distinct.iter().position(|d| *d == v).expect("value in class list") as f64
                })
            })
            .collect();
        let classes = distinct.iter().map(|d| format!("{}", d)).collect();
        return Ok((codes, classes));
    }

    let values = column_to_strings(col)?;
    let mut classes: Vec<String> = values.iter().flatten().cloned().collect();
    classes.sort();
    classes.dedup();

    let codes = values
        .iter()
        .map(|opt| {
            opt.as_ref().map(|v| {
                classes.iter().position(|c| c == v).expect("value in class list") as f64
            })
        })
        .collect();

    Ok((codes, classes))
}

/// Convert a column to per-row strings for label comparison.
fn column_to_strings(col: &Column) -> Result<Vec<Option<String>>, PipelineError> {
    let values: Vec<Option<String>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        _ => {
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect()
        }
    };
    Ok(values)
}
