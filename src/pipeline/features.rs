//! Cumulative feature assembly across grade levels
//!
//! For a target grade boundary g the assembler folds grade levels 7..=g,
//! keeping the significant predictors that carry each level's prefix, then
//! appends the demographic predictors exactly once each. The fold is a pure
//! data transformation; score tables are cached in an explicit caller-owned
//! map instead of mutable instance state.

use std::collections::{BTreeMap, HashSet};

use polars::prelude::*;

use super::error::PipelineError;
use super::schema::{self, GradeBoundary, AGE_COLUMN, GENDER_COLUMN};
use super::significance::{score_grade_level, ScoreTable};

/// Caller-owned cache of score tables keyed by grade level. Reusing one
/// cache across boundaries means each level is screened once per run.
pub type ScoreCache = BTreeMap<u8, ScoreTable>;

/// Assemble the ordered predictor list for one grade boundary.
///
/// Grade-prefixed predictors appear in increasing grade order, each one only
/// if flagged significant for its own level. `age` and `gender` are appended
/// once each when present in the table, regardless of their significance —
/// inclusion policy and significance reporting are separate concerns.
pub fn assemble_features(
    df: &DataFrame,
    target: &str,
    boundary: GradeBoundary,
    cache: &mut ScoreCache,
) -> Result<Vec<String>, PipelineError> {
    let mut assembled: Vec<String> = Vec::new();

    for level in boundary.levels() {
        if !cache.contains_key(&level) {
            let table = score_grade_level(df, target, level)?;
            cache.insert(level, table);
        }
        let table = cache.get(&level).expect("score table cached above");

        let prefix = schema::grade_prefix(level);
        for score in &table.scores {
            if score.significant && score.feature.starts_with(&prefix) {
                assembled.push(score.feature.clone());
            }
        }
    }

    for demo in [AGE_COLUMN, GENDER_COLUMN] {
        if df.get_column_names().iter().any(|c| c.as_str() == demo) {
            assembled.push(demo.to_string());
        }
    }

    // First-seen order wins. A grade-prefixed predictor can only appear
    // under its own level, so this mainly guards demographic double-insertion.
    let mut seen = HashSet::new();
    assembled.retain(|f| seen.insert(f.clone()));

    Ok(assembled)
}
