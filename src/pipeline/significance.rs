//! Per-grade-level statistical feature screening
//!
//! Numeric predictors (subject grades, age) are standardized and scored with
//! a one-way ANOVA F-test against the binary track; the categorical
//! demographic (gender) is scored with a chi-square test of independence on
//! its contingency table. A predictor is significant iff its p-value falls
//! strictly below [`SIGNIFICANCE_ALPHA`].

use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor};

use super::error::PipelineError;
use super::schema::{
    self, GradeBoundary, Track, GENDER_COLUMN, SIGNIFICANCE_ALPHA,
};

/// Relevance score for one candidate predictor.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureScore {
    pub feature: String,
    /// One-way ANOVA F-statistic. `None` on the categorical (chi-square)
    /// path, where no F-statistic is defined.
    pub f_statistic: Option<f64>,
    pub p_value: f64,
    pub significant: bool,
}

/// Ordered score table for one grade level. Order follows the candidate
/// column order in the source table, so p-value ties never reorder.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreTable {
    pub grade_level: u8,
    pub scores: Vec<FeatureScore>,
}

impl ScoreTable {
    /// Names of predictors flagged significant, in table order.
    pub fn significant_features(&self) -> Vec<String> {
        self.scores
            .iter()
            .filter(|s| s.significant)
            .map(|s| s.feature.clone())
            .collect()
    }

    pub fn get(&self, feature: &str) -> Option<&FeatureScore> {
        self.scores.iter().find(|s| s.feature == feature)
    }
}

/// Strictly-less significance test: p = 0.05 itself is NOT significant.
pub fn is_significant(p_value: f64) -> bool {
    p_value < SIGNIFICANCE_ALPHA
}

/// Score every candidate predictor for one grade level against the target.
///
/// Candidate columns absent from the table are silently excluded; a grade
/// level with zero numeric candidates is an error so nothing downstream
/// trains on no features.
pub fn score_grade_level(
    df: &DataFrame,
    target: &str,
    grade_level: u8,
) -> Result<ScoreTable, PipelineError> {
    let tracks = schema::encode_tracks(df.column(target)?)?;
    let candidates = schema::candidate_predictors(df, grade_level);

    let numeric: Vec<&String> = candidates.iter().filter(|c| *c != GENDER_COLUMN).collect();
    if numeric.is_empty() {
        let boundary = GradeBoundary::new(grade_level)
            .unwrap_or_else(|| GradeBoundary::all()[0]);
        return Err(PipelineError::NoFeatures { boundary });
    }

    // Pull each numeric column up front so the parallel sweep below never
    // touches the DataFrame.
    let mut numeric_values = Vec::with_capacity(numeric.len());
    for name in &numeric {
        numeric_values.push(((*name).clone(), schema::column_to_f64(df.column(name)?)?));
    }

    let numeric_scores: Vec<FeatureScore> = numeric_values
        .par_iter()
        .map(|(name, values)| {
            let (f_statistic, p_value) = anova_f_test(values, &tracks);
            FeatureScore {
                feature: name.clone(),
                f_statistic: Some(f_statistic),
                p_value,
                significant: is_significant(p_value),
            }
        })
        .collect();

    let mut scores = numeric_scores;

    if candidates.iter().any(|c| c == GENDER_COLUMN) {
        let p_value = chi_square_independence(df.column(GENDER_COLUMN)?, &tracks)?;
        scores.push(FeatureScore {
            feature: GENDER_COLUMN.to_string(),
            f_statistic: None,
            p_value,
            significant: is_significant(p_value),
        });
    }

    Ok(ScoreTable {
        grade_level,
        scores,
    })
}

/// One-way ANOVA F-test of a numeric predictor against the binary track.
///
/// Values are standardized before scoring (the F-statistic is invariant
/// under the affine transform, but the screening contract scores
/// standardized values). Rows with a null value or null target are skipped.
fn anova_f_test(values: &[Option<f64>], tracks: &[Option<Track>]) -> (f64, f64) {
    let paired: Vec<(f64, Track)> = values
        .iter()
        .zip(tracks.iter())
        .filter_map(|(v, t)| match (v, t) {
            (Some(v), Some(t)) => Some((*v, *t)),
            _ => None,
        })
        .collect();

    let n = paired.len();
    if n < 3 {
        return (0.0, 1.0);
    }

    let standardized = standardize(paired.iter().map(|(v, _)| *v).collect());

    let mut sums = [0.0f64; 2];
    let mut counts = [0usize; 2];
    for (value, (_, track)) in standardized.iter().zip(paired.iter()) {
        let idx = track.code() as usize;
        sums[idx] += value;
        counts[idx] += 1;
    }

    // A single-class sample carries no group separation to measure.
    if counts[0] == 0 || counts[1] == 0 {
        return (0.0, 1.0);
    }

    let grand_mean = standardized.iter().sum::<f64>() / n as f64;
    let means = [sums[0] / counts[0] as f64, sums[1] / counts[1] as f64];

    let ss_between: f64 = (0..2)
        .map(|i| counts[i] as f64 * (means[i] - grand_mean).powi(2))
        .sum();
    let ss_within: f64 = standardized
        .iter()
        .zip(paired.iter())
        .map(|(value, (_, track))| (value - means[track.code() as usize]).powi(2))
        .sum();

    let df_between = 1.0; // k - 1 with k = 2 groups
    let df_within = (n - 2) as f64;

    const EPS: f64 = 1e-12;
    if ss_within <= EPS {
        // Perfect separation: infinite F, zero p. No separation at all:
        // nothing to test.
        return if ss_between <= EPS {
            (0.0, 1.0)
        } else {
            (f64::INFINITY, 0.0)
        };
    }

    let f = (ss_between / df_between) / (ss_within / df_within);
    let p = match FisherSnedecor::new(df_between, df_within) {
        Ok(dist) => 1.0 - dist.cdf(f),
        Err(_) => 1.0,
    };

    (f, p.clamp(0.0, 1.0))
}

/// Pearson chi-square test of independence between a categorical column and
/// the track, on the full contingency table. Returns the p-value.
fn chi_square_independence(
    col: &Column,
    tracks: &[Option<Track>],
) -> Result<f64, PipelineError> {
    let (codes, classes) = schema::encode_categorical(col)?;

    let n_rows = classes.len();
    let n_cols = Track::ALL.len();
    if n_rows < 2 {
        return Ok(1.0);
    }

    let mut table = vec![vec![0.0f64; n_cols]; n_rows];
    for (code, track) in codes.iter().zip(tracks.iter()) {
        if let (Some(code), Some(track)) = (code, track) {
            table[*code as usize][track.code() as usize] += 1.0;
        }
    }

    let row_totals: Vec<f64> = table.iter().map(|row| row.iter().sum()).collect();
    let col_totals: Vec<f64> = (0..n_cols)
        .map(|j| table.iter().map(|row| row[j]).sum())
        .collect();
    let total: f64 = row_totals.iter().sum();

    if total == 0.0 || row_totals.iter().any(|&t| t == 0.0) || col_totals.iter().any(|&t| t == 0.0)
    {
        return Ok(1.0);
    }

    let mut chi2 = 0.0;
    for i in 0..n_rows {
        for j in 0..n_cols {
            let expected = row_totals[i] * col_totals[j] / total;
            chi2 += (table[i][j] - expected).powi(2) / expected;
        }
    }

    let dof = ((n_rows - 1) * (n_cols - 1)) as f64;
    let p = match ChiSquared::new(dof) {
        Ok(dist) => 1.0 - dist.cdf(chi2),
        Err(_) => 1.0,
    };

    Ok(p.clamp(0.0, 1.0))
}

/// Standardize to zero mean and unit variance. Constant samples are left
/// centered only.
fn standardize(values: Vec<f64>) -> Vec<f64> {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();

    if std == 0.0 {
        values.iter().map(|v| v - mean).collect()
    } else {
        values.iter().map(|v| (v - mean) / std).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks(labels: &[&str]) -> Vec<Option<Track>> {
        labels
            .iter()
            .map(|l| Some(Track::from_label(l).unwrap()))
            .collect()
    }

    #[test]
    fn test_anova_known_f_statistic() {
        // Groups {1,2,3} vs {4,5,6}: SSB = 13.5, SSW = 4, df = (1, 4),
        // F = 13.5. Standardization must not change the statistic.
        let values: Vec<Option<f64>> =
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0].iter().map(|v| Some(*v)).collect();
        let groups = tracks(&["Academic", "Academic", "Academic", "TVL", "TVL", "TVL"]);

        let (f, p) = anova_f_test(&values, &groups);
        assert!((f - 13.5).abs() < 1e-9, "F = {}", f);
        assert!(p > 0.0 && p < 0.05, "p = {}", p);
    }

    #[test]
    fn test_anova_no_signal() {
        // Identical group means: F = 0, p = 1.
        let values: Vec<Option<f64>> =
            [1.0, 3.0, 1.0, 3.0].iter().map(|v| Some(*v)).collect();
        let groups = tracks(&["Academic", "Academic", "TVL", "TVL"]);

        let (f, p) = anova_f_test(&values, &groups);
        assert!(f.abs() < 1e-9);
        assert!((p - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_anova_perfect_separation() {
        let values: Vec<Option<f64>> =
            [1.0, 1.0, 1.0, 2.0, 2.0, 2.0].iter().map(|v| Some(*v)).collect();
        let groups = tracks(&["Academic", "Academic", "Academic", "TVL", "TVL", "TVL"]);

        let (f, p) = anova_f_test(&values, &groups);
        assert!(f.is_infinite());
        assert_eq!(p, 0.0);
    }

    #[test]
    fn test_anova_skips_nulls() {
        let values = vec![Some(1.0), None, Some(2.0), Some(4.0), Some(5.0), Some(6.0)];
        let groups = tracks(&["Academic", "Academic", "Academic", "TVL", "TVL", "TVL"]);

        let (_, p) = anova_f_test(&values, &groups);
        assert!(p.is_finite());
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_chi_square_dependent_table() {
        // 20/10 vs 10/20 split: chi2 = 6.67, p < 0.05.
        let mut genders = Vec::new();
        let mut labels = Vec::new();
        for _ in 0..20 {
            genders.push("Female");
            labels.push("Academic");
        }
        for _ in 0..10 {
            genders.push("Female");
            labels.push("TVL");
        }
        for _ in 0..10 {
            genders.push("Male");
            labels.push("Academic");
        }
        for _ in 0..20 {
            genders.push("Male");
            labels.push("TVL");
        }

        let df = df! { "gender" => genders }.unwrap();
        let p = chi_square_independence(df.column("gender").unwrap(), &tracks(&labels)).unwrap();
        assert!(p < 0.05, "p = {}", p);
    }

    #[test]
    fn test_chi_square_independent_table() {
        // Perfectly balanced 15/15 vs 15/15: chi2 = 0, p = 1.
        let mut genders = Vec::new();
        let mut labels = Vec::new();
        for gender in ["Female", "Male"] {
            for label in ["Academic", "TVL"] {
                for _ in 0..15 {
                    genders.push(gender);
                    labels.push(label);
                }
            }
        }

        let df = df! { "gender" => genders }.unwrap();
        let p = chi_square_independence(df.column("gender").unwrap(), &tracks(&labels)).unwrap();
        assert!((p - 1.0).abs() < 1e-9, "p = {}", p);
    }

    #[test]
    fn test_significance_boundary_is_strict() {
        assert!(is_significant(0.049));
        assert!(!is_significant(0.05));
        assert!(!is_significant(0.051));
    }

    #[test]
    fn test_score_table_keeps_candidate_order() {
        let df = df! {
            "g7_math" => [95.0f64, 96.0, 94.0, 76.0, 77.0, 78.0],
            "g7_english" => [85.0f64, 88.0, 90.0, 82.0, 84.0, 86.0],
            "age" => [15i32, 16, 15, 16, 17, 15],
            "gender" => ["Male", "Female", "Male", "Female", "Male", "Female"],
            "track" => ["Academic", "Academic", "Academic", "TVL", "TVL", "TVL"],
        }
        .unwrap();

        let table = score_grade_level(&df, "track", 7).unwrap();
        let names: Vec<&str> = table.scores.iter().map(|s| s.feature.as_str()).collect();
        assert_eq!(names, vec!["g7_math", "g7_english", "age", "gender"]);

        // Chi-square path records no F-statistic; ANOVA paths do.
        assert!(table.get("gender").unwrap().f_statistic.is_none());
        assert!(table.get("g7_math").unwrap().f_statistic.is_some());
    }

    #[test]
    fn test_score_errors_without_numeric_predictors() {
        let df = df! {
            "gender" => ["Male", "Female"],
            "track" => ["Academic", "TVL"],
        }
        .unwrap();

        let result = score_grade_level(&df, "track", 7);
        assert!(matches!(result, Err(PipelineError::NoFeatures { .. })));
    }
}
