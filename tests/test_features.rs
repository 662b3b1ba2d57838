//! Integration tests for cumulative feature assembly

use trackcast::pipeline::{assemble_features, GradeBoundary, ScoreCache};

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_assembled_features_respect_the_boundary_prefixes() {
    let df = multi_grade_table(200);

    for level in [7u8, 8, 9, 10] {
        let boundary = GradeBoundary::new(level).unwrap();
        let mut cache = ScoreCache::new();
        let features = assemble_features(&df, "track", boundary, &mut cache).unwrap();

        let allowed_prefixes: Vec<String> =
            boundary.levels().map(|l| format!("g{}_", l)).collect();

        for feature in &features {
            let is_demo = feature == "age" || feature == "gender";
            let in_range = allowed_prefixes.iter().any(|p| feature.starts_with(p));
            assert!(
                is_demo || in_range,
                "feature {} out of range for boundary {}",
                feature,
                boundary
            );
        }

        assert_eq!(features.iter().filter(|f| *f == "age").count(), 1);
        assert_eq!(features.iter().filter(|f| *f == "gender").count(), 1);
    }
}

#[test]
fn test_higher_boundaries_accumulate_lower_grades() {
    let df = multi_grade_table(200);
    let mut cache = ScoreCache::new();

    let g7 = assemble_features(&df, "track", GradeBoundary::new(7).unwrap(), &mut cache).unwrap();
    let g10 =
        assemble_features(&df, "track", GradeBoundary::new(10).unwrap(), &mut cache).unwrap();

    // Every grade-prefixed G7 feature survives into the G10 union.
    for feature in g7.iter().filter(|f| f.starts_with("g7_")) {
        assert!(g10.contains(feature), "{} missing from G10 union", feature);
    }
    assert!(g10.contains(&"g10_math".to_string()));
}

#[test]
fn test_independent_gender_included_but_not_significant() {
    // Gender is independent of track by construction, so it must never be
    // flagged significant -- yet the assembler still appends it once.
    let df = gender_independent_table(50);
    let mut cache = ScoreCache::new();

    let features =
        assemble_features(&df, "track", GradeBoundary::new(7).unwrap(), &mut cache).unwrap();
    assert!(features.contains(&"gender".to_string()));

    let table = cache.get(&7).unwrap();
    let gender = table.get("gender").unwrap();
    assert!(
        !gender.significant,
        "independent gender flagged significant (p = {})",
        gender.p_value
    );
    assert!(!table.significant_features().contains(&"gender".to_string()));
}

#[test]
fn test_assembly_is_deterministic() {
    let df = multi_grade_table(300);

    let mut cache_a = ScoreCache::new();
    let mut cache_b = ScoreCache::new();
    let a = assemble_features(&df, "track", GradeBoundary::new(10).unwrap(), &mut cache_a)
        .unwrap();
    let b = assemble_features(&df, "track", GradeBoundary::new(10).unwrap(), &mut cache_b)
        .unwrap();
    assert_eq!(a, b);
}
