//! End-to-end tests for the full screen/assemble/train/evaluate cycle

use trackcast::pipeline::{
    assemble_features, evaluate, load_students, train_average_model, train_model,
    GradeBoundary, PipelineError, ScoreCache,
};

#[path = "common/mod.rs"]
mod common;

use common::*;

fn g(level: u8) -> GradeBoundary {
    GradeBoundary::new(level).unwrap()
}

#[test]
fn test_separable_table_reaches_high_accuracy() {
    // track is perfectly separable by g7_math (> 90 means Academic); the
    // held-out accuracy must come out at 0.95 or better.
    let df = separable_student_table(1000);
    let mut cache = ScoreCache::new();

    let features = assemble_features(&df, "track", g(7), &mut cache).unwrap();
    assert!(features.contains(&"g7_math".to_string()));

    let model = train_model(&df, &features, "track", g(7), false).unwrap();
    let result = evaluate(&model.y_test, &model.y_pred, &model.y_prob, &model).unwrap();

    assert!(
        result.accuracy >= 0.95,
        "held-out accuracy = {}",
        result.accuracy
    );
    assert!(result.auc.unwrap() >= 0.95);
}

#[test]
fn test_gender_inclusion_and_significance_are_separate_paths() {
    let df = gender_independent_table(60);
    let mut cache = ScoreCache::new();

    let features = assemble_features(&df, "track", g(7), &mut cache).unwrap();

    // Included by the demographic policy...
    assert!(features.contains(&"gender".to_string()));
    // ...while the significance report never lists it.
    let significant = cache.get(&7).unwrap().significant_features();
    assert!(!significant.contains(&"gender".to_string()));

    // Training with the force-included demographic still works end to end.
    let model = train_model(&df, &features, "track", g(7), false).unwrap();
    let result = evaluate(&model.y_test, &model.y_pred, &model.y_prob, &model).unwrap();
    assert!(result.accuracy > 0.9);
}

#[test]
fn test_all_boundaries_run_independently() {
    let df = multi_grade_table(400);

    for level in [7u8, 8, 9, 10] {
        let mut cache = ScoreCache::new();
        let features = assemble_features(&df, "track", g(level), &mut cache).unwrap();
        let model = train_model(&df, &features, "track", g(level), false).unwrap();
        let result = evaluate(&model.y_test, &model.y_pred, &model.y_prob, &model).unwrap();

        assert_eq!(model.boundary.level(), level);
        assert!(
            result.accuracy > 0.8,
            "boundary G{} accuracy = {}",
            level,
            result.accuracy
        );
    }
}

#[test]
fn test_one_failing_boundary_leaves_others_intact() {
    // Only g7/g8 columns and no demographics: boundaries 7 and 8 train,
    // boundary 9 fails screening with NoFeatures -- locally.
    let mut math7 = Vec::new();
    let mut math8 = Vec::new();
    let mut track = Vec::new();
    for i in 0..200 {
        let academic = i % 2 == 0;
        math7.push(if academic { 95.0 } else { 78.0 } + (i % 3) as f64);
        math8.push(if academic { 93.0 } else { 80.0 } + (i % 3) as f64);
        track.push(if academic { "Academic" } else { "TVL" });
    }
    let df = polars::df! {
        "track" => track,
        "g7_math" => math7,
        "g8_math" => math8,
    }
    .unwrap();

    for level in [7u8, 8] {
        let mut cache = ScoreCache::new();
        let features = assemble_features(&df, "track", g(level), &mut cache).unwrap();
        assert!(train_model(&df, &features, "track", g(level), false).is_ok());
    }

    let mut cache = ScoreCache::new();
    let result = assemble_features(&df, "track", g(9), &mut cache);
    assert!(matches!(result, Err(PipelineError::NoFeatures { .. })));
}

#[test]
fn test_full_cycle_is_deterministic() {
    let df = multi_grade_table(500);

    let run = || {
        let mut cache = ScoreCache::new();
        let features = assemble_features(&df, "track", g(10), &mut cache).unwrap();
        let model = train_model(&df, &features, "track", g(10), false).unwrap();
        evaluate(&model.y_test, &model.y_pred, &model.y_prob, &model).unwrap()
    };

    let a = run();
    let b = run();

    assert_eq!(a.accuracy.to_bits(), b.accuracy.to_bits());
    assert_eq!(a.precision.to_bits(), b.precision.to_bits());
    assert_eq!(a.recall.to_bits(), b.recall.to_bits());
    assert_eq!(a.confusion.counts, b.confusion.counts);
    assert_eq!(
        a.auc.map(f64::to_bits),
        b.auc.map(f64::to_bits)
    );
}

#[test]
fn test_average_variant_trains_on_cumulative_means() {
    let df = multi_grade_table(400);

    let outcome = train_average_model(&df, "track", g(9), false).unwrap();

    // One average per subject present in the table (math and esp).
    assert_eq!(outcome.features, vec!["avg_math_g9", "avg_esp_g9"]);

    let result = evaluate(
        &outcome.model.y_test,
        &outcome.model.y_pred,
        &outcome.model.y_prob,
        &outcome.model,
    )
    .unwrap();
    assert!(result.accuracy > 0.8, "accuracy = {}", result.accuracy);
}

#[test]
fn test_loading_roundtrip_preserves_pipeline_results() {
    let mut df = separable_student_table(200);
    let (_guard, csv_path) = create_temp_csv(&mut df);

    let loaded = load_students(&csv_path, 100).unwrap();
    assert_eq!(loaded.shape(), df.shape());

    let mut cache_mem = ScoreCache::new();
    let mut cache_csv = ScoreCache::new();
    let from_mem = assemble_features(&df, "track", g(7), &mut cache_mem).unwrap();
    let from_csv = assemble_features(&loaded, "track", g(7), &mut cache_csv).unwrap();
    assert_eq!(from_mem, from_csv);
}

#[test]
fn test_missing_file_is_a_data_load_error() {
    let result = load_students(std::path::Path::new("/nonexistent/students.csv"), 100);
    assert!(matches!(result, Err(PipelineError::DataLoad { .. })));
}
