//! Trackcast: Senior High School Track Prediction CLI
//!
//! Screens per-grade predictors, trains a logistic classifier per grade
//! boundary, and renders the evaluation for each boundary independently.

mod cli;
mod pipeline;
mod report;
mod utils;

use std::collections::HashSet;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use polars::prelude::DataFrame;

use cli::{Cli, Commands};
use pipeline::{
    assemble_features, dataset_stats, evaluate, gender_distribution, load_students,
    subject_statistics, train_average_model, train_model, validate_target, GradeBoundary,
    PipelineError, ScoreCache,
};
use report::{
    export_run, render_coefficients, render_evaluation, render_features,
    render_gender_distribution, render_prediction_summary, render_score_table,
    render_subject_stats, BoundaryExport, ModelExport, RunExport, RunMetadata,
};
use utils::{
    create_spinner, finish_with_success, print_banner, print_completion, print_config,
    print_info, print_step_header, print_step_time, print_success, print_warning,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle subcommands
    if let Some(command) = &cli.command {
        return match command {
            Commands::Generate { output, rows, seed } => {
                cli::generate::run_generate(output, *rows, *seed)
            }
        };
    }

    let input = cli.input().ok_or_else(|| {
        anyhow::anyhow!("Input file is required. Use -i/--input to specify a file.")
    })?;

    let boundaries = cli.boundaries();
    let boundary_list = boundaries
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(input, &cli.target, &boundary_list, cli.balance, cli.averages);

    // Load the student table once; everything downstream reads it immutably.
    let step_start = Instant::now();
    println!();
    let spinner = create_spinner("Loading student table...");
    let df = load_students(input, cli.infer_schema_length)?;
    validate_target(&df, &cli.target, input)?;
    finish_with_success(&spinner, "Student table loaded");

    let (rows, cols, memory_mb) = dataset_stats(&df);
    println!("      Rows: {}", rows);
    println!("      Columns: {}", cols);
    println!("      Estimated memory: {:.2} MB", memory_mb);
    print_step_time(step_start.elapsed());

    let mut cache = ScoreCache::new();
    let mut rendered_levels: HashSet<u8> = HashSet::new();
    let mut exports: Vec<BoundaryExport> = Vec::new();

    for (step, boundary) in boundaries.iter().enumerate() {
        print_step_header(step + 1, &format!("Grade boundary {}", boundary));

        let step_start = Instant::now();
        let outcome = run_boundary(&df, &cli, *boundary, &mut cache, &mut rendered_levels);

        // A failure for one boundary never blocks the remaining boundaries.
        match outcome {
            Ok(export) => exports.push(export),
            Err(err) => {
                match &err {
                    PipelineError::NoFeatures { .. } => {
                        print_info(&format!(
                            "No significant features for {}; skipping training",
                            boundary
                        ));
                    }
                    _ => print_warning(&err.to_string()),
                }
                exports.push(BoundaryExport {
                    grade_boundary: boundary.level(),
                    score_tables: Vec::new(),
                    features: Vec::new(),
                    model: None,
                    evaluation: None,
                    error: Some(err.to_string()),
                });
            }
        }
        print_step_time(step_start.elapsed());
    }

    if let Some(export_path) = &cli.export {
        let export = RunExport {
            metadata: RunMetadata::new(input, &cli.target, cli.balance, cli.averages),
            boundaries: exports,
        };
        export_run(&export, export_path)?;
        print_success(&format!("Run exported to {}", export_path.display()));
    }

    print_completion();
    Ok(())
}

/// Run the full screen/assemble/train/evaluate cycle for one boundary.
fn run_boundary(
    df: &DataFrame,
    cli: &Cli,
    boundary: GradeBoundary,
    cache: &mut ScoreCache,
    rendered_levels: &mut HashSet<u8>,
) -> Result<BoundaryExport, PipelineError> {
    let (model, features, score_tables) = if cli.averages {
        let outcome = train_average_model(df, &cli.target, boundary, cli.balance)?;
        render_features(&outcome.features);
        print_info(&format!(
            "Majority predicted track for {}: {}",
            boundary, outcome.majority_track
        ));
        (outcome.model, outcome.features, Vec::new())
    } else {
        let features = assemble_features(df, &cli.target, boundary, cache)?;

        // Each level's screening table is shown once across the whole run.
        let mut score_tables = Vec::new();
        for level in boundary.levels() {
            if let Some(table) = cache.get(&level) {
                if rendered_levels.insert(level) {
                    render_score_table(table);
                }
                score_tables.push(table.clone());
            }
        }

        render_features(&features);
        let model = train_model(df, &features, &cli.target, boundary, cli.balance)?;
        (model, features, score_tables)
    };

    println!();
    render_prediction_summary(&model.prediction_summary());
    println!();
    render_coefficients(&model);

    let stats = subject_statistics(&model);
    if !stats.is_empty() {
        println!();
        render_subject_stats(&stats);
    }
    if let Some(distribution) = gender_distribution(&model) {
        println!();
        render_gender_distribution(&distribution);
    }

    let evaluation = evaluate(&model.y_test, &model.y_pred, &model.y_prob, &model)?;
    println!();
    render_evaluation(&evaluation);

    Ok(BoundaryExport {
        grade_boundary: boundary.level(),
        score_tables,
        features,
        model: Some(ModelExport::from_model(&model)),
        evaluation: Some(evaluation),
        error: None,
    })
}
