//! Terminal rendering of pipeline outputs
//!
//! Every function here takes core data structures and prints tables; no
//! analysis happens at this layer.

use std::collections::BTreeMap;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::{
    EvaluationResult, PredictionSummary, ScoreTable, SubjectStat, Track, TrainedModel,
};

/// Print a comfy-table indented to match the step layout.
fn print_table(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn header_cell(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

/// Feature score table for one grade level.
pub fn render_score_table(scores: &ScoreTable) {
    println!(
        "    {} {}",
        style("✧").cyan(),
        style(format!("Feature screening for grade {}", scores.grade_level)).white()
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        header_cell("Feature"),
        header_cell("F-statistic"),
        header_cell("P-value"),
        header_cell("Significant"),
    ]);

    for score in &scores.scores {
        let f_stat = match score.f_statistic {
            Some(f) => format!("{:.4}", f),
            None => "-".to_string(),
        };
        let flag = if score.significant {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(&score.feature),
            Cell::new(f_stat),
            Cell::new(format!("{:.4}", score.p_value)),
            flag,
        ]);
    }

    print_table(&table);
}

/// The assembled feature list for one boundary.
pub fn render_features(features: &[String]) {
    println!(
        "      Features used: {}",
        style(features.join(", ")).yellow()
    );
}

/// Signed coefficients, with the direction convention spelled out.
pub fn render_coefficients(model: &TrainedModel) {
    println!(
        "    {} {}",
        style("✧").cyan(),
        style("Coefficients (positive leans TVL, negative leans Academic)").white()
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![header_cell("Feature"), header_cell("Coefficient")]);

    for entry in model.coefficient_table() {
        let cell = Cell::new(format!("{:+.4}", entry.coefficient)).fg(
            if entry.coefficient >= 0.0 {
                Color::Yellow
            } else {
                Color::Cyan
            },
        );
        table.add_row(vec![Cell::new(&entry.feature), cell]);
    }
    table.add_row(vec![
        Cell::new("(intercept)"),
        Cell::new(format!("{:+.4}", model.intercept)),
    ]);

    print_table(&table);
}

/// Held-out prediction distribution.
pub fn render_prediction_summary(summary: &PredictionSummary) {
    for track in Track::ALL {
        let label = track.as_str();
        println!(
            "      {}: {} ({:.2}%)",
            style(label).bold(),
            summary.counts.get(label).copied().unwrap_or(0),
            summary.percentages.get(label).copied().unwrap_or(0.0)
        );
    }
    println!("      Total predictions: {}", summary.total);
}

/// Metrics, confusion matrix, classification report, and AUC.
pub fn render_evaluation(result: &EvaluationResult) {
    let mut metrics = Table::new();
    metrics.load_preset(UTF8_FULL_CONDENSED);
    metrics.set_header(vec![header_cell("Metric"), header_cell("Value")]);
    metrics.add_row(vec![
        Cell::new("Accuracy"),
        Cell::new(format!("{:.2}%", result.accuracy * 100.0))
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
    ]);
    metrics.add_row(vec![
        Cell::new("Error rate"),
        Cell::new(format!("{:.2}%", result.error_rate * 100.0)),
    ]);
    metrics.add_row(vec![
        Cell::new("Precision (TVL)"),
        Cell::new(format!("{:.4}", result.precision)),
    ]);
    metrics.add_row(vec![
        Cell::new("Recall (TVL)"),
        Cell::new(format!("{:.4}", result.recall)),
    ]);
    metrics.add_row(vec![
        Cell::new("AUC"),
        match result.auc {
            Some(auc) => Cell::new(format!("{:.4}", auc)),
            None => Cell::new("n/a (single class)").fg(Color::DarkGrey),
        },
    ]);
    print_table(&metrics);

    println!();
    println!("    {} {}", style("✧").cyan(), style("Confusion matrix").white());
    let mut confusion = Table::new();
    confusion.load_preset(UTF8_FULL_CONDENSED);
    let mut header = vec![header_cell("")];
    header.extend(result.confusion.predicted_labels.iter().map(|l| header_cell(l)));
    confusion.set_header(header);
    for (label, row) in result
        .confusion
        .actual_labels
        .iter()
        .zip(result.confusion.counts.iter())
    {
        let mut cells = vec![header_cell(label)];
        cells.extend(row.iter().map(|c| Cell::new(c)));
        confusion.add_row(cells);
    }
    print_table(&confusion);

    println!();
    println!(
        "    {} {}",
        style("✧").cyan(),
        style("Classification report").white()
    );
    let mut report = Table::new();
    report.load_preset(UTF8_FULL_CONDENSED);
    report.set_header(vec![
        header_cell("Class"),
        header_cell("Precision"),
        header_cell("Recall"),
        header_cell("F1"),
        header_cell("Support"),
    ]);
    for row in result
        .report
        .per_class
        .iter()
        .chain([&result.report.macro_avg, &result.report.weighted_avg])
    {
        report.add_row(vec![
            Cell::new(&row.class),
            Cell::new(format!("{:.4}", row.precision)),
            Cell::new(format!("{:.4}", row.recall)),
            Cell::new(format!("{:.4}", row.f1)),
            Cell::new(row.support),
        ]);
    }
    print_table(&report);
}

/// Per-subject statistics grouped by predicted track.
pub fn render_subject_stats(stats: &[SubjectStat]) {
    if stats.is_empty() {
        return;
    }
    println!(
        "    {} {}",
        style("✧").cyan(),
        style("Subject grades by predicted track").white()
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        header_cell("Feature"),
        header_cell("Track"),
        header_cell("Min"),
        header_cell("Max"),
        header_cell("Mean"),
        header_cell("Median"),
        header_cell("Count"),
    ]);
    for stat in stats {
        table.add_row(vec![
            Cell::new(&stat.feature),
            Cell::new(stat.track.as_str()),
            Cell::new(format!("{:.2}", stat.min)),
            Cell::new(format!("{:.2}", stat.max)),
            Cell::new(format!("{:.2}", stat.mean)),
            Cell::new(format!("{:.2}", stat.median)),
            Cell::new(stat.count),
        ]);
    }
    print_table(&table);
}

/// Gender counts per predicted track.
pub fn render_gender_distribution(distribution: &BTreeMap<String, BTreeMap<String, usize>>) {
    println!(
        "    {} {}",
        style("✧").cyan(),
        style("Gender distribution by predicted track").white()
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    let mut header = vec![header_cell("Gender")];
    header.extend(Track::ALL.iter().map(|t| header_cell(t.as_str())));
    table.set_header(header);

    for (gender, by_track) in distribution {
        let mut cells = vec![Cell::new(gender)];
        for track in Track::ALL {
            cells.push(Cell::new(
                by_track.get(track.as_str()).copied().unwrap_or(0),
            ));
        }
        table.add_row(cells);
    }
    print_table(&table);
}
