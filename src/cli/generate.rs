//! Synthetic student dataset generation
//!
//! Writes a seeded CSV matching the schema the pipeline expects: age,
//! gender, track, a track-consistent strand, and eight subject grades per
//! grade level (75-100) plus the per-grade average.

use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::pipeline::{GRADE_LEVELS, SUBJECTS};
use crate::utils::print_success;

const GENDERS: [&str; 2] = ["Female", "Male"];
const TRACKS: [&str; 2] = ["Academic", "TVL"];
const ACADEMIC_STRANDS: [&str; 3] = ["ABM", "HUMSS", "STEM"];
const TVL_STRANDS: [&str; 4] = ["IA-AS", "IA-CES/EPAS", "ICT", "HE"];

/// Generate a synthetic student table and write it as CSV.
pub fn run_generate(output: &Path, rows: usize, seed: u64) -> Result<()> {
    let mut df = synthetic_students(rows, seed);

    let mut file = std::fs::File::create(output)
        .with_context(|| format!("Failed to create output file: {}", output.display()))?;
    CsvWriter::new(&mut file)
        .finish(&mut df)
        .with_context(|| format!("Failed to write CSV file: {}", output.display()))?;

    print_success(&format!(
        "Generated {} student rows at {}",
        rows,
        output.display()
    ));
    Ok(())
}

/// Build the synthetic table in memory. Deterministic for a given seed.
pub fn synthetic_students(rows: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut age = Vec::with_capacity(rows);
    let mut gender = Vec::with_capacity(rows);
    let mut track = Vec::with_capacity(rows);
    let mut strand = Vec::with_capacity(rows);

    for _ in 0..rows {
        age.push(rng.gen_range(15..19) as i32);
        gender.push(*GENDERS.choose(&mut rng).expect("non-empty"));
        let t = *TRACKS.choose(&mut rng).expect("non-empty");
        track.push(t);
        strand.push(if t == "Academic" {
            *ACADEMIC_STRANDS.choose(&mut rng).expect("non-empty")
        } else {
            *TVL_STRANDS.choose(&mut rng).expect("non-empty")
        });
    }

    let mut columns: Vec<Column> = vec![
        Column::new("age".into(), age),
        Column::new("gender".into(), gender),
        Column::new("track".into(), track),
        Column::new("strand".into(), strand),
    ];

    for level in GRADE_LEVELS {
        let mut subject_grades: Vec<Vec<f64>> = Vec::with_capacity(SUBJECTS.len());
        for _ in SUBJECTS {
            let grades: Vec<f64> = (0..rows).map(|_| random_grade(&mut rng)).collect();
            subject_grades.push(grades);
        }

        let averages: Vec<f64> = (0..rows)
            .map(|i| {
                let sum: f64 = subject_grades.iter().map(|g| g[i]).sum();
                round2(sum / SUBJECTS.len() as f64)
            })
            .collect();

        for (subject, grades) in SUBJECTS.iter().zip(subject_grades) {
            columns.push(Column::new(format!("g{}_{}", level, subject).into(), grades));
        }
        columns.push(Column::new(format!("g{}_average", level).into(), averages));
    }

    DataFrame::new(columns).expect("consistent column lengths")
}

/// A grade on the 75-100 scale, rounded to 2 decimals.
fn random_grade(rng: &mut ChaCha8Rng) -> f64 {
    round2(75.0 + rng.gen::<f64>() * 25.0)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
