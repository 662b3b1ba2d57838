//! Shared test utilities and fixture generators

use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use tempfile::TempDir;

/// Build a student table where `g7_math` perfectly separates the tracks:
/// Academic iff g7_math > 90. Other columns are seeded noise.
pub fn separable_student_table(rows: usize) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(99);

    let mut age = Vec::with_capacity(rows);
    let mut gender = Vec::with_capacity(rows);
    let mut track = Vec::with_capacity(rows);
    let mut g7_math = Vec::with_capacity(rows);
    let mut g7_english = Vec::with_capacity(rows);
    let mut g7_science = Vec::with_capacity(rows);

    for i in 0..rows {
        let academic = i % 2 == 0;
        age.push(rng.gen_range(15..19) as i32);
        gender.push(if rng.gen::<bool>() { "Male" } else { "Female" });
        track.push(if academic { "Academic" } else { "TVL" });
        g7_math.push(if academic {
            91.0 + rng.gen::<f64>() * 9.0
        } else {
            75.0 + rng.gen::<f64>() * 14.0
        });
        g7_english.push(75.0 + rng.gen::<f64>() * 25.0);
        g7_science.push(75.0 + rng.gen::<f64>() * 25.0);
    }

    df! {
        "age" => age,
        "gender" => gender,
        "track" => track,
        "g7_math" => g7_math,
        "g7_english" => g7_english,
        "g7_science" => g7_science,
    }
    .unwrap()
}

/// Build a table where `gender` is independent of `track` by construction
/// (every gender/track cell has the same count) while `g7_math` separates
/// the tracks.
pub fn gender_independent_table(per_cell: usize) -> DataFrame {
    let mut age = Vec::new();
    let mut gender = Vec::new();
    let mut track = Vec::new();
    let mut g7_math = Vec::new();

    for (g, t) in [
        ("Female", "Academic"),
        ("Female", "TVL"),
        ("Male", "Academic"),
        ("Male", "TVL"),
    ] {
        for i in 0..per_cell {
            age.push(15 + (i % 4) as i32);
            gender.push(g);
            track.push(t);
            g7_math.push(if t == "Academic" {
                92.0 + (i % 5) as f64
            } else {
                78.0 + (i % 5) as f64
            });
        }
    }

    df! {
        "age" => age,
        "gender" => gender,
        "track" => track,
        "g7_math" => g7_math,
    }
    .unwrap()
}

/// Multi-grade table covering g7..g10 with one separating subject per level.
pub fn multi_grade_table(rows: usize) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(123);

    let mut columns: Vec<Column> = Vec::new();
    let mut track = Vec::with_capacity(rows);
    let academic: Vec<bool> = (0..rows).map(|i| i % 2 == 0).collect();
    for &a in &academic {
        track.push(if a { "Academic" } else { "TVL" });
    }

    columns.push(Column::new(
        "age".into(),
        (0..rows).map(|_| rng.gen_range(15..19) as i32).collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        "gender".into(),
        (0..rows)
            .map(|_| if rng.gen::<bool>() { "Male" } else { "Female" })
            .collect::<Vec<_>>(),
    ));
    columns.push(Column::new("track".into(), track));

    for level in [7u8, 8, 9, 10] {
        let math: Vec<f64> = academic
            .iter()
            .map(|&a| {
                if a {
                    90.0 + rng.gen::<f64>() * 10.0
                } else {
                    75.0 + rng.gen::<f64>() * 10.0
                }
            })
            .collect();
        let noise: Vec<f64> = (0..rows).map(|_| 75.0 + rng.gen::<f64>() * 25.0).collect();
        columns.push(Column::new(format!("g{}_math", level).into(), math));
        columns.push(Column::new(format!("g{}_esp", level).into(), noise));
    }

    DataFrame::new(columns).unwrap()
}

/// Write a DataFrame to a temp CSV, returning the guard and the path.
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("students.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}
