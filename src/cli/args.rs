//! Command-line argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::pipeline::GradeBoundary;

/// Trackcast - Predict Senior High School track placement from junior high records
#[derive(Parser, Debug)]
#[command(name = "trackcast")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Input CSV file with one row per student
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Target column holding the track labels (Academic / TVL)
    #[arg(short, long, default_value = "track")]
    pub target: String,

    /// Grade boundary to model: the cumulative horizon of grade levels 7
    /// through this value. One of 7, 8, 9, 10.
    /// When omitted, all four boundaries are trained and evaluated.
    #[arg(short, long, value_parser = parse_grade)]
    pub grade: Option<GradeBoundary>,

    /// Reweight classes during training so the minority track is not
    /// drowned by the majority track
    #[arg(long, default_value = "false")]
    pub balance: bool,

    /// Train on cumulative per-subject averages instead of the screened
    /// per-grade columns
    #[arg(long, default_value = "false")]
    pub averages: bool,

    /// Write the full run (score tables, coefficients, metrics) to a JSON file
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Number of rows to use for CSV schema inference.
    /// Use 0 for a full table scan (slow for large files).
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a synthetic student dataset CSV
    Generate {
        /// Output CSV path
        output: PathBuf,

        /// Number of student rows
        #[arg(long, default_value = "1000")]
        rows: usize,

        /// RNG seed, so generated datasets are reproducible
        #[arg(long, default_value = "7")]
        seed: u64,
    },
}

impl Cli {
    pub fn input(&self) -> Option<&PathBuf> {
        self.input.as_ref()
    }

    /// The boundaries to run: the selected one, or all four in order.
    pub fn boundaries(&self) -> Vec<GradeBoundary> {
        match self.grade {
            Some(boundary) => vec![boundary],
            None => GradeBoundary::all(),
        }
    }
}

/// Validator for the grade argument
fn parse_grade(s: &str) -> Result<GradeBoundary, String> {
    s.parse()
}
