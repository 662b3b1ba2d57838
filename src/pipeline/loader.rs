//! Student table loader for CSV files

use std::path::Path;

use polars::prelude::*;

use super::error::PipelineError;

/// Load the student table from a CSV file.
///
/// Fails fast with `DataLoad` when the file is unreadable or empty; the rest
/// of the pipeline assumes a valid table.
pub fn load_students(path: &Path, infer_schema_length: usize) -> Result<DataFrame, PipelineError> {
    let infer = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    let df = LazyCsvReader::new(path)
        .with_infer_schema_length(infer)
        .finish()
        .and_then(|lf| lf.collect())
        .map_err(|e| PipelineError::DataLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if df.height() == 0 {
        return Err(PipelineError::DataLoad {
            path: path.to_path_buf(),
            reason: "table contains no rows".to_string(),
        });
    }

    Ok(df)
}

/// Verify the target column exists before any pipeline work.
pub fn validate_target(df: &DataFrame, target: &str, path: &Path) -> Result<(), PipelineError> {
    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    if !names.iter().any(|n| n == target) {
        return Err(PipelineError::DataLoad {
            path: path.to_path_buf(),
            reason: format!(
                "target column '{}' not found; available columns: {:?}",
                target, names
            ),
        });
    }
    Ok(())
}

/// Row count, column count, and estimated memory (MB) of a loaded table.
pub fn dataset_stats(df: &DataFrame) -> (usize, usize, f64) {
    let (rows, cols) = df.shape();
    let memory_mb = df.estimated_size() as f64 / (1024.0 * 1024.0);
    (rows, cols, memory_mb)
}
