//! JSON export of a full pipeline run

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::pipeline::{
    EvaluationResult, FeatureCoefficient, PredictionSummary, ScoreTable, TrainedModel,
};

/// Metadata about the run
#[derive(Serialize)]
pub struct RunMetadata {
    /// Timestamp of the run (ISO 8601 format)
    pub timestamp: String,
    /// Trackcast version
    pub trackcast_version: String,
    /// Input file path
    pub input_file: String,
    /// Target column name
    pub target_column: String,
    /// Whether class balancing was applied
    pub balanced: bool,
    /// Whether the average-grade variant was used
    pub averages: bool,
}

/// Fitted-model payload for one boundary
#[derive(Serialize)]
pub struct ModelExport {
    pub coefficients: Vec<FeatureCoefficient>,
    pub intercept: f64,
    pub prediction_summary: PredictionSummary,
    pub iterations: usize,
    pub converged: bool,
}

impl ModelExport {
    pub fn from_model(model: &TrainedModel) -> ModelExport {
        ModelExport {
            coefficients: model.coefficient_table(),
            intercept: model.intercept,
            prediction_summary: model.prediction_summary(),
            iterations: model.iterations,
            converged: model.converged,
        }
    }
}

/// Everything produced for one grade boundary. Failed boundaries carry the
/// error string and nothing else, so a partial run still exports cleanly.
#[derive(Serialize)]
pub struct BoundaryExport {
    pub grade_boundary: u8,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub score_tables: Vec<ScoreTable>,
    pub features: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelExport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Complete run export with metadata
#[derive(Serialize)]
pub struct RunExport {
    pub metadata: RunMetadata,
    pub boundaries: Vec<BoundaryExport>,
}

impl RunMetadata {
    pub fn new(input_file: &Path, target_column: &str, balanced: bool, averages: bool) -> Self {
        RunMetadata {
            timestamp: Utc::now().to_rfc3339(),
            trackcast_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: input_file.display().to_string(),
            target_column: target_column.to_string(),
            balanced,
            averages,
        }
    }
}

/// Write the run export as pretty JSON.
pub fn export_run(export: &RunExport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(export)
        .context("Failed to serialize run export to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write run export to {}", output_path.display()))?;

    Ok(())
}
